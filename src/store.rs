// Page store - owns the reserved region and the single upload session

use std::time::Duration;

use crate::config::PageConfig;
use crate::error::PageError;
use crate::flash::FlashDriver;
use crate::region::FlashRegion;
use crate::scanner;
use crate::session::UploadSession;
use crate::templates;

/// Externally visible upload state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Flashing { bytes_received: usize },
}

/// Manager for the flash-resident uploadable web page.
///
/// Owns the flash driver, the reserved region and at most one upload
/// session. All operations take `&mut self`; callers that share the store
/// across contexts wrap it in a mutex, which also serializes the lazy
/// watchdog check against explicit calls.
pub struct PageStore<F: FlashDriver> {
    flash: F,
    region: FlashRegion,
    timeout: Duration,
    /// Memoized scanned length of the stored page; dropped whenever the
    /// page is rewritten or deleted.
    cached_len: Option<usize>,
    session: Option<UploadSession>,
}

impl<F: FlashDriver> PageStore<F> {
    pub fn new(flash: F, config: &PageConfig) -> Result<Self, PageError> {
        let region = config.region()?;
        Ok(Self {
            flash,
            region,
            timeout: Duration::from_millis(config.upload_timeout_ms),
            cached_len: None,
            session: None,
        })
    }

    pub fn region(&self) -> &FlashRegion {
        &self.region
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    #[cfg(test)]
    pub(crate) fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// The stored page and its logical length.
    ///
    /// While an upload is in progress this returns the fixed placeholder and
    /// never touches flash; otherwise it returns the mapped region bytes and
    /// the scanned length. Callers must not read past the length - bytes
    /// beyond it are leftover flash content. Length 0 means no page is
    /// stored.
    pub fn page(&mut self) -> (&[u8], usize) {
        self.expire_if_due();
        if self.session.is_some() {
            let placeholder = templates::FLASHING_PAGE.as_bytes();
            return (placeholder, placeholder.len());
        }
        let bytes = self.flash.mapped_region(&self.region);
        let len = *self
            .cached_len
            .get_or_insert_with(|| scanner::page_length(bytes));
        (bytes, len)
    }

    /// Start an upload session, restarting from the region start if one is
    /// already running. Arms the watchdog and drops the cached length.
    pub fn begin(&mut self) {
        self.expire_if_due();
        if self.session.is_some() {
            log::info!("Page upload restarted");
        } else {
            log::info!("Page upload started");
        }
        self.cached_len = None;
        self.session = Some(UploadSession::start(&self.region, self.timeout));
    }

    /// Append a chunk to the current upload and re-arm the watchdog.
    ///
    /// Rejected with `NoActiveUpload` while idle and `RegionOverflow` when
    /// the data would not fit; neither touches flash or the session. A flash
    /// failure aborts the whole session back to idle.
    pub fn put(&mut self, data: &[u8]) -> Result<(), PageError> {
        self.expire_if_due();
        let session = self.session.as_mut().ok_or(PageError::NoActiveUpload)?;
        match session.put(&mut self.flash, &self.region, data) {
            Ok(()) => Ok(()),
            Err(e @ PageError::Flash(_)) => {
                log::warn!("Page upload aborted: {e}");
                self.session = None;
                self.cached_len = None;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// End the upload session, flushing any buffered tail to flash.
    ///
    /// Valid in any state; finishing while idle is a no-op. A flash failure
    /// while flushing still ends the session.
    pub fn finish(&mut self) -> Result<(), PageError> {
        self.expire_if_due();
        if self.session.is_none() {
            return Ok(());
        }
        let received = self.finish_session()?;
        log::info!("Page upload finished, {received} bytes received");
        Ok(())
    }

    /// Invalidate the stored page by clearing the marker byte at offset 0.
    ///
    /// Clearing bits needs no erase on NOR flash, so the rest of the sector
    /// is written back unchanged. A failed read aborts before any write; a
    /// failed write leaves the marker state unspecified.
    pub fn delete(&mut self) -> Result<(), PageError> {
        self.expire_if_due();
        let sector = self.region.start_sector();
        let mut buf = vec![0xFF; self.region.sector_size()];
        self.flash.read_sector(sector, &mut buf)?;
        buf[0] = 0;
        self.flash.write_sector(sector, &buf)?;
        self.cached_len = None;
        log::info!("Stored page deleted");
        Ok(())
    }

    pub fn status(&mut self) -> UploadState {
        self.expire_if_due();
        match &self.session {
            Some(session) => UploadState::Flashing {
                bytes_received: session.received(),
            },
            None => UploadState::Idle,
        }
    }

    /// Run the watchdog: if the session's deadline has passed, finish it
    /// implicitly. Dropping the session here is what makes this fire at most
    /// once per arm cycle.
    fn expire_if_due(&mut self) {
        let due = self.session.as_ref().is_some_and(|s| s.guard.expired());
        if !due {
            return;
        }
        log::warn!(
            "Page upload did not complete within {:?}, finishing it",
            self.timeout
        );
        if let Err(e) = self.finish_session() {
            log::warn!("Failed to flush timed-out upload: {e}");
        }
    }

    /// Shared teardown for explicit finish and watchdog expiry. Takes the
    /// session so the store is idle afterwards even if the tail flush fails.
    fn finish_session(&mut self) -> Result<usize, PageError> {
        let Some(mut session) = self.session.take() else {
            return Ok(0);
        };
        session.guard.disarm();
        self.cached_len = None;
        session.flush_tail(&mut self.flash, &self.region)?;
        Ok(session.received())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{FlashError, MemFlash};

    fn store(sectors: u32, sector_size: usize) -> PageStore<MemFlash> {
        let config = PageConfig {
            start_sector: 0,
            end_sector: sectors,
            sector_size,
            base_address: 0,
            upload_timeout_ms: 60_000,
        };
        let flash = MemFlash::new(&config.region().unwrap());
        PageStore::new(flash, &config).unwrap()
    }

    #[test]
    fn test_put_while_idle_is_rejected() {
        let mut store = store(4, 16);
        assert_eq!(store.put(b"data"), Err(PageError::NoActiveUpload));
        // Flash untouched: still fully erased, so the scan runs off the end
        let (_, len) = store.page();
        assert_eq!(len, 64);
    }

    #[test]
    fn test_finish_while_idle_is_a_noop() {
        let mut store = store(4, 16);
        assert!(store.finish().is_ok());
        assert_eq!(store.status(), UploadState::Idle);
    }

    #[test]
    fn test_status_reports_received_bytes() {
        let mut store = store(4, 16);
        store.begin();
        store.put(b"hello").unwrap();
        assert_eq!(
            store.status(),
            UploadState::Flashing { bytes_received: 5 }
        );
    }

    #[test]
    fn test_write_failure_aborts_session() {
        let mut store = store(4, 8);
        store.begin();
        store.flash_mut().set_fail_writes(true);
        let err = store.put(&[b'x'; 8]).unwrap_err();
        assert!(matches!(err, PageError::Flash(_)));
        assert_eq!(store.status(), UploadState::Idle);
        // The next put has no session to go to
        assert_eq!(store.put(b"more"), Err(PageError::NoActiveUpload));
    }

    #[test]
    fn test_erase_failure_aborts_session() {
        let mut store = store(4, 8);
        store.begin();
        store.flash_mut().set_fail_erases(true);
        assert!(matches!(
            store.put(&[b'x'; 8]),
            Err(PageError::Flash(_))
        ));
        assert_eq!(store.status(), UploadState::Idle);
    }

    #[test]
    fn test_delete_read_failure_writes_nothing() {
        let mut store = store(4, 8);
        store.begin();
        store.put(b"page\0").unwrap();
        store.finish().unwrap();

        store.flash_mut().set_fail_reads(true);
        assert!(matches!(store.delete(), Err(PageError::Flash(_))));
        store.flash_mut().set_fail_reads(false);
        let (bytes, len) = store.page();
        assert_eq!(len, 4);
        assert_eq!(&bytes[..4], b"page");
    }

    #[test]
    fn test_delete_mid_upload_leaves_session_running() {
        let mut store = store(4, 8);
        store.begin();
        store.put(b"new").unwrap();

        // Delete is independent of upload state: it clears the old page's
        // marker and the session keeps going
        store.delete().unwrap();
        assert_eq!(
            store.status(),
            UploadState::Flashing { bytes_received: 3 }
        );

        store.put(b" page\0").unwrap();
        store.finish().unwrap();
        let (bytes, len) = store.page();
        assert_eq!(len, 8);
        assert_eq!(&bytes[..9], b"new page\0");
    }

    #[test]
    fn test_delete_write_failure_reports_error() {
        let mut store = store(4, 8);
        store.begin();
        store.put(b"page\0").unwrap();
        store.finish().unwrap();

        // Marker state after a failed write is best-effort, but the failure
        // itself must be reported
        store.flash_mut().set_fail_writes(true);
        assert_eq!(
            store.delete(),
            Err(PageError::Flash(FlashError::Write(0)))
        );
    }

    #[test]
    fn test_delete_clears_only_the_marker() {
        let mut store = store(4, 8);
        store.begin();
        store.put(b"page\0").unwrap();
        store.finish().unwrap();

        store.delete().unwrap();
        let (bytes, len) = store.page();
        assert_eq!(len, 0);
        // Rest of the sector is intact
        assert_eq!(&bytes[1..4], b"age");
    }
}
