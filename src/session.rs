// Upload session - exists only while a page is being flashed

use std::time::Duration;

use crate::error::PageError;
use crate::flash::FlashDriver;
use crate::region::FlashRegion;
use crate::timeout::TimeoutGuard;

/// State of an in-progress upload: the write cursor, the buffered partial
/// sector, and the armed watchdog.
///
/// The store holds this in an `Option`; creating it on `begin` and dropping
/// it on `finish`/abort/expiry is what makes the cursor and the timer unable
/// to outlive the Flashing state.
pub(crate) struct UploadSession {
    /// Next absolute sector to erase and write.
    next_sector: u32,
    /// Bytes already persisted to flash.
    persisted: usize,
    /// Received bytes smaller than a sector, waiting for more data or for
    /// the tail flush on finish.
    tail: Vec<u8>,
    pub guard: TimeoutGuard,
}

impl UploadSession {
    /// New session writing from the region start, with the watchdog armed.
    pub fn start(region: &FlashRegion, timeout: Duration) -> Self {
        let mut guard = TimeoutGuard::new(timeout);
        guard.arm();
        Self {
            next_sector: region.start_sector(),
            persisted: 0,
            tail: Vec::with_capacity(region.sector_size()),
            guard,
        }
    }

    /// Total bytes accepted so far (persisted plus buffered).
    pub fn received(&self) -> usize {
        self.persisted + self.tail.len()
    }

    /// Accept a chunk. Whole sectors are erased and written immediately;
    /// the remainder stays buffered. Re-arms the watchdog on success.
    ///
    /// An oversized chunk is rejected whole: nothing is consumed and the
    /// session stays usable.
    pub fn put<F: FlashDriver>(
        &mut self,
        flash: &mut F,
        region: &FlashRegion,
        data: &[u8],
    ) -> Result<(), PageError> {
        let attempted = self.received() + data.len();
        if attempted > region.max_size() {
            return Err(PageError::RegionOverflow {
                attempted,
                max_size: region.max_size(),
            });
        }

        self.tail.extend_from_slice(data);
        let sector_size = region.sector_size();
        while self.tail.len() >= sector_size {
            flash.erase_sector(self.next_sector)?;
            flash.write_sector(self.next_sector, &self.tail[..sector_size])?;
            self.tail.drain(..sector_size);
            self.next_sector += 1;
            self.persisted += sector_size;
        }

        self.guard.arm();
        Ok(())
    }

    /// Persist the buffered tail, zero-padded to a full sector.
    ///
    /// The padding doubles as the page terminator, so a client that omits
    /// the trailing NUL still gets a correctly scanned length.
    pub fn flush_tail<F: FlashDriver>(
        &mut self,
        flash: &mut F,
        region: &FlashRegion,
    ) -> Result<(), PageError> {
        if self.tail.is_empty() {
            return Ok(());
        }
        let received = self.tail.len();
        self.tail.resize(region.sector_size(), 0);
        flash.erase_sector(self.next_sector)?;
        flash.write_sector(self.next_sector, &self.tail)?;
        self.next_sector += 1;
        self.persisted += received;
        self.tail.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::MemFlash;

    fn region() -> FlashRegion {
        FlashRegion::new(0, 4, 8, 0).unwrap()
    }

    #[test]
    fn test_whole_sectors_written_eagerly() {
        let region = region();
        let mut flash = MemFlash::new(&region);
        let mut session = UploadSession::start(&region, Duration::from_secs(60));

        session.put(&mut flash, &region, b"0123456789ab").unwrap();
        assert_eq!(session.received(), 12);
        // First sector (8 bytes) already on flash, 4 bytes buffered
        assert_eq!(&flash.mapped_region(&region)[..8], b"01234567");
    }

    #[test]
    fn test_flush_pads_with_terminator() {
        let region = region();
        let mut flash = MemFlash::new(&region);
        let mut session = UploadSession::start(&region, Duration::from_secs(60));

        session.put(&mut flash, &region, b"abc").unwrap();
        session.flush_tail(&mut flash, &region).unwrap();
        assert_eq!(&flash.mapped_region(&region)[..8], b"abc\0\0\0\0\0");
    }

    #[test]
    fn test_overflow_rejected_without_consuming() {
        let region = region();
        let mut flash = MemFlash::new(&region);
        let mut session = UploadSession::start(&region, Duration::from_secs(60));

        session.put(&mut flash, &region, &[b'x'; 30]).unwrap();
        let err = session.put(&mut flash, &region, &[b'y'; 3]).unwrap_err();
        assert_eq!(
            err,
            PageError::RegionOverflow {
                attempted: 33,
                max_size: 32
            }
        );
        // The rejected chunk left the session untouched
        assert_eq!(session.received(), 30);
        session.put(&mut flash, &region, b"yy").unwrap();
        assert_eq!(session.received(), 32);
    }

    #[test]
    fn test_exact_fill_needs_no_flush() {
        let region = region();
        let mut flash = MemFlash::new(&region);
        let mut session = UploadSession::start(&region, Duration::from_secs(60));

        session.put(&mut flash, &region, &[b'z'; 32]).unwrap();
        session.flush_tail(&mut flash, &region).unwrap();
        assert!(flash.mapped_region(&region).iter().all(|&b| b == b'z'));
    }
}
