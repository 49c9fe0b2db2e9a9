// Flash driver boundary - sector-granular NOR flash access

use thiserror::Error;

use crate::region::FlashRegion;

/// Errors reported by a flash driver.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    #[error("flash read failed at sector {0:#x}")]
    Read(u32),
    #[error("flash write failed at sector {0:#x}")]
    Write(u32),
    #[error("flash erase failed at sector {0:#x}")]
    Erase(u32),
    #[error("sector {0:#x} is outside the flash device")]
    OutOfBounds(u32),
}

/// Sector-granular interface to the device's NOR flash.
///
/// Sector numbers are absolute (the same numbering the flash controller
/// uses). A sector must be erased before bits can be set in it; a write can
/// only clear bits of an already-erased (0xFF) sector.
pub trait FlashDriver {
    /// Read one sector into `buf`. `buf` may be shorter than a sector.
    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Write `data` at the start of `sector` without erasing first.
    fn write_sector(&mut self, sector: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Erase `sector` back to all-0xFF.
    fn erase_sector(&mut self, sector: u32) -> Result<(), FlashError>;

    /// Borrowed view of the memory-mapped bytes covering `region`.
    ///
    /// On hardware this is the cached read window at the region's base
    /// address; reads through it must only happen while no upload is
    /// rewriting the region.
    fn mapped_region(&self, region: &FlashRegion) -> &[u8];
}

/// In-memory flash with NOR semantics, for host tests and simulation.
///
/// Erase sets a sector to 0xFF; writes AND into the existing bytes, so a
/// missing erase shows up as corrupted data instead of silently passing.
pub struct MemFlash {
    base_sector: u32,
    sector_size: usize,
    data: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
    fail_erases: bool,
}

impl MemFlash {
    /// Fresh (fully erased) flash covering exactly `region`.
    pub fn new(region: &FlashRegion) -> Self {
        Self {
            base_sector: region.start_sector(),
            sector_size: region.sector_size(),
            data: vec![0xFF; region.max_size()],
            fail_reads: false,
            fail_writes: false,
            fail_erases: false,
        }
    }

    /// Make subsequent reads fail, to exercise error paths.
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make subsequent writes fail, to exercise error paths.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make subsequent erases fail, to exercise error paths.
    pub fn set_fail_erases(&mut self, fail: bool) {
        self.fail_erases = fail;
    }

    fn sector_offset(&self, sector: u32) -> Result<usize, FlashError> {
        let index = sector
            .checked_sub(self.base_sector)
            .ok_or(FlashError::OutOfBounds(sector))? as usize;
        let offset = index * self.sector_size;
        if offset >= self.data.len() {
            return Err(FlashError::OutOfBounds(sector));
        }
        Ok(offset)
    }
}

impl FlashDriver for MemFlash {
    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        if self.fail_reads {
            return Err(FlashError::Read(sector));
        }
        let offset = self.sector_offset(sector)?;
        let len = buf.len().min(self.sector_size);
        buf[..len].copy_from_slice(&self.data[offset..offset + len]);
        Ok(())
    }

    fn write_sector(&mut self, sector: u32, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_writes {
            return Err(FlashError::Write(sector));
        }
        let offset = self.sector_offset(sector)?;
        let len = data.len().min(self.sector_size);
        for (cell, byte) in self.data[offset..offset + len].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), FlashError> {
        if self.fail_erases {
            return Err(FlashError::Erase(sector));
        }
        let offset = self.sector_offset(sector)?;
        self.data[offset..offset + self.sector_size].fill(0xFF);
        Ok(())
    }

    fn mapped_region(&self, region: &FlashRegion) -> &[u8] {
        let start = region
            .start_sector()
            .saturating_sub(self.base_sector) as usize
            * self.sector_size;
        let end = (start + region.max_size()).min(self.data.len());
        &self.data[start.min(self.data.len())..end]
    }
}
