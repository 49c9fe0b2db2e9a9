// Flash region model - the reserved sector range holding the uploadable page

use crate::error::PageError;

/// Immutable description of the reserved flash region.
///
/// The region spans `[start_sector, end_sector)` and is read back through the
/// memory-mapped window at `base_address`. Byte 0 of the region doubles as
/// the "page present" marker (zero means no page) and as the first byte of
/// page content; there is no separate header or length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    start_sector: u32,
    end_sector: u32,
    sector_size: usize,
    base_address: u32,
}

impl FlashRegion {
    pub fn new(
        start_sector: u32,
        end_sector: u32,
        sector_size: usize,
        base_address: u32,
    ) -> Result<Self, PageError> {
        if end_sector <= start_sector {
            return Err(PageError::InvalidRegion("end sector must be past start sector"));
        }
        if sector_size == 0 {
            return Err(PageError::InvalidRegion("sector size must be nonzero"));
        }
        Ok(Self {
            start_sector,
            end_sector,
            sector_size,
            base_address,
        })
    }

    pub fn start_sector(&self) -> u32 {
        self.start_sector
    }

    pub fn end_sector(&self) -> u32 {
        self.end_sector
    }

    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Start of the memory-mapped read window for this flash device.
    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    pub fn sector_count(&self) -> u32 {
        self.end_sector - self.start_sector
    }

    /// Largest page the region can hold, in bytes.
    pub fn max_size(&self) -> usize {
        self.sector_count() as usize * self.sector_size
    }
}
