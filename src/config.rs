use serde::{Deserialize, Serialize};

use crate::error::PageError;
use crate::region::FlashRegion;

/// Page store settings as persisted by the host firmware.
///
/// Defaults match the reserved region used by the original device layout:
/// sectors 0x68..0x78 of 4096 bytes behind the memory-mapped flash window,
/// with a 60 second upload watchdog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PageConfig {
    pub start_sector: u32,
    pub end_sector: u32,
    pub sector_size: usize,
    pub base_address: u32,
    pub upload_timeout_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            start_sector: 0x68,
            end_sector: 0x78,
            sector_size: 4096,
            base_address: 0x4020_0000,
            upload_timeout_ms: 60_000,
        }
    }
}

impl PageConfig {
    /// Validated region described by this configuration.
    pub fn region(&self) -> Result<FlashRegion, PageError> {
        FlashRegion::new(
            self.start_sector,
            self.end_sector,
            self.sector_size,
            self.base_address,
        )
    }
}

/// Parse a stored configuration blob, falling back to defaults if it is
/// missing or unreadable.
pub fn load_or_default(raw: Option<&[u8]>) -> PageConfig {
    match raw {
        Some(bytes) => match serde_json::from_slice(bytes) {
            Ok(config) => {
                log::info!("Loaded page store configuration");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse page store configuration: {e}, using defaults");
                PageConfig::default()
            }
        },
        None => PageConfig::default(),
    }
}
