//! Flash-resident uploadable web page store.
//!
//! A networked device keeps one user-replaceable web page in a reserved
//! range of flash sectors. This crate owns that region: it runs the
//! begin/put/finish upload protocol that rewrites it, detects the stored
//! page's length (a NUL terminator, no length field), serves a placeholder
//! while an upload is in progress, and finishes stuck uploads with a
//! watchdog so a dropped client cannot wedge the store.
//!
//! The HTTP layer, transport and the real flash controller live elsewhere;
//! hardware comes in through the [`flash::FlashDriver`] trait, which keeps
//! the whole crate testable on the host (see [`flash::MemFlash`]).

pub mod config;
pub mod error;
pub mod flash;
pub mod region;
pub mod scanner;
mod session;
pub mod store;
pub mod templates;
mod timeout;

pub use config::PageConfig;
pub use error::PageError;
pub use flash::{FlashDriver, FlashError, MemFlash};
pub use region::FlashRegion;
pub use store::{PageStore, UploadState};
