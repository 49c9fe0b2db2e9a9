// Static pages served by the page store

/// Placeholder served instead of the stored page while an upload is
/// rewriting flash, so clients never see partially written content.
pub const FLASHING_PAGE: &str = include_str!("flashing.html");
