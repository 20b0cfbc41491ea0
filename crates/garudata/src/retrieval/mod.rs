//! Search and preview over stored collections

mod preview;
mod search;

pub use preview::PreviewService;
pub use search::{SearchEngine, SearchOutcome};
