pub mod core;
pub mod edgar;
pub mod fetch;
pub mod inference;
pub mod mock;
pub mod output;
pub mod pipeline;
pub mod utils;

// Re-exports
pub use core::config::{Backend, ExtractionMode, ScanConfig};
pub use output::{FindingWriter, ProductFinding};
pub use pipeline::{RunStats, Scanner, SkipReason};
pub use utils::progress::ProgressTracker;
