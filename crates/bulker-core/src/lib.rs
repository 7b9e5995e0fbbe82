//! Orchestration engine: partitions the input, runs one external process per
//! task under a concurrency bound, and consolidates every result into a single
//! output file.
pub mod error;
pub use error::CoreError;

mod cancel;
pub use cancel::{CancelReason, RunCancel};

pub mod catalog;
pub use catalog::{CatalogError, ToolCatalog};

pub mod partition;

mod signal;

mod sink;
pub use sink::{OutputSink, backup_path_for};

mod state;
pub use state::TaskState;

pub mod system;

mod runner;
pub use runner::{Phase, Runner};
