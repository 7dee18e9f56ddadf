//! Pipeline entry points for the sync job.
//!
//! - `SyncJob`: one run from fetch to metadata report
//! - `StoreSynchronizer`: the delete-all / write-all phases
//! - `RunReporter`: the metadata record writer

pub mod report;
pub mod run;
pub mod sync;

pub use report::RunReporter;
pub use run::{RunStage, RunSummary, SyncJob};
pub use sync::StoreSynchronizer;
