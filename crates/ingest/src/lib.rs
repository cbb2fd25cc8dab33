//! Upstream record ingestion — endpoint clients, concurrent two-source
//! fetch, and the generation-guarded snapshot store.

pub mod snapshot;
pub mod source;

pub use snapshot::{Snapshot, SnapshotStore};
pub use source::{fetch_both, refresh, HttpRecordSource, RecordSource, RefreshOutcome};
