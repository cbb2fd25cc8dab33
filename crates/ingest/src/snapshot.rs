//! Snapshot store — the latest fetched records per source, guarded by a
//! refresh generation counter.
//!
//! In-flight fetches are not cancelled. Instead every refresh takes a
//! token before its requests go out, and an install presenting a
//! superseded token is rejected — a slow response can never overwrite a
//! newer one.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pulse_core::types::{RawRecord, SourceKind};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: Uuid,
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<RawRecord>,
}

#[derive(Default)]
pub struct SnapshotStore {
    generation: AtomicU64,
    snapshots: DashMap<SourceKind, Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh. The returned token must be presented when
    /// installing results.
    pub fn begin_refresh(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install fetched records for a source. Returns false — and drops the
    /// records — when a newer refresh has started since `token` was
    /// issued.
    pub fn install(&self, kind: SourceKind, records: Vec<RawRecord>, token: u64) -> bool {
        if token < self.generation.load(Ordering::SeqCst) {
            debug!(source = %kind, token, "Discarding superseded snapshot");
            return false;
        }
        self.snapshots.insert(
            kind,
            Snapshot {
                id: Uuid::new_v4(),
                generation: token,
                fetched_at: Utc::now(),
                records,
            },
        );
        true
    }

    /// Latest installed records for a source; empty when nothing has been
    /// fetched yet (or the only fetch failed).
    pub fn records(&self, kind: SourceKind) -> Vec<RawRecord> {
        self.snapshots
            .get(&kind)
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self, kind: SourceKind) -> Option<Snapshot> {
        self.snapshots.get(&kind).map(|s| s.clone())
    }

    /// Timestamp of the most recent successful install across sources.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.snapshots.iter().map(|entry| entry.value().fetched_at).max()
    }
}
