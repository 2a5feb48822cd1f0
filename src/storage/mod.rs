//! Storage abstractions for trial persistence.
//!
//! One document per distinct `trialId`; re-ingesting a trial replaces the
//! stored document in full (last write wins). Backends are selected through
//! the closed [`StoreKind`] enum so an unknown tag fails at configuration
//! time, not at first write.

pub mod mongo;

use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::TrialRecord;

// Re-export for convenience
pub use mongo::MongoStore;

/// Known document-store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
}

impl FromStr for StoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mongo" => Ok(Self::Mongo),
            other => Err(AppError::config(format!("Unknown database type: {other}"))),
        }
    }
}

/// Counts reported by one batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Documents created for a previously unseen `trialId`
    pub inserted: u64,
    /// Documents replaced for an existing `trialId`
    pub updated: u64,
    /// Individual writes that failed; the rest of the batch is unaffected
    pub failed: u64,
}

impl UpsertOutcome {
    /// Total documents written.
    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Trait for trial storage backends.
#[async_trait]
pub trait TrialStore: Send + Sync {
    /// Upsert a batch keyed on `trialId`. Writes are unordered; one
    /// record's failure never blocks the others.
    async fn upsert_batch(&self, trials: &[TrialRecord]) -> Result<UpsertOutcome>;
}
