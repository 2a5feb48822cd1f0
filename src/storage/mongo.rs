// src/storage/mongo.rs

//! MongoDB storage backend.
//!
//! Connectivity is verified with a ping at construction; an unreachable
//! store is a fatal startup condition. The `trialId` index is (re)created
//! on every connect, which MongoDB treats as a no-op when it exists.

use futures::stream::{self, StreamExt};
use mongodb::bson::{Document, doc};
use mongodb::results::UpdateResult;
use mongodb::{Client, Collection, IndexModel};

use crate::error::Result;
use crate::models::{StoreConfig, TrialRecord};
use crate::storage::{TrialStore, UpsertOutcome};

use async_trait::async_trait;

/// MongoDB-backed trial store.
pub struct MongoStore {
    collection: Collection<Document>,
    max_concurrent_writes: usize,
}

impl MongoStore {
    /// Connect, ping, and ensure the `trialId` index.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let uri = config.resolved_uri();
        let client = Client::with_uri_str(&uri).await?;
        let database = client.database(&config.database);

        if let Err(error) = database.run_command(doc! { "ping": 1 }).await {
            log::warn!("Error connecting to MongoDB: {error}");
            return Err(error.into());
        }
        log::info!("Connected to MongoDB database {}", config.database);

        let collection = database.collection::<Document>(&config.collection);
        let index = collection
            .create_index(IndexModel::builder().keys(doc! { "trialId": 1 }).build())
            .await?;
        log::info!("Index created: {}", index.index_name);

        Ok(Self {
            collection,
            max_concurrent_writes: config.max_concurrent_writes.max(1),
        })
    }

    async fn upsert_one(&self, trial: &TrialRecord) -> Result<UpdateResult> {
        let document = mongodb::bson::to_document(trial)?;
        let result = self
            .collection
            .replace_one(doc! { "trialId": &trial.trial_id }, document)
            .upsert(true)
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl TrialStore for MongoStore {
    async fn upsert_batch(&self, trials: &[TrialRecord]) -> Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();

        let pending = trials
            .iter()
            .map(|trial| async move { (trial, self.upsert_one(trial).await) })
            .collect::<Vec<_>>();
        let mut writes = stream::iter(pending).buffer_unordered(self.max_concurrent_writes);

        while let Some((trial, result)) = writes.next().await {
            match result {
                Ok(write) if write.upserted_id.is_some() => outcome.inserted += 1,
                Ok(_) => outcome.updated += 1,
                Err(error) => {
                    outcome.failed += 1;
                    log::warn!("Upsert failed for {}: {error}", trial.trial_id);
                }
            }
        }

        log::warn!("Inserted/Updated {} documents", outcome.written());
        log::warn!("Inserted {} documents", outcome.inserted);
        log::warn!("Updated  {} documents", outcome.updated);

        Ok(outcome)
    }
}
