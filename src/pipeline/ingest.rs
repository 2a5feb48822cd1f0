// src/pipeline/ingest.rs

//! Ingestion orchestrator.
//!
//! Each page is driven fully through normalize → enrich → persist before
//! the next page is requested; only the enrichment stage fans out
//! internally. A transport failure upstream ends the run early without an
//! error, which the report surfaces through its `truncated` flag.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::Config;
use crate::services::{
    ApiSource, DateWindow, DiseaseExtractor, OpenAiExtractor, PageCursor, TrialEnricher,
    TrialRegistry, normalize_page, registry_for,
};
use crate::storage::{MongoStore, StoreKind, TrialStore};

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineReport {
    /// Pages received from the registry
    pub pages: usize,
    /// Raw records fetched across all pages
    pub fetched: usize,
    /// Documents created in the store
    pub inserted: u64,
    /// Documents replaced in the store
    pub updated: u64,
    /// Individual writes that failed
    pub failed: u64,
    /// Whether the registry stream ended on a failure before the window
    /// was fully covered
    pub truncated: bool,
}

/// Drives one date window through the full pipeline.
pub struct TrialPipeline {
    registry: Arc<dyn TrialRegistry>,
    enricher: TrialEnricher,
    store: Arc<dyn TrialStore>,
    config: Config,
}

impl TrialPipeline {
    /// Wire the pipeline from configuration tags, connecting to the store.
    ///
    /// An unreachable store fails here, before any fetch is attempted.
    pub async fn connect(source: ApiSource, store: StoreKind, config: Config) -> Result<Self> {
        let registry = registry_for(source, &config.registry)?;
        let store: Arc<dyn TrialStore> = match store {
            StoreKind::Mongo => Arc::new(MongoStore::connect(&config.store).await?),
        };
        let extractor: Arc<dyn DiseaseExtractor> =
            Arc::new(OpenAiExtractor::from_env(&config.enrichment)?);
        Ok(Self::with_parts(registry, extractor, store, config))
    }

    /// Wire the pipeline from pre-built collaborators.
    pub fn with_parts(
        registry: Arc<dyn TrialRegistry>,
        extractor: Arc<dyn DiseaseExtractor>,
        store: Arc<dyn TrialStore>,
        config: Config,
    ) -> Self {
        let enricher = TrialEnricher::new(extractor, config.enrichment.max_workers);
        Self {
            registry,
            enricher,
            store,
            config,
        }
    }

    /// Run the pipeline over `[start, end]` to completion.
    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<PipelineReport> {
        let window = DateWindow { start, end };
        log::info!(
            "Ingesting trials updated between {} and {}",
            window.start,
            window.end
        );

        let mut cursor = PageCursor::new(
            Arc::clone(&self.registry),
            window,
            self.config.registry.page_size,
            Duration::from_millis(self.config.registry.page_delay_ms),
        );

        let mut report = PipelineReport::default();
        while let Some(studies) = cursor.next_page().await {
            report.pages += 1;
            report.fetched += studies.len();

            let records = normalize_page(&studies);
            let enriched = self.enricher.enrich(records).await;
            let outcome = self.store.upsert_batch(&enriched).await?;

            report.inserted += outcome.inserted;
            report.updated += outcome.updated;
            report.failed += outcome.failed;
        }

        report.truncated = cursor.truncated();
        if report.truncated {
            log::warn!(
                "Registry stream ended early; the requested window may be partially covered"
            );
        }

        log::info!(
            "Run complete: {} pages, {} fetched, {} inserted, {} updated, {} failed",
            report.pages,
            report.fetched,
            report.inserted,
            report.updated,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::models::{RawStudy, TrialRecord};
    use crate::services::TrialPage;
    use crate::storage::UpsertOutcome;

    /// Registry double replaying scripted pages.
    struct ScriptedRegistry {
        responses: Mutex<VecDeque<Result<TrialPage>>>,
    }

    #[async_trait]
    impl TrialRegistry for ScriptedRegistry {
        async fn fetch_page(
            &self,
            _window: DateWindow,
            _page_size: u32,
            _page_token: Option<&str>,
        ) -> Result<TrialPage> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("pipeline requested more pages than scripted")
        }
    }

    /// In-memory store keyed the same way the real backend is.
    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<HashMap<String, TrialRecord>>,
    }

    #[async_trait]
    impl TrialStore for MemoryStore {
        async fn upsert_batch(&self, trials: &[TrialRecord]) -> Result<UpsertOutcome> {
            let mut documents = self.documents.lock().unwrap();
            let mut outcome = UpsertOutcome::default();
            for trial in trials {
                match documents.insert(trial.trial_id.clone(), trial.clone()) {
                    Some(_) => outcome.updated += 1,
                    None => outcome.inserted += 1,
                }
            }
            Ok(outcome)
        }
    }

    struct FixedExtractor;

    #[async_trait]
    impl DiseaseExtractor for FixedExtractor {
        async fn extract(&self, _text: &str) -> Result<String> {
            Ok("asthma".to_string())
        }
    }

    fn raw_study(id: &str, title: &str) -> RawStudy {
        serde_json::from_value(serde_json::json!({
            "protocolSection": {
                "identificationModule": { "nctId": id, "briefTitle": title },
                "eligibilityModule": {
                    "eligibilityCriteria": "Inclusion Criteria: adults Exclusion Criteria: none"
                }
            }
        }))
        .unwrap()
    }

    fn page(studies: Vec<RawStudy>, token: Option<&str>) -> Result<TrialPage> {
        Ok(TrialPage {
            studies,
            next_page_token: token.map(String::from),
        })
    }

    fn pipeline(
        responses: Vec<Result<TrialPage>>,
        store: Arc<MemoryStore>,
    ) -> TrialPipeline {
        let mut config = Config::default();
        config.registry.page_delay_ms = 0;
        TrialPipeline::with_parts(
            Arc::new(ScriptedRegistry {
                responses: Mutex::new(responses.into()),
            }),
            Arc::new(FixedExtractor),
            store,
            config,
        )
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 10, 20).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 22).unwrap(),
        )
    }

    #[tokio::test]
    async fn drives_every_page_through_to_the_store() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(
            vec![
                page(
                    vec![raw_study("NCT001", "First"), raw_study("NCT002", "Second")],
                    Some("next"),
                ),
                page(vec![raw_study("NCT003", "Third")], None),
            ],
            Arc::clone(&store),
        );

        let (start, end) = dates();
        let report = pipeline.run(start, end).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.updated, 0);
        assert!(!report.truncated);

        let documents = store.documents.lock().unwrap();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents["NCT001"].diseases.as_deref(), Some("asthma"));
    }

    #[tokio::test]
    async fn reingesting_a_trial_keeps_one_document_with_the_later_title() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(
            vec![
                page(vec![raw_study("NCT001", "Old Title")], Some("next")),
                page(vec![raw_study("NCT001", "New Title")], None),
            ],
            Arc::clone(&store),
        );

        let (start, end) = dates();
        let report = pipeline.run(start, end).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);

        let documents = store.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents["NCT001"].title, "New Title");
    }

    #[tokio::test]
    async fn transport_failure_truncates_but_keeps_prior_pages() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(
            vec![
                page(vec![raw_study("NCT001", "First")], Some("next")),
                Err(AppError::config("connection reset")),
            ],
            Arc::clone(&store),
        );

        let (start, end) = dates();
        let report = pipeline.run(start, end).await.unwrap();

        assert_eq!(report.pages, 1);
        assert!(report.truncated);
        assert_eq!(store.documents.lock().unwrap().len(), 1);
    }
}
