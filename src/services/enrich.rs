// src/services/enrich.rs

//! Trial enrichment stage.
//!
//! Adds `inclusion_criteria` and `diseases` to each record that carries the
//! inputs for it, fanning out to a bounded pool of concurrent extraction
//! calls. Output order matches input order, and one failing extraction
//! never aborts the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use regex::Regex;

use crate::models::TrialRecord;
use crate::services::diseases::DiseaseExtractor;

/// Placeholder stored when a record has no inclusion-criteria section.
const NO_CRITERIA_PLACEHOLDER: &str =
    "No diseases found because no inclusion criteria was found";

/// Enrichment service over a disease-extraction collaborator.
pub struct TrialEnricher {
    extractor: Arc<dyn DiseaseExtractor>,
    max_workers: usize,
    inclusion_pattern: Regex,
}

impl TrialEnricher {
    pub fn new(extractor: Arc<dyn DiseaseExtractor>, max_workers: usize) -> Self {
        // Case-insensitive, dot-matches-newline: the section runs from the
        // inclusion marker to the exclusion marker or the end of the text.
        let inclusion_pattern =
            Regex::new(r"(?is)Inclusion Criteria:(.+?)(?:Exclusion Criteria:|$)")
                .expect("inclusion pattern is valid");
        Self {
            extractor,
            max_workers: max_workers.max(1),
            inclusion_pattern,
        }
    }

    /// Enrich a batch, preserving positional order.
    pub async fn enrich(&self, trials: Vec<TrialRecord>) -> Vec<TrialRecord> {
        if trials.is_empty() {
            return trials;
        }

        let workers = self.max_workers.min(trials.len());
        log::warn!("Starting parallel enrichment with {workers} workers");

        let enriched: Vec<TrialRecord> = stream::iter(trials)
            .map(|trial| self.enrich_one(trial))
            .buffered(workers)
            .collect()
            .await;

        log::info!("Enriched {} studies in parallel", enriched.len());
        enriched
    }

    /// Inclusion-criteria section of an eligibility text, trimmed; empty
    /// when no marker is present.
    pub fn inclusion_criteria(&self, eligibility: &str) -> String {
        self.inclusion_pattern
            .captures(eligibility)
            .and_then(|captures| captures.get(1))
            .map(|section| section.as_str().trim().to_string())
            .unwrap_or_default()
    }

    async fn enrich_one(&self, mut trial: TrialRecord) -> TrialRecord {
        if !trial.has_enrichment_inputs() {
            return trial;
        }

        let inclusion = self.inclusion_criteria(&trial.eligibility_criteria);
        let diseases = if inclusion.is_empty() {
            log::warn!("No text provided for disease extraction");
            NO_CRITERIA_PLACEHOLDER.to_string()
        } else {
            match self.extractor.extract(&inclusion).await {
                Ok(found) => found,
                Err(error) => {
                    log::error!("Error during disease extraction: {error}");
                    format!("No diseases found because of {error}")
                }
            }
        };

        trial.inclusion_criteria = Some(inclusion);
        trial.diseases = Some(diseases);
        trial
    }
}
