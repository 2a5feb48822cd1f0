//! Service layer for the ingestion pipeline.
//!
//! This module contains the business logic for:
//! - Registry paging (`TrialRegistry`, `PageCursor`)
//! - Record flattening (`normalize_page`)
//! - Disease extraction (`DiseaseExtractor`, `OpenAiExtractor`)
//! - Parallel enrichment (`TrialEnricher`)

mod diseases;
mod enrich;
mod normalize;
mod registry;

pub use diseases::{DiseaseExtractor, OpenAiExtractor};
pub use enrich::TrialEnricher;
pub use normalize::normalize_page;
pub use registry::{
    ApiSource, ClinicalTrialsClient, DateWindow, MockRegistryClient, PageCursor, STUDY_FIELDS,
    TrialPage, TrialRegistry, registry_for,
};
