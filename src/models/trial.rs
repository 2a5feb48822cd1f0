//! Flat trial record, the canonical in-pipeline entity.

use serde::{Deserialize, Serialize};

/// Sentinel substituted for any upstream field that is missing.
pub const UNKNOWN: &str = "Unknown";

/// A normalized clinical trial.
///
/// Produced by the normalizer with every base field populated (possibly
/// with the [`UNKNOWN`] sentinel). The enricher later fills
/// `inclusion_criteria` and `diseases`; both stay absent from the
/// serialized document when a record was passed through unenriched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    /// Registry-assigned identifier, the upsert key in storage
    pub trial_id: String,

    /// Brief title
    pub title: String,

    /// Start date in the registry's own format, passed through verbatim
    pub start_date: String,

    /// Completion date, same format
    pub end_date: String,

    /// Registry phase codes
    pub phase: Vec<String>,

    /// First listed official with the principal-investigator role
    pub principal_investigator: Investigator,

    /// Study sites; never empty (a single sentinel entry stands in for none)
    pub locations: Vec<TrialSite>,

    /// Free-text eligibility criteria
    pub eligibility_criteria: String,

    /// Text between the inclusion and exclusion markers, set by the enricher
    #[serde(
        rename = "inclusion_criteria",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inclusion_criteria: Option<String>,

    /// Disease mentions extracted from the inclusion criteria
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diseases: Option<String>,
}

impl TrialRecord {
    /// Whether the record carries the inputs the enricher needs.
    pub fn has_enrichment_inputs(&self) -> bool {
        self.trial_id != UNKNOWN && self.eligibility_criteria != UNKNOWN
    }
}

/// Principal investigator of a trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Investigator {
    pub name: String,
    pub affiliation: String,
}

impl Investigator {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            affiliation: UNKNOWN.to_string(),
        }
    }
}

/// One study site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialSite {
    pub facility: String,
    pub city: String,
    pub country: String,
}

impl TrialSite {
    pub fn unknown() -> Self {
        Self {
            facility: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        }
    }
}
