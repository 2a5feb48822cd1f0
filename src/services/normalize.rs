// src/services/normalize.rs

//! Raw-record normalization.
//!
//! Flattens the registry's nested study structure into [`TrialRecord`]s.
//! Pure, no I/O; missing structure at any depth resolves to the `Unknown`
//! sentinel and never fails a record.

use crate::models::{
    ContactsLocationsModule, DateStruct, Investigator, Official, RawStudy, TrialRecord, TrialSite,
    UNKNOWN,
};

/// Normalize one page of raw studies.
pub fn normalize_page(studies: &[RawStudy]) -> Vec<TrialRecord> {
    if studies.is_empty() {
        log::error!("No raw studies provided");
        return Vec::new();
    }

    let records: Vec<TrialRecord> = studies.iter().map(normalize_study).collect();
    log::warn!("Transformed {} studies", records.len());
    records
}

fn normalize_study(study: &RawStudy) -> TrialRecord {
    let section = &study.protocol_section;
    let identification = &section.identification_module;
    let status = &section.status_module;
    let design = &section.design_module;
    let contacts = &section.contacts_locations_module;
    let eligibility = &section.eligibility_module;

    TrialRecord {
        trial_id: or_unknown(&identification.nct_id),
        title: or_unknown(&identification.brief_title),
        start_date: date_or_unknown(&status.start_date_struct),
        end_date: date_or_unknown(&status.completion_date_struct),
        phase: design
            .phases
            .clone()
            .unwrap_or_else(|| vec![UNKNOWN.to_string()]),
        principal_investigator: principal_investigator(&contacts.overall_officials),
        locations: trial_sites(contacts),
        eligibility_criteria: or_unknown(&eligibility.eligibility_criteria),
        inclusion_criteria: None,
        diseases: None,
    }
}

fn or_unknown(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

fn date_or_unknown(value: &Option<DateStruct>) -> String {
    value
        .as_ref()
        .and_then(|d| d.date.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// First official whose role is exactly `PRINCIPAL_INVESTIGATOR`,
/// case-insensitively.
fn principal_investigator(officials: &[Official]) -> Investigator {
    officials
        .iter()
        .find(|o| {
            o.role
                .as_deref()
                .unwrap_or_default()
                .to_uppercase()
                == "PRINCIPAL_INVESTIGATOR"
        })
        .map(|o| Investigator {
            name: or_unknown(&o.name),
            affiliation: or_unknown(&o.affiliation),
        })
        .unwrap_or_else(Investigator::unknown)
}

/// Study sites, with a single sentinel entry substituted for an empty list.
fn trial_sites(contacts: &ContactsLocationsModule) -> Vec<TrialSite> {
    if contacts.locations.is_empty() {
        return vec![TrialSite::unknown()];
    }
    contacts
        .locations
        .iter()
        .map(|l| TrialSite {
            facility: or_unknown(&l.facility),
            city: or_unknown(&l.city),
            country: or_unknown(&l.country),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study_from(value: serde_json::Value) -> RawStudy {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_page_is_a_no_op() {
        assert!(normalize_page(&[]).is_empty());
    }

    #[test]
    fn entirely_absent_structure_resolves_to_sentinels() {
        let records = normalize_page(&[RawStudy::default()]);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.trial_id, UNKNOWN);
        assert_eq!(record.title, UNKNOWN);
        assert_eq!(record.start_date, UNKNOWN);
        assert_eq!(record.end_date, UNKNOWN);
        assert_eq!(record.phase, vec![UNKNOWN.to_string()]);
        assert_eq!(record.principal_investigator, Investigator::unknown());
        assert_eq!(record.locations, vec![TrialSite::unknown()]);
        assert_eq!(record.eligibility_criteria, UNKNOWN);
        assert!(record.inclusion_criteria.is_none());
        assert!(record.diseases.is_none());
    }

    #[test]
    fn partially_missing_nesting_never_panics() {
        let studies = vec![
            study_from(serde_json::json!({ "protocolSection": {} })),
            study_from(serde_json::json!({
                "protocolSection": { "statusModule": { "startDateStruct": {} } }
            })),
            study_from(serde_json::json!({
                "protocolSection": {
                    "contactsLocationsModule": { "overallOfficials": [{}] }
                }
            })),
        ];

        let records = normalize_page(&studies);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.trial_id == UNKNOWN));
        assert_eq!(records[1].start_date, UNKNOWN);
    }

    #[test]
    fn maps_populated_study() {
        let records = normalize_page(&[study_from(serde_json::json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT123", "briefTitle": "Trial" },
                "statusModule": {
                    "startDateStruct": { "date": "2024-10-20" },
                    "completionDateStruct": { "date": "2025-03-01" }
                },
                "designModule": { "phases": ["PHASE1", "PHASE2"] },
                "contactsLocationsModule": {
                    "locations": [
                        { "facility": "Clinic", "city": "Lyon", "country": "France" },
                        { "city": "Oslo" }
                    ]
                },
                "eligibilityModule": { "eligibilityCriteria": "Inclusion Criteria: adults" }
            }
        }))]);

        let record = &records[0];
        assert_eq!(record.trial_id, "NCT123");
        assert_eq!(record.start_date, "2024-10-20");
        assert_eq!(record.end_date, "2025-03-01");
        assert_eq!(record.phase, vec!["PHASE1", "PHASE2"]);
        assert_eq!(record.locations.len(), 2);
        assert_eq!(record.locations[1].facility, UNKNOWN);
        assert_eq!(record.locations[1].city, "Oslo");
    }

    #[test]
    fn principal_investigator_role_match_is_case_insensitive_and_exact() {
        let records = normalize_page(&[study_from(serde_json::json!({
            "protocolSection": {
                "contactsLocationsModule": {
                    "overallOfficials": [
                        { "name": "Dr. Chair", "role": "STUDY_CHAIR" },
                        { "name": "Dr. Partial", "role": "deputy principal_investigator" },
                        { "name": "Dr. Lead", "affiliation": "Oslo University", "role": "principal_investigator" },
                        { "name": "Dr. Second", "role": "PRINCIPAL_INVESTIGATOR" }
                    ]
                }
            }
        }))]);

        let pi = &records[0].principal_investigator;
        assert_eq!(pi.name, "Dr. Lead");
        assert_eq!(pi.affiliation, "Oslo University");
    }

    #[test]
    fn missing_principal_investigator_defaults_to_unknown() {
        let records = normalize_page(&[study_from(serde_json::json!({
            "protocolSection": {
                "contactsLocationsModule": {
                    "overallOfficials": [{ "name": "Dr. Chair", "role": "STUDY_CHAIR" }]
                }
            }
        }))]);
        assert_eq!(records[0].principal_investigator, Investigator::unknown());
    }

    #[test]
    fn empty_location_list_becomes_single_sentinel_entry() {
        let records = normalize_page(&[study_from(serde_json::json!({
            "protocolSection": { "contactsLocationsModule": { "locations": [] } }
        }))]);
        assert_eq!(records[0].locations, vec![TrialSite::unknown()]);
    }
}
