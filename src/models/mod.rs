// src/models/mod.rs

//! Domain models for the ingestion pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod raw;
mod trial;

// Re-export all public types
pub use config::{Config, EnrichmentConfig, RegistryConfig, StoreConfig};
pub use raw::{
    ContactsLocationsModule, DateStruct, DesignModule, EligibilityModule, IdentificationModule,
    Official, ProtocolSection, RawLocation, RawStudy, StatusModule,
};
pub use trial::{Investigator, TrialRecord, TrialSite, UNKNOWN};
