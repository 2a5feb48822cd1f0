//! Pipeline entry point for ingestion runs.
//!
//! - `TrialPipeline`: drives fetch → normalize → enrich → persist for a
//!   date window, one page at a time

pub mod ingest;

pub use ingest::{PipelineReport, TrialPipeline};
