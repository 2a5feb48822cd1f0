// src/services/registry.rs

//! Registry API client.
//!
//! Streams pages of raw study records from the registry, following
//! continuation tokens until the server stops returning one. A transport
//! failure mid-stream ends the page sequence without surfacing an error;
//! the cursor records it as a truncated run instead so callers can tell a
//! partial window from a complete one.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{RawStudy, RegistryConfig};

/// Fields requested from the registry for every study.
pub const STUDY_FIELDS: [&str; 17] = [
    "NCTId",
    "BriefTitle",
    "StartDate",
    "CompletionDate",
    "LeadSponsorName",
    "ResponsiblePartyInvestigatorFullName",
    "ResponsiblePartyInvestigatorAffiliation",
    "OverallStatus",
    "Phase",
    "EnrollmentCount",
    "OverallOfficialName",
    "OverallOfficialAffiliation",
    "OverallOfficialRole",
    "LocationFacility",
    "LocationCity",
    "LocationCountry",
    "EligibilityCriteria",
];

/// Known registry backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSource {
    /// The live ClinicalTrials.gov v2 API
    ClinicalTrials,
    /// A no-op source yielding a single empty page
    Mock,
}

impl FromStr for ApiSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clinical_trials" => Ok(Self::ClinicalTrials),
            "mocked_api" => Ok(Self::Mock),
            other => Err(AppError::config(format!(
                "Unknown API client source: {other}"
            ))),
        }
    }
}

/// Inclusive date range filtering on the registry's last-update timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Registry query expression selecting records updated in this window.
    pub fn query_term(&self) -> String {
        format!("AREA[LastUpdatePostDate]RANGE[{},{}]", self.start, self.end)
    }
}

/// One page of the registry's response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrialPage {
    pub studies: Vec<RawStudy>,
    pub next_page_token: Option<String>,
}

/// A registry backend that can serve one page at a time.
#[async_trait]
pub trait TrialRegistry: Send + Sync {
    /// Fetch a single page; `page_token` is `None` for the first request.
    async fn fetch_page(
        &self,
        window: DateWindow,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<TrialPage>;
}

/// HTTP client for the ClinicalTrials.gov v2 API.
pub struct ClinicalTrialsClient {
    config: RegistryConfig,
    client: reqwest::Client,
}

impl ClinicalTrialsClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TrialRegistry for ClinicalTrialsClient {
    async fn fetch_page(
        &self,
        window: DateWindow,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<TrialPage> {
        let url = format!("{}/studies", self.config.base_url.trim_end_matches('/'));

        let mut query: Vec<(&str, String)> = vec![
            ("format", "json".to_string()),
            ("query.term", window.query_term()),
            ("pageSize", page_size.to_string()),
            ("fields", STUDY_FIELDS.join(",")),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let page = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<TrialPage>()
            .await?;

        Ok(page)
    }
}

/// Test double source: one empty page, no continuation token.
pub struct MockRegistryClient;

#[async_trait]
impl TrialRegistry for MockRegistryClient {
    async fn fetch_page(
        &self,
        _window: DateWindow,
        _page_size: u32,
        _page_token: Option<&str>,
    ) -> Result<TrialPage> {
        Ok(TrialPage::default())
    }
}

/// Build the registry backend for a source tag.
pub fn registry_for(source: ApiSource, config: &RegistryConfig) -> Result<Arc<dyn TrialRegistry>> {
    match source {
        ApiSource::ClinicalTrials => Ok(Arc::new(ClinicalTrialsClient::new(config.clone())?)),
        ApiSource::Mock => Ok(Arc::new(MockRegistryClient)),
    }
}

/// Page-by-page cursor over a registry.
///
/// Yields pages until the registry stops returning a continuation token or
/// a request fails. Failures are logged, not returned: the pages already
/// yielded stay valid and [`PageCursor::truncated`] reports that the window
/// was not fully covered.
pub struct PageCursor {
    registry: Arc<dyn TrialRegistry>,
    window: DateWindow,
    page_size: u32,
    delay: Duration,
    token: Option<String>,
    started: bool,
    done: bool,
    truncated: bool,
}

impl PageCursor {
    pub fn new(
        registry: Arc<dyn TrialRegistry>,
        window: DateWindow,
        page_size: u32,
        delay: Duration,
    ) -> Self {
        Self {
            registry,
            window,
            page_size,
            delay,
            token: None,
            started: false,
            done: false,
            truncated: false,
        }
    }

    /// Fetch the next page, or `None` once the sequence has ended.
    pub async fn next_page(&mut self) -> Option<Vec<RawStudy>> {
        if self.done {
            return None;
        }

        // Cooperative rate limit between successive requests.
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;

        let token = self.token.take();
        match self
            .registry
            .fetch_page(self.window, self.page_size, token.as_deref())
            .await
        {
            Ok(page) => {
                match page.next_page_token {
                    Some(next) => self.token = Some(next),
                    None => {
                        log::warn!("no more page token");
                        self.done = true;
                    }
                }
                Some(page.studies)
            }
            Err(error) => {
                log::warn!("Error streaming studies: {error}");
                self.truncated = true;
                self.done = true;
                None
            }
        }
    }

    /// Whether the sequence ended on a failure rather than a final page.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}
