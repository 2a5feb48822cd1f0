// src/services/diseases.rs

//! Disease extraction collaborator.
//!
//! Narrow contract: one free-text string in, one free-text string out
//! listing the diseases mentioned (or empty). The production backend is an
//! OpenAI-compatible chat-completions endpoint.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::EnrichmentConfig;

/// Instruction sent ahead of the text under analysis.
const EXTRACTION_PROMPT: &str = "Identify and list all diseases or medical conditions in the \
     following text. Do not include any other text, if it does not include any disease return \
     an empty string.";

/// Extracts disease mentions from free text.
#[async_trait]
pub trait DiseaseExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<String>;
}

/// Chat-completions backed extractor.
///
/// The API key is read from `OPENAI_API_KEY` at construction but only
/// required once a call is actually made, so sources that never enrich
/// anything (e.g. the mocked registry) run without credentials.
pub struct OpenAiExtractor {
    config: EnrichmentConfig,
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiExtractor {
    pub fn from_env(config: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.clone(),
            client,
            api_key: env::var("OPENAI_API_KEY").ok(),
        })
    }

    fn user_prompt(text: &str) -> String {
        format!("{EXTRACTION_PROMPT}\n\nText: {text}")
    }
}

#[async_trait]
impl DiseaseExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::extraction("chat request", "OPENAI_API_KEY is not set"))?;

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": Self::user_prompt(text) }],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::extraction("chat response", "no choices returned"))?;

        Ok(choice.message.content)
    }
}
