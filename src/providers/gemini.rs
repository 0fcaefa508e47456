//! Google Gemini `generateContent` client.
//!
//! Sends a single user turn with the Google Search tool enabled so the
//! model can ground its answer in current news (injuries, streaks,
//! standings). See: <https://ai.google.dev/api/generate-content>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::check_status;
use super::traits::PreviewProvider;
use crate::{EnrichError, Result};

/// Default base URL for the Gemini API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default preview model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    http: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    ///
    /// No request timeout is set: a preview is generated once per game per
    /// day, so a slow answer is still worth waiting for.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().build()?;

        Ok(Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            http,
            base_url: base_url.into(),
        })
    }

    /// Use a different model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Generate text for `prompt`, grounded with Google Search.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest {
                contents: vec![Content {
                    role: "user",
                    parts: vec![RequestPart { text: prompt }],
                }],
                tools: vec![Tool {
                    google_search: GoogleSearch {},
                }],
            })
            .send()
            .await?;

        check_status(&response)?;

        let body: GenerateResponse = response.json().await?;

        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(EnrichError::MalformedResponse(format!(
                "prompt blocked: {reason}"
            )));
        }

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(EnrichError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[async_trait]
impl PreviewProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        GeminiClient::generate_content(self, prompt).await
    }
}
