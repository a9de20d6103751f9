//! Google Gemini `generateContent` client.
//!
//! POST {endpoint}/v1beta/models/{model}:generateContent
//!
//! Non-streaming. The API key travels in the `x-goog-api-key` header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::{GenerationError, GenerationService};
use crate::config::GenerationSettings;

/// Longest response body excerpt kept in errors.
const ERROR_SNIPPET_CHARS: usize = 500;

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl GeminiClient {
    pub fn new(settings: &GenerationSettings, api_key: &str) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            settings.endpoint.trim_end_matches('/'),
            settings.model
        );
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            url,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        let started = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "POST generateContent");
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(ERROR_SNIPPET_CHARS).collect();
            error!(
                status = status.as_u16(),
                %snippet,
                latency_ms = started.elapsed().as_millis() as u64,
                "generateContent returned non-success status"
            );
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            "generateContent completed"
        );
        Ok(parsed.into_text())
    }
}
