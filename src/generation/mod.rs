pub mod gemini;
pub mod prompts;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::codebase::CodebaseBundle;
use crate::pr::DiffPayload;

/// Report text used when the service answers successfully but with no text.
pub const EMPTY_RESPONSE_SENTINEL: &str = "⚠️ no response produced by the generation service";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode generation service response: {0}")]
    Decode(String),
}

/// A text-completion backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Model identifier reported in logs.
    fn model(&self) -> &str;

    /// Complete `prompt`.
    ///
    /// `Ok(None)` means the call succeeded but carried no usable text.
    /// Transport and service failures are errors.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    PrAnalysis,
    Architecture,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::PrAnalysis => write!(f, "pr-analysis"),
            ReportKind::Architecture => write!(f, "architecture"),
        }
    }
}

/// One generation round-trip: the prompt sent and the text kept.
#[derive(Debug, Clone)]
pub struct AiReport {
    pub kind: ReportKind,
    pub prompt_text: String,
    /// Generated text, or `EMPTY_RESPONSE_SENTINEL`
    pub result_text: String,
}

/// Review a PR diff.
pub async fn analyze_pr(
    service: &dyn GenerationService,
    diff: &DiffPayload,
) -> Result<AiReport, GenerationError> {
    let prompt = prompts::pr_analysis(&diff.raw_text);
    run(service, ReportKind::PrAnalysis, prompt).await
}

/// Describe the architecture of the collected codebase.
pub async fn analyze_architecture(
    service: &dyn GenerationService,
    bundle: &CodebaseBundle,
) -> Result<AiReport, GenerationError> {
    let prompt = prompts::architecture(&bundle.text);
    run(service, ReportKind::Architecture, prompt).await
}

#[instrument(skip(service, prompt), fields(model = %service.model(), prompt_chars = prompt.chars().count()))]
async fn run(
    service: &dyn GenerationService,
    kind: ReportKind,
    prompt: String,
) -> Result<AiReport, GenerationError> {
    debug!("calling generation service");
    let result_text = match service.generate(&prompt).await? {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            warn!("generation service returned no text, using sentinel");
            EMPTY_RESPONSE_SENTINEL.to_string()
        }
    };
    info!(result_chars = result_text.chars().count(), "report generated");
    Ok(AiReport {
        kind,
        prompt_text: prompt,
        result_text,
    })
}
