// Generative-content provider boundary.
//
// The session only sees `GenerationClient`: a prompt (plus optional JSON
// schema and grounding tool) goes in, text or images come out. Production
// uses `gemini::GeminiClient`; tests inject canned clients.

pub mod gemini;
pub mod prompt;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

/// Which model family a text request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    /// Long-form drafting, ideas and outlines.
    #[default]
    Quality,
    /// Quick editorial passes (analysis, suggestions).
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTarget {
    Text(ModelTier),
    Images { count: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Structured-output schema; the response text is then JSON.
    pub schema: Option<Value>,
    /// Allow the provider to ground the answer with web search.
    pub grounding: bool,
    pub target: GenerationTarget,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
            grounding: false,
            target: GenerationTarget::Text(ModelTier::Quality),
        }
    }

    pub fn image(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
            grounding: false,
            target: GenerationTarget::Images { count: 1 },
        }
    }

    pub fn fast(mut self) -> Self {
        self.target = GenerationTarget::Text(ModelTier::Fast);
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutput {
    Text(String),
    Images(Vec<GeneratedImage>),
}

impl GenerationOutput {
    pub fn into_text(self) -> Result<String, GenerationError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Images(_) => {
                Err(GenerationError::Failure("expected text but received images".into()))
            }
        }
    }

    pub fn into_images(self) -> Result<Vec<GeneratedImage>, GenerationError> {
        match self {
            Self::Images(images) if !images.is_empty() => Ok(images),
            Self::Images(_) => Err(GenerationError::Failure("no image was generated".into())),
            Self::Text(_) => {
                Err(GenerationError::Failure("expected images but received text".into()))
            }
        }
    }
}

/// Provider failures. Never retried automatically; the user re-triggers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("The AI service is rate limiting requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("The AI service rejected the API key. Please check your credentials.")]
    InvalidCredentials,

    #[error("AI request failed: {0}")]
    Failure(String),
}

impl GenerationError {
    /// Stable kind string for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Failure(_) => "generic_failure",
        }
    }
}

pub type GenerationFuture =
    Pin<Box<dyn Future<Output = Result<GenerationOutput, GenerationError>> + Send>>;

pub trait GenerationClient: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> GenerationFuture;
}
