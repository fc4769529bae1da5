// Google Gemini REST client.
//
// Text goes through `models/{model}:generateContent`, images through the
// Imagen `models/{model}:predict` endpoint. The API key travels in the
// `x-goog-api-key` header so it never ends up in logged URLs.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::{
    GeneratedImage, GenerationClient, GenerationError, GenerationFuture, GenerationOutput,
    GenerationRequest, GenerationTarget, ModelTier,
};
use crate::config::GenerationConfig;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    text_model: String,
    fast_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self, url::ParseError> {
        let mut endpoint = Url::parse(&config.endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                endpoint,
                api_key: api_key.into(),
                text_model: config.text_model.clone(),
                fast_model: config.fast_model.clone(),
                image_model: config.image_model.clone(),
            }),
        })
    }
}

impl GenerationClient for GeminiClient {
    fn generate(&self, request: GenerationRequest) -> GenerationFuture {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            match request.target {
                GenerationTarget::Text(tier) => inner.generate_text(&request, tier).await,
                GenerationTarget::Images { count } => inner.generate_images(&request, count).await,
            }
        })
    }
}

impl Inner {
    async fn generate_text(
        &self,
        request: &GenerationRequest,
        tier: ModelTier,
    ) -> Result<GenerationOutput, GenerationError> {
        let model = match tier {
            ModelTier::Quality => &self.text_model,
            ModelTier::Fast => &self.fast_model,
        };
        let url = self.model_url(model, "generateContent")?;
        let body = text_request_body(request);
        debug!(model = %model, grounding = request.grounding, "sending generateContent request");

        let response: GenerateContentResponse = self.post(url, &body).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::Failure("the model returned an empty response".into()));
        }
        Ok(GenerationOutput::Text(text))
    }

    async fn generate_images(
        &self,
        request: &GenerationRequest,
        count: u8,
    ) -> Result<GenerationOutput, GenerationError> {
        let url = self.model_url(&self.image_model, "predict")?;
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": { "sampleCount": count.max(1) },
        });
        debug!(model = %self.image_model, count, "sending predict request");

        let response: PredictResponse = self.post(url, &body).await?;
        let images = response
            .predictions
            .into_iter()
            .filter_map(|prediction| {
                prediction.bytes_base64_encoded.map(|data| GeneratedImage {
                    mime_type: prediction.mime_type.unwrap_or_else(|| "image/png".into()),
                    data_base64: data,
                })
            })
            .collect::<Vec<_>>();
        GenerationOutput::Images(images).into_images().map(GenerationOutput::Images)
    }

    fn model_url(&self, model: &str, method: &str) -> Result<Url, GenerationError> {
        self.endpoint
            .join(&format!("v1beta/models/{model}:{method}"))
            .map_err(|error| GenerationError::Failure(format!("invalid model url: {error}")))
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        body: &Value,
    ) -> Result<T, GenerationError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|error| GenerationError::Failure(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_failure(status, &body);
            warn!(status = status.as_u16(), kind = error.kind(), "generation request rejected");
            return Err(error);
        }

        response
            .json::<T>()
            .await
            .map_err(|error| GenerationError::Failure(format!("malformed response: {error}")))
    }
}

fn text_request_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
    });
    if let Some(schema) = &request.schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    if request.grounding {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }
    body
}

/// Map an HTTP failure onto the provider error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        return GenerationError::RateLimited;
    }
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API key not valid")
        || body.contains("API_KEY_INVALID")
    {
        return GenerationError::InvalidCredentials;
    }
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
    GenerationError::Failure(message)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content.parts.iter().filter_map(|part| part.text.as_deref()).collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}
