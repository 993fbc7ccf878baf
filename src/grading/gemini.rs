//! Inference boundary client for Gemini-style `generateContent` APIs.
//!
//! The pipeline only knows the `VisionClient` trait; the concrete
//! client is injected at construction so tests substitute a mock.
//! One synchronous (request/response) call per submission, no retry —
//! every failure is terminal and surfaces as `InferenceError`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::GradingRequest;

/// Failures at the external inference boundary.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Cannot reach inference service at {0}")]
    Connection(String),

    #[error("Inference call timed out after {0}s")]
    Timeout(u64),

    #[error("Inference service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Inference reply missing text content: {0}")]
    MalformedReply(String),
}

/// The external multimodal model, as an opaque request/response seam.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Submit one grading request; returns the model's raw text output.
    async fn generate(&self, request: &GradingRequest) -> Result<String, InferenceError>;
}

// ──────────────────────────────────────────────
// Wire types (Gemini REST, camelCase)
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentBody<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: TextContent<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'a str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a Value,
}

#[derive(Deserialize)]
struct GenerateContentReply {
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
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Error envelope the service returns on non-2xx statuses.
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn build_body(request: &GradingRequest) -> GenerateContentBody<'_> {
    GenerateContentBody {
        system_instruction: TextContent {
            parts: vec![Part::Text {
                text: request.system_instruction,
            }],
        },
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: request.mime_type,
                        data: &request.image_base64,
                    },
                },
                Part::Text {
                    text: request.task_instruction,
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

// ──────────────────────────────────────────────
// GeminiClient
// ──────────────────────────────────────────────

/// Production client over the hosted inference service.
///
/// Shared, long-lived: one instance per process, injected into the
/// pipeline as `Arc<dyn VisionClient>`.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
            client,
        })
    }

    pub fn from_config(config: &crate::config::GraderConfig) -> Result<Self, InferenceError> {
        Self::new(
            &config.base_url,
            &config.model,
            &config.api_key,
            config.timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn generate(&self, request: &GradingRequest) -> Result<String, InferenceError> {
        let start = std::time::Instant::now();
        let body = build_body(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else {
                    InferenceError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .ok()
                .and_then(|env| env.error)
                .and_then(|detail| detail.message)
                .unwrap_or(raw);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateContentReply = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedReply(e.to_string()))?;

        let text: String = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(InferenceError::MalformedReply(
                "no candidate text in reply".into(),
            ));
        }

        tracing::info!(
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            reply_len = text.len(),
            "Grading inference complete"
        );

        Ok(text)
    }
}

// ──────────────────────────────────────────────
// MockVisionClient (testing)
// ──────────────────────────────────────────────

/// Mock inference client: configurable reply or failure, counts calls
/// so tests can assert that rejected input never reaches the boundary.
pub struct MockVisionClient {
    reply: String,
    failure: Option<(u16, String)>,
    calls: AtomicUsize,
}

impl MockVisionClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with the given API status and message.
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            reply: String::new(),
            failure: Some((status, message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn generate(&self, _request: &GradingRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some((status, message)) => Err(InferenceError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(self.reply.clone()),
        }
    }
}
