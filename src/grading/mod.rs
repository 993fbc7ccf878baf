//! Worksheet grading pipeline.
//!
//! Single flow per submission, each stage completing before the next:
//! raw upload → normalize → build request → inference call → parse →
//! ordered grading results. Every failure is terminal for the
//! submission — no retries, no partial results.

pub mod gemini;
pub mod geometry;
pub mod normalize;
pub mod parser;
pub mod prompt;
pub mod request;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

pub use gemini::{GeminiClient, InferenceError, MockVisionClient, VisionClient};
pub use geometry::OverlayRect;
pub use normalize::{NormalizeOptions, NormalizedImage};
pub use parser::ParseError;
pub use request::GradingRequest;
pub use types::{BoundingBox, GradingResult, RawImage};

use crate::config::GraderConfig;

/// The four failure kinds a submission can end with. Each maps to one
/// user-facing message at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    /// Missing or non-image input, detected before any processing.
    #[error("Invalid input: {0}")]
    Input(String),

    /// Raw bytes not decodable/encodable as a raster image.
    #[error("Image processing failed: {0}")]
    Decode(String),

    /// The external model call failed outright.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Model output could not be parsed as the expected array.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Everything one successful submission produces: the ordered results
/// and the normalized image whose bytes double as the display source.
#[derive(Debug)]
pub struct GradingOutcome {
    pub results: Vec<GradingResult>,
    pub image: NormalizedImage,
}

/// Orchestrates one submission end to end.
///
/// The inference client is injected (shared, long-lived) so tests run
/// against `MockVisionClient` without touching the network.
pub struct GradingPipeline {
    client: Arc<dyn VisionClient>,
    options: NormalizeOptions,
    temperature: f32,
}

impl GradingPipeline {
    pub fn new(client: Arc<dyn VisionClient>, config: &GraderConfig) -> Self {
        Self {
            client,
            options: NormalizeOptions {
                max_dimension: config.max_dimension,
                jpeg_quality: config.jpeg_quality,
            },
            temperature: config.temperature,
        }
    }

    /// Grade one uploaded worksheet photo.
    pub async fn grade(&self, raw: RawImage) -> Result<GradingOutcome, GradingError> {
        let start = std::time::Instant::now();
        debug!(
            media_type = %raw.media_type,
            upload_size = raw.bytes.len(),
            "Grading submission received"
        );

        // Gate on the declared media type before spending any work;
        // a rejected upload must never reach the inference boundary.
        if !raw.declares_image() {
            return Err(GradingError::Input(format!(
                "expected an image, got '{}'",
                raw.media_type
            )));
        }

        let image = normalize::normalize(raw.bytes, self.options).await?;
        let request = GradingRequest::for_worksheet(&image, self.temperature);
        let reply = self.client.generate(&request).await?;

        let results = parser::parse_grading_response(&reply).map_err(|e| {
            // Raw reply kept for diagnostics only; clients get a
            // generic message at the API boundary.
            debug!(raw_reply = %reply, "Unparseable grading reply");
            e
        })?;

        info!(
            lines = results.len(),
            incorrect = results.iter().filter(|r| !r.is_correct).count(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Worksheet graded"
        );

        Ok(GradingOutcome { results, image })
    }
}
