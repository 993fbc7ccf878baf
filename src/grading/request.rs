//! The grading request value object.

use base64::Engine as _;
use serde_json::Value;

use super::normalize::NormalizedImage;
use super::prompt;

/// Everything one inference call needs: the normalized image payload,
/// the fixed instructions, the output schema, and the sampling
/// temperature. Immutable once constructed; one instance per
/// submission.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// Base64-encoded JPEG payload.
    pub image_base64: String,
    pub mime_type: &'static str,
    pub task_instruction: &'static str,
    pub system_instruction: &'static str,
    pub response_schema: Value,
    pub temperature: f32,
}

impl GradingRequest {
    /// Build the request for a normalized worksheet image.
    pub fn for_worksheet(image: &NormalizedImage, temperature: f32) -> Self {
        Self {
            image_base64: base64::engine::general_purpose::STANDARD
                .encode(&image.jpeg_bytes),
            mime_type: NormalizedImage::MIME_TYPE,
            task_instruction: prompt::TASK_INSTRUCTION,
            system_instruction: prompt::SYSTEM_INSTRUCTION,
            response_schema: prompt::response_schema(),
            temperature,
        }
    }
}
