//! Data model for the grading pipeline.
//!
//! Wire names are camelCase — they are the contract with both the
//! inference boundary (response schema) and the HTTP surface.

use serde::{Deserialize, Serialize};

/// User-supplied upload: opaque bytes plus the declared media type.
/// Ephemeral — lives for one submission only.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Whether the declared media type is an image type at all.
    /// Checked before any decoding work is spent.
    pub fn declares_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Spatial location of one graded line, on the model's fixed 0-1000
/// normalized scale, independent of actual pixel dimensions.
///
/// Wire format is a 4-element integer array `[ymin, xmin, ymax, xmax]`.
/// Range and ordering invariants are enforced by the response parser,
/// not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub ymin: i64,
    pub xmin: i64,
    pub ymax: i64,
    pub xmax: i64,
}

impl From<[i64; 4]> for BoundingBox {
    fn from([ymin, xmin, ymax, xmax]: [i64; 4]) -> Self {
        Self {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.ymin, b.xmin, b.ymax, b.xmax]
    }
}

/// One evaluated line of handwritten work.
///
/// `line_number` is assigned by the model in top-to-bottom reading
/// order; it is not cross-validated against the bounding box (the
/// model's declared order is canonical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub line_number: u32,
    pub latex: String,
    pub is_correct: bool,
    /// Empty or affirmative when correct; corrective when incorrect.
    pub explanation: String,
    pub bounding_box: BoundingBox,
}
