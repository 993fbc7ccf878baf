//! inkgrade — grades photographed handwritten math worksheets.
//!
//! Pipeline: upload → image normalization (bounded-size JPEG) →
//! schema-constrained multimodal inference → defensive parse/validate
//! → per-line grading results with 0-1000 bounding boxes, mapped to
//! percentage overlay geometry at render time.

pub mod api;
pub mod config;
pub mod grading;

pub use config::GraderConfig;
pub use grading::{
    BoundingBox, GradingError, GradingPipeline, GradingResult, OverlayRect, RawImage,
};
