//! Fixed instructions and output schema for the grading call.
//!
//! The system instruction pins five behaviors: full top-to-bottom line
//! segmentation, step-by-step evaluation with prior lines as context,
//! 0-1000 bounding-box localization, corrective explanations only for
//! incorrect lines, and LaTeX transcription. The schema is a hard
//! constraint handed to the inference boundary, not merely a hint; the
//! textual "single JSON array" directive covers boundaries that ignore
//! the structured form.

use serde_json::{json, Value};

/// Grading persona and output rules, sent as the system instruction.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a meticulous math teacher grading a handwritten worksheet photograph. \
Follow these rules exactly:\n\
1. Scan the entire page top to bottom and segment every handwritten line of work. \
Do not skip lines, including crossed-out or faint ones.\n\
2. Evaluate each line step by step for mathematical correctness, using all prior \
lines on the page as context for the current one.\n\
3. Localize each line with a bounding box [ymin, xmin, ymax, xmax] on a fixed \
0-1000 scale relative to the image, where (0,0) is the top-left corner.\n\
4. When a line is correct, leave the explanation empty. When a line is incorrect, \
give a brief corrective explanation of the specific mistake.\n\
5. Transcribe each line as LaTeX, exactly as written, including any errors.";

/// Per-request task text accompanying the image.
pub const TASK_INSTRUCTION: &str = "\
Grade every handwritten line on this worksheet. Respond with a single JSON array \
matching the required schema — no surrounding prose, no markdown fencing.";

/// Structured output schema: an array of objects with exactly the five
/// grading fields, all required. Declared in the inference boundary's
/// schema dialect (OpenAPI-style uppercase type names).
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "lineNumber": {
                    "type": "INTEGER",
                    "description": "1-based line index in top-to-bottom reading order"
                },
                "latex": {
                    "type": "STRING",
                    "description": "LaTeX transcription of the handwritten line"
                },
                "isCorrect": { "type": "BOOLEAN" },
                "explanation": {
                    "type": "STRING",
                    "description": "Empty when correct; brief correction when incorrect"
                },
                "boundingBox": {
                    "type": "ARRAY",
                    "items": { "type": "INTEGER" },
                    "description": "[ymin, xmin, ymax, xmax] on a 0-1000 scale"
                }
            },
            "required": ["lineNumber", "latex", "isCorrect", "explanation", "boundingBox"]
        }
    })
}
