//! Defensive parsing of the model's grading output.
//!
//! The structured-output constraint reduces but does not guarantee
//! clean JSON: replies may still arrive wrapped in markdown fencing or
//! with surrounding whitespace. Cleanup strips those; parsing is then
//! strict — any malformed element fails the whole submission, and
//! post-parse validation enforces the range invariants the raw JSON
//! cannot express. Element order is preserved as the canonical line
//! order; results are never re-sorted.

use super::types::GradingResult;

/// Model output that cannot be turned into grading results.
///
/// Messages describe the violation for internal diagnostics; the raw
/// model text itself is logged by the caller, never embedded here and
/// never shown to end users.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Model returned an empty response")]
    Empty,

    #[error("Model response is not a valid grading array: {0}")]
    Json(String),

    #[error("Grading result {index} violates the output contract: {reason}")]
    Schema { index: usize, reason: String },
}

/// Parse raw model text into an ordered list of grading results.
pub fn parse_grading_response(raw: &str) -> Result<Vec<GradingResult>, ParseError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let results: Vec<GradingResult> =
        serde_json::from_str(cleaned).map_err(|e| ParseError::Json(e.to_string()))?;

    for (index, result) in results.iter().enumerate() {
        validate_result(index, result)?;
    }

    Ok(results)
}

/// Strip one level of markdown code fencing (with or without a
/// language tag) plus surrounding whitespace.
fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Opening fence may carry a language tag ("json"); content
        // starts after the first newline.
        s = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
    }
    s = s.trim_end();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Range checks JSON typing cannot express: positive line numbers and
/// well-formed boxes on the 0-1000 scale. A violation anywhere fails
/// the submission — degenerate rectangles must never reach rendering.
fn validate_result(index: usize, result: &GradingResult) -> Result<(), ParseError> {
    let schema_err = |reason: String| ParseError::Schema { index, reason };

    if result.line_number < 1 {
        return Err(schema_err("lineNumber must be >= 1".into()));
    }

    let b = result.bounding_box;
    for (name, value) in [
        ("ymin", b.ymin),
        ("xmin", b.xmin),
        ("ymax", b.ymax),
        ("xmax", b.xmax),
    ] {
        if !(0..=1000).contains(&value) {
            return Err(schema_err(format!(
                "boundingBox.{name} = {value} outside 0-1000"
            )));
        }
    }
    if b.ymin >= b.ymax {
        return Err(schema_err(format!(
            "boundingBox ymin {} must be < ymax {}",
            b.ymin, b.ymax
        )));
    }
    if b.xmin >= b.xmax {
        return Err(schema_err(format!(
            "boundingBox xmin {} must be < xmax {}",
            b.xmin, b.xmax
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"[{"lineNumber":1,"latex":"2+2=4","isCorrect":true,"explanation":"","boundingBox":[0,0,100,500]}]"#;

    #[test]
    fn minimal_valid_array_preserved_exactly() {
        let results = parse_grading_response(MINIMAL).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.line_number, 1);
        assert_eq!(r.latex, "2+2=4");
        assert!(r.is_correct);
        assert_eq!(r.explanation, "");
        assert_eq!(<[i64; 4]>::from(r.bounding_box), [0, 0, 100, 500]);
    }

    #[test]
    fn fenced_response_parses_identically() {
        let fenced = format!("```json\n{MINIMAL}\n```");
        assert_eq!(
            parse_grading_response(&fenced).unwrap(),
            parse_grading_response(MINIMAL).unwrap()
        );
    }

    #[test]
    fn fence_without_language_tag() {
        let fenced = format!("```\n{MINIMAL}\n```");
        assert_eq!(parse_grading_response(&fenced).unwrap().len(), 1);
    }

    #[test]
    fn surrounding_whitespace_tolerated() {
        let padded = format!("\n\n  {MINIMAL}  \n");
        assert_eq!(parse_grading_response(&padded).unwrap().len(), 1);
    }

    #[test]
    fn empty_string_rejected() {
        assert!(matches!(parse_grading_response(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse_grading_response("```json\n```"),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn non_array_json_rejected() {
        let err = parse_grading_response(r#"{"results":[]}"#).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn missing_required_field_rejected() {
        // No boundingBox.
        let raw = r#"[{"lineNumber":1,"latex":"x","isCorrect":true,"explanation":""}]"#;
        let err = parse_grading_response(raw).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn prose_reply_rejected_not_crashed() {
        let err = parse_grading_response("I could not read the worksheet.").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn empty_array_is_a_valid_response() {
        assert!(parse_grading_response("[]").unwrap().is_empty());
    }

    #[test]
    fn inverted_box_rejected_by_validation() {
        let raw = r#"[{"lineNumber":1,"latex":"x","isCorrect":true,"explanation":"","boundingBox":[500,0,100,500]}]"#;
        let err = parse_grading_response(raw).unwrap_err();
        assert!(matches!(err, ParseError::Schema { index: 0, .. }), "{err}");
    }

    #[test]
    fn out_of_range_box_rejected_by_validation() {
        let raw = r#"[{"lineNumber":1,"latex":"x","isCorrect":true,"explanation":"","boundingBox":[0,0,1001,500]}]"#;
        assert!(matches!(
            parse_grading_response(raw).unwrap_err(),
            ParseError::Schema { .. }
        ));
    }

    #[test]
    fn zero_line_number_rejected_by_validation() {
        let raw = r#"[{"lineNumber":0,"latex":"x","isCorrect":true,"explanation":"","boundingBox":[0,0,100,500]}]"#;
        assert!(matches!(
            parse_grading_response(raw).unwrap_err(),
            ParseError::Schema { .. }
        ));
    }

    #[test]
    fn one_bad_element_fails_the_whole_response() {
        let raw = r#"[
            {"lineNumber":1,"latex":"a","isCorrect":true,"explanation":"","boundingBox":[0,0,100,500]},
            {"lineNumber":2,"latex":"b","isCorrect":true,"explanation":"","boundingBox":[100,600,200,400]}
        ]"#;
        assert!(matches!(
            parse_grading_response(raw).unwrap_err(),
            ParseError::Schema { index: 1, .. }
        ));
    }

    #[test]
    fn element_order_is_preserved_not_resorted() {
        // lineNumbers arrive out of order; the array order is canonical.
        let raw = r#"[
            {"lineNumber":2,"latex":"b","isCorrect":false,"explanation":"sign error","boundingBox":[200,0,300,900]},
            {"lineNumber":1,"latex":"a","isCorrect":true,"explanation":"","boundingBox":[0,0,100,900]}
        ]"#;
        let results = parse_grading_response(raw).unwrap();
        assert_eq!(results[0].line_number, 2);
        assert_eq!(results[1].line_number, 1);
    }
}
