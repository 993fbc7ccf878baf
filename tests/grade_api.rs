//! End-to-end tests for the grading API with a stubbed inference
//! boundary: request in, JSON verdicts out, no network anywhere.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine as _;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use tower::ServiceExt;

use inkgrade::api::{router, ApiContext};
use inkgrade::config::GraderConfig;
use inkgrade::grading::MockVisionClient;

const TWO_LINE_REPLY: &str = r#"[
    {"lineNumber":1,"latex":"2x + 3 = 11","isCorrect":true,"explanation":"","boundingBox":[80,60,170,940]},
    {"lineNumber":2,"latex":"x = 5","isCorrect":false,"explanation":"11 - 3 = 8, so x = 4.","boundingBox":[230,60,320,940]}
]"#;

fn app_with(mock: Arc<MockVisionClient>) -> axum::Router {
    router(ApiContext::new(mock, &GraderConfig::for_tests()))
}

/// A small worksheet-like PNG, wrapped as a data URL.
fn png_data_url() -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
        160,
        220,
        image::Rgb([250, 250, 245]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buf)
    )
}

fn grade_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/grade")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn grades_a_two_line_worksheet_in_model_order() {
    let mock = Arc::new(MockVisionClient::new(TWO_LINE_REPLY));
    let app = app_with(mock.clone());

    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": png_data_url() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["lineNumber"], 1);
    assert_eq!(results[0]["isCorrect"], true);
    assert_eq!(results[0]["explanation"], "");

    assert_eq!(results[1]["isCorrect"], false);
    assert!(
        !results[1]["explanation"].as_str().unwrap().is_empty(),
        "incorrect line must carry a correction"
    );
    assert_eq!(
        results[1]["boundingBox"],
        serde_json::json!([230, 60, 320, 940])
    );
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn non_image_upload_is_rejected_before_any_inference_call() {
    let mock = Arc::new(MockVisionClient::new(TWO_LINE_REPLY));
    let app = app_with(mock.clone());

    let pdf = base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.7 not an image");
    let response = app
        .oneshot(grade_request(serde_json::json!({
            "image": format!("data:application/pdf;base64,{pdf}")
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("valid image"));
    assert_eq!(mock.call_count(), 0, "rejected input must not reach the model");
}

#[tokio::test]
async fn missing_image_field_is_a_400() {
    let app = app_with(Arc::new(MockVisionClient::new(TWO_LINE_REPLY)));
    let response = app
        .oneshot(grade_request(serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No image provided.");
}

#[tokio::test]
async fn blank_image_string_is_a_400() {
    let app = app_with(Arc::new(MockVisionClient::new(TWO_LINE_REPLY)));
    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_base64_payload_is_a_400() {
    let app = app_with(Arc::new(MockVisionClient::new(TWO_LINE_REPLY)));
    let response = app
        .oneshot(grade_request(serde_json::json!({
            "image": "data:image/png;base64,@@not-base64@@"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unparseable_model_output_is_a_500_with_generic_message() {
    let raw_reply = "Sure! Line one looks correct to me, line two is wrong.";
    let app = app_with(Arc::new(MockVisionClient::new(raw_reply)));

    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": png_data_url() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("try again"));
    assert!(
        !message.contains("Line one"),
        "raw model output must never reach the client"
    );
}

#[tokio::test]
async fn schema_violating_model_output_is_a_500() {
    // Inverted bounding box: parses as JSON but fails validation.
    let reply = r#"[{"lineNumber":1,"latex":"x","isCorrect":true,"explanation":"","boundingBox":[500,0,100,900]}]"#;
    let app = app_with(Arc::new(MockVisionClient::new(reply)));

    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": png_data_url() })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn fenced_model_output_still_grades() {
    let fenced = format!("```json\n{TWO_LINE_REPLY}\n```");
    let app = app_with(Arc::new(MockVisionClient::new(&fenced)));

    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": png_data_url() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn inference_failure_surfaces_boundary_message_as_500() {
    let app = app_with(Arc::new(MockVisionClient::failing(
        429,
        "Resource has been exhausted",
    )));

    let response = app
        .oneshot(grade_request(serde_json::json!({ "image": png_data_url() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Resource has been exhausted"
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with(Arc::new(MockVisionClient::new("[]")));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
