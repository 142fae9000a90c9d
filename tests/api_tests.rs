#![cfg(feature = "api")]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use scene_script_service::api::{router, AppState};
use scene_script_service::config::ScriptConfig;
use scene_script_service::llm::providers::MockLLMProvider;
use scene_script_service::ScriptRequestor;

const SCRIPT: &str = "\
Scene 1
7) image_prompt：
陽光灑進書房，木質書桌

Scene 2
7) image_prompt：
夜晚的城市天際線
";

fn app(mock: MockLLMProvider) -> Router {
    let requestor = ScriptRequestor::new(Arc::new(mock), &ScriptConfig::default());
    router(AppState::new(requestor))
}

fn script_request() -> Value {
    json!({
        "brand": "小書房",
        "topic": "開學季閱讀推廣",
        "video_type": "品牌故事",
        "platform": "YouTube Shorts",
        "aspect_ratio": "9:16",
        "visual_style": "柔和暖色",
        "scene_count": 2
    })
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(MockLLMProvider::with_content(SCRIPT)), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["template"], "v2");
    assert_eq!(body["response_mode"], "text");
}

#[tokio::test]
async fn test_generate_script() {
    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/generate-script",
        script_request(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], SCRIPT.trim());
    assert!(body.get("scenes").is_none());
}

#[tokio::test]
async fn test_generate_script_missing_field() {
    let mut request = script_request();
    request.as_object_mut().unwrap().remove("topic");

    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/generate-script",
        request,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_generate_script_scene_count_out_of_range() {
    let mut request = script_request();
    request["scene_count"] = json!(1);

    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/generate-script",
        request,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_generate_script_upstream_failure() {
    let (status, body) = post_json(
        app(MockLLMProvider::failing("connection reset")),
        "/generate-script",
        script_request(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "upstream_error");
    assert!(body["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_generate_script_empty_generation() {
    let (status, body) = post_json(
        app(MockLLMProvider::with_content("")),
        "/generate-script",
        script_request(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "empty_generation");
}

#[tokio::test]
async fn test_extract_scene_prompts() {
    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/extract-scene-prompts",
        json!({ "text": SCRIPT }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "prompts": [
                { "scene_no": 1, "prompt": "陽光灑進書房，木質書桌" },
                { "scene_no": 2, "prompt": "夜晚的城市天際線" }
            ]
        })
    );
}

#[tokio::test]
async fn test_extract_scene_prompts_none_found() {
    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/extract-scene-prompts",
        json!({ "text": "這段文字沒有任何場景" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "no_prompts_found");
}

#[tokio::test]
async fn test_extract_scene_prompts_bad_body() {
    let (status, body) = post_json(
        app(MockLLMProvider::with_content(SCRIPT)),
        "/extract-scene-prompts",
        json!({ "script": 42 }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}
