mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{encoded_image, BagOfWordsEmbedder, FailingCaptioner, StubCaptioner};
use http_body_util::BodyExt;
use image::ImageFormat;
use stylematch::server::{build_router, AppState};
use stylematch::{Captioner, Catalog, Params, Ranker, StyleMatcher};
use tower::ServiceExt;

const BOUNDARY: &str = "stylematch-test-boundary";
const MAX_UPLOAD: usize = 1024 * 1024;

fn app(captioner: impl Captioner + 'static) -> axum::Router {
    let ranker = Ranker::new(
        Arc::new(BagOfWordsEmbedder),
        Arc::new(Catalog::builtin()),
        Params::default(),
    )
    .unwrap();
    let matcher = Arc::new(StyleMatcher::new(Arc::new(captioner), ranker));
    build_router(AppState::new(matcher).unwrap(), MAX_UPLOAD)
}

fn multipart(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn serves_upload_form() {
    let res = app(FailingCaptioner)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(html.contains("accept=\"image/jpeg,image/png\""));
}

#[tokio::test]
async fn health_check() {
    let res = app(FailingCaptioner)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "ok");
}

#[tokio::test]
async fn upload_renders_ranked_matches() {
    let app = app(StubCaptioner(
        "Yellow sundress with floral print and wedge heels.".into(),
    ));
    let png = encoded_image(ImageFormat::Png);
    let res = app
        .oneshot(multipart("image", "look.png", "image/png", &png))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Detected Fashion Description"));
    assert!(html.contains("<strong>outfit_4</strong> - Match Score: <code>1.00</code>"));
    assert!(html.contains("src=\"data:image/png;base64,"));
    assert_eq!(html.matches("class=\"match\"").count(), 3);
}

#[tokio::test]
async fn non_image_upload_is_rejected_inline() {
    let res = app(StubCaptioner("unused".into()))
        .oneshot(multipart("image", "notes.txt", "text/plain", b"hello there"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let html = body_text(res).await;
    assert!(html.contains("INVALID_INPUT"));
    assert!(!html.contains("Similar Outfits"));
}

#[tokio::test]
async fn missing_field_is_rejected() {
    let png = encoded_image(ImageFormat::Png);
    let res = app(StubCaptioner("unused".into()))
        .oneshot(multipart("photo", "look.png", "image/png", &png))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("no image was uploaded"));
}

#[tokio::test]
async fn caption_failure_shows_error_with_preview() {
    let jpeg = encoded_image(ImageFormat::Jpeg);
    let res = app(FailingCaptioner)
        .oneshot(multipart("image", "look.jpg", "image/jpeg", &jpeg))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(res).await;
    assert!(html.contains("MODEL_INFERENCE_FAILURE"));
    assert!(html.contains("src=\"data:image/jpeg;base64,"));
    assert!(!html.contains("Detected Fashion Description"));
}
