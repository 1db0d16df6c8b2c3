//! HTTP contract of the removal endpoint and the static routes

mod common;

use actix_web::{
    http::{header, Method, StatusCode},
    test, web, App,
};
use common::{red_png, StubRemover};
use photo_splicer::{
    server::{configure, AppState, ErrorBody, REMOVE_BACKGROUND_PATH},
    SplicerError,
};
use std::sync::Arc;

const LIMIT: usize = 64 * 1024;

macro_rules! init_app {
    ($remover:expr, $limit:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(
                    Arc::new($remover.clone()),
                    $limit,
                )))
                .configure(configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_non_post_methods_are_rejected_without_calling_remover() {
    let remover = StubRemover::succeeding(red_png());
    let app = init_app!(remover, LIMIT);

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        let req = test::TestRequest::default()
            .method(method.clone())
            .uri(REMOVE_BACKGROUND_PATH)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(resp.headers().get(header::ALLOW).unwrap(), "POST");
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.message, "Method Not Allowed");
        assert!(body.error.is_none());
    }

    assert_eq!(remover.calls(), 0);
}

#[actix_web::test]
async fn test_post_returns_png_from_remover() {
    let output = common::half_transparent_png();
    let remover = StubRemover::succeeding(output.clone());
    let app = init_app!(remover, LIMIT);

    let req = test::TestRequest::post()
        .uri(REMOVE_BACKGROUND_PATH)
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .set_payload(red_png())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    let body = test::read_body(resp).await;
    assert_eq!(body, output);
    assert_eq!(remover.calls(), 1);
}

#[actix_web::test]
async fn test_repeated_uploads_are_independent() {
    let remover = StubRemover::succeeding(common::half_transparent_png());
    let app = init_app!(remover, LIMIT);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(REMOVE_BACKGROUND_PATH)
            .set_payload(red_png())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        bodies.push(test::read_body(resp).await);
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(remover.calls(), 2);
}

#[actix_web::test]
async fn test_oversized_body_is_rejected() {
    let remover = StubRemover::succeeding(red_png());
    let app = init_app!(remover, 16);

    let req = test::TestRequest::post()
        .uri(REMOVE_BACKGROUND_PATH)
        .set_payload(vec![0_u8; 100])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error.as_deref(), Some("payload_too_large"));
    assert_eq!(remover.calls(), 0);
}

#[actix_web::test]
async fn test_upstream_failure_maps_to_500_json() {
    let remover = StubRemover::failing(|| SplicerError::upstream(402, "Payment Required"));
    let app = init_app!(remover, LIMIT);

    let req = test::TestRequest::post()
        .uri(REMOVE_BACKGROUND_PATH)
        .set_payload(red_png())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.message, "Remove.bg API Error: Payment Required");
    assert_eq!(body.error.as_deref(), Some("upstream"));
}

#[actix_web::test]
async fn test_missing_api_key_maps_to_500_json() {
    let remover = StubRemover::failing(|| {
        SplicerError::invalid_config("Server configuration error: Missing API Key")
    });
    let app = init_app!(remover, LIMIT);

    let req = test::TestRequest::post()
        .uri(REMOVE_BACKGROUND_PATH)
        .set_payload(red_png())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert!(body.message.contains("Missing API Key"));
    assert_eq!(body.error.as_deref(), Some("configuration"));
}

#[actix_web::test]
async fn test_index_serves_upload_ui() {
    let app = init_app!(StubRemover::succeeding(red_png()), LIMIT);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("Photo Splicer"));
    assert!(html.contains(REMOVE_BACKGROUND_PATH));
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!(StubRemover::succeeding(red_png()), LIMIT);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "OK");
}
