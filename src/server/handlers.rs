//! Request handlers

use super::{body::read_body, error::ErrorBody, AppState};
use crate::error::SplicerError;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use tracing::{error, info, instrument};

/// Embedded upload UI
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `POST /api/remove-background`
///
/// Buffers the whole body (bounded by the configured limit) and hands it to the
/// deployment's remover. Every failure is logged and answered with JSON.
#[instrument(skip_all, fields(remover = state.remover.name()))]
pub async fn remove_background(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, SplicerError> {
    let start = instant::Instant::now();
    let result = async {
        if declared_length(&req).is_some_and(|length| length > state.max_body_bytes) {
            return Err(SplicerError::PayloadTooLarge {
                limit: state.max_body_bytes,
            });
        }
        let body = read_body(payload, state.max_body_bytes).await?;
        state.remover.remove_background(body).await
    }
    .await;

    match result {
        Ok(png) => {
            info!(
                bytes = png.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Background removed"
            );
            Ok(HttpResponse::Ok().content_type("image/png").body(png))
        },
        Err(err) => {
            error!(category = err.category(), error = %err, "Error removing background");
            Err(err)
        },
    }
}

fn declared_length(req: &HttpRequest) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Any method other than `POST` on the removal route
pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "POST"))
        .json(ErrorBody::message("Method Not Allowed"))
}

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}
