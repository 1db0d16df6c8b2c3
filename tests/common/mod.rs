//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use photo_splicer::{BackgroundRemover, ImageIOService, Result, SplicerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Opaque single-color PNG
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    Bytes::from(ImageIOService::encode_png(&image).unwrap())
}

/// 10x10 opaque red PNG
pub fn red_png() -> Bytes {
    solid_png(10, 10, [255, 0, 0, 255])
}

/// PNG whose left half is transparent and right half opaque green
pub fn half_transparent_png() -> Bytes {
    let image = RgbaImage::from_fn(32, 16, |x, _| {
        if x < 16 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 255, 0, 255])
        }
    });
    Bytes::from(ImageIOService::encode_png(&image).unwrap())
}

/// Remover that answers with a fixed PNG, or a fixed failure, and counts calls
#[derive(Clone)]
pub struct StubRemover {
    calls: Arc<AtomicUsize>,
    failure: Option<fn() -> SplicerError>,
    output: Bytes,
}

impl StubRemover {
    pub fn succeeding(output: Bytes) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failure: None,
            output,
        }
    }

    pub fn failing(failure: fn() -> SplicerError) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failure: Some(failure),
            output: Bytes::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for StubRemover {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn remove_background(&self, _image: Bytes) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(self.output.clone()),
        }
    }
}

/// A request captured by [`StubUpstream`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_contains(&self, needle: &str) -> bool {
        self.body
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }
}

/// Local HTTP server answering every request with a canned status and body
pub struct StubUpstream {
    pub base_url: String,
    requests: Arc<std::sync::Mutex<Vec<RecordedRequest>>>,
    handle: actix_web::dev::ServerHandle,
}

impl StubUpstream {
    /// Must be called from within an actix system, e.g. `#[actix_web::test]`
    pub fn start(status: actix_web::http::StatusCode, body: Bytes) -> Self {
        use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

        let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        let server = HttpServer::new(move || {
            let recorded = Arc::clone(&recorded);
            let body = body.clone();
            App::new().default_service(web::to(move |req: HttpRequest, payload: web::Bytes| {
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                async move {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string)
                    };
                    recorded.lock().unwrap().push(RecordedRequest {
                        path: req.path().to_string(),
                        api_key: header("x-api-key"),
                        content_type: header("content-type"),
                        body: payload.to_vec(),
                    });
                    HttpResponse::build(status).body(body)
                }
            }))
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: format!("http://{}", address),
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// URL on a port nothing is listening on
pub fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", address, path)
}
