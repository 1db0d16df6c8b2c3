//! HTTP service: upload UI and the background removal endpoint

pub mod body;
pub mod error;
pub mod handlers;

pub use self::error::ErrorBody;

use crate::{
    config::ServiceConfig,
    error::{Result, SplicerError},
    remover::{build_remover, BackgroundRemover},
};
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

/// Route of the removal endpoint
pub const REMOVE_BACKGROUND_PATH: &str = "/api/remove-background";

/// Per-process state shared by all workers
#[derive(Clone)]
pub struct AppState {
    pub remover: Arc<dyn BackgroundRemover>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(remover: Arc<dyn BackgroundRemover>, max_body_bytes: usize) -> Self {
        Self {
            remover,
            max_body_bytes,
        }
    }
}

/// Register all routes
///
/// Expects an `AppState` in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(REMOVE_BACKGROUND_PATH)
            .route(web::post().to(handlers::remove_background))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .route("/", web::get().to(handlers::index))
    .route("/health", web::get().to(handlers::health));
}

/// Build the configured remover and serve until shutdown
///
/// # Errors
/// - Invalid configuration
/// - Eager pipeline initialization failures
/// - Failed to bind the listen address
pub async fn run(config: ServiceConfig) -> Result<()> {
    config.validate()?;

    let remover = build_remover(&config)?;
    if config.local.eager_init {
        log::info!("Warming up {} remover", remover.name());
        remover.warm_up().await?;
    }

    let state = web::Data::new(AppState::new(remover, config.max_body_bytes));
    let address = config.bind_address();

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    });
    if config.workers > 0 {
        server = server.workers(config.workers);
    }

    let server = server
        .bind(&address)
        .map_err(|e| SplicerError::file_io_error("bind", &address, &e))?;

    log::info!(
        "Photo Splicer listening on http://{} ({} backend)",
        address,
        config.backend
    );
    server.run().await?;
    Ok(())
}
