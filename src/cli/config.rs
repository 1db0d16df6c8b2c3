//! Conversion of CLI arguments into a service configuration

use crate::cli::main_impl::{BackendArgs, ServeArgs};
use crate::config::{ServiceConfig, ServiceConfigBuilder};
use anyhow::{Context, Result};

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Builder pre-populated with the removal strategy options
    pub(crate) fn from_backend_args(args: &BackendArgs) -> ServiceConfigBuilder {
        let mut builder = ServiceConfig::builder()
            .backend(args.backend)
            .remote_endpoint(args.remote_endpoint.clone())
            .remote_timeout_secs(args.remote_timeout)
            .model_url(args.model_url.clone())
            .allow_local_models(!args.disallow_local_models)
            .use_cache(!args.no_cache)
            .input_mode(args.input_mode)
            .execution_provider(args.execution_provider)
            .intra_threads(args.threads)
            .target_size(args.target_size);

        if let Some(key) = &args.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(path) = &args.model_path {
            builder = builder.model_path(path.clone());
        }
        if let Some(dir) = &args.cache_dir {
            builder = builder.cache_dir(dir.clone());
        }
        if let Some(dir) = &args.temp_dir {
            builder = builder.temp_dir(dir.clone());
        }
        builder
    }

    /// Full service configuration for `serve`
    pub(crate) fn from_serve_args(args: &ServeArgs) -> Result<ServiceConfig> {
        Self::from_backend_args(&args.backend)
            .host(args.host.clone())
            .port(args.port)
            .workers(args.workers)
            .max_body_bytes(args.max_body_bytes)
            .eager_init(args.eager_init)
            .build()
            .context("Invalid serve options")
    }
}
