//! Model download and caching against a local file server

mod common;

use actix_web::http::StatusCode;
use bytes::Bytes;
use common::StubUpstream;
use photo_splicer::{LocalModelConfig, ModelCache, ModelDownloader, ModelLoader};
use tempfile::TempDir;

const MODEL_BYTES: &[u8] = b"not really onnx, but the loader does not care";

#[actix_web::test]
async fn test_download_lands_in_cache_once() {
    let upstream = StubUpstream::start(StatusCode::OK, Bytes::from_static(MODEL_BYTES));
    let dir = TempDir::new().unwrap();
    let cache = ModelCache::with_custom_cache_dir(dir.path()).unwrap();
    let downloader = ModelDownloader::new().unwrap();
    let url = upstream.url("/models/segmenter.onnx");

    let path = downloader.download_to_cache(&url, &cache).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), MODEL_BYTES);
    assert!(cache.is_model_cached(&ModelCache::url_to_model_id(&url)));

    // Served from the cache the second time
    let again = downloader.download_to_cache(&url, &cache).await.unwrap();
    assert_eq!(again, path);
    assert_eq!(upstream.requests().len(), 1);

    // Only the model file, no leftover temp files
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    upstream.stop().await;
}

#[actix_web::test]
async fn test_failed_download_leaves_cache_empty() {
    let upstream = StubUpstream::start(StatusCode::NOT_FOUND, Bytes::from_static(b"missing"));
    let dir = TempDir::new().unwrap();
    let cache = ModelCache::with_custom_cache_dir(dir.path()).unwrap();

    let err = ModelDownloader::new()
        .unwrap()
        .download_to_cache(&upstream.url("/models/missing.onnx"), &cache)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "model");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    upstream.stop().await;
}

#[actix_web::test]
async fn test_loader_without_cache_fetches_into_memory() {
    let upstream = StubUpstream::start(StatusCode::OK, Bytes::from_static(MODEL_BYTES));
    let dir = TempDir::new().unwrap();

    let config = LocalModelConfig {
        model_url: upstream.url("/models/segmenter.onnx"),
        use_cache: false,
        cache_dir: Some(dir.path().to_path_buf()),
        ..LocalModelConfig::default()
    };
    let bytes = ModelLoader::from_config(&config).unwrap().load().await.unwrap();

    assert_eq!(bytes, MODEL_BYTES);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    upstream.stop().await;
}

#[actix_web::test]
async fn test_loader_reads_local_model_file() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("custom.onnx");
    std::fs::write(&model, MODEL_BYTES).unwrap();

    let config = LocalModelConfig {
        model_path: Some(model),
        ..LocalModelConfig::default()
    };
    let bytes = ModelLoader::from_config(&config).unwrap().load().await.unwrap();
    assert_eq!(bytes, MODEL_BYTES);
}
