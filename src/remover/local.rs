//! Local segmentation model

use super::BackgroundRemover;
use crate::{
    config::{InputMode, LocalModelConfig},
    error::{Result, SplicerError},
    pipeline::SegmentationPipeline,
    services::{ImageIOService, TempUpload},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Removes backgrounds with the shared [`SegmentationPipeline`]
#[derive(Debug, Clone)]
pub struct LocalModelRemover {
    pipeline: Arc<SegmentationPipeline>,
    input_mode: InputMode,
    temp_dir: PathBuf,
}

impl LocalModelRemover {
    #[must_use]
    pub fn new(pipeline: Arc<SegmentationPipeline>, config: &LocalModelConfig) -> Self {
        Self {
            pipeline,
            input_mode: config.input_mode,
            temp_dir: config.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<SegmentationPipeline> {
        &self.pipeline
    }
}

#[async_trait]
impl BackgroundRemover for LocalModelRemover {
    fn name(&self) -> &'static str {
        "local-model"
    }

    #[instrument(skip_all, fields(bytes = image.len(), mode = %self.input_mode))]
    async fn remove_background(&self, image: Bytes) -> Result<Bytes> {
        // Held until the pipeline is done with the image; removed on every exit path
        let mut upload: Option<TempUpload> = None;

        let decoded = match self.input_mode {
            InputMode::Memory => ImageIOService::load_from_bytes(&image)?,
            InputMode::TempFile => {
                let temp = upload.insert(TempUpload::create(&self.temp_dir, &image).await?);
                ImageIOService::load_image(temp.path()).await?
            },
        };

        let cutout = self.pipeline.cut_out(decoded).await;
        drop(upload);
        let cutout = cutout?;

        let png = tokio::task::spawn_blocking(move || ImageIOService::encode_png(&cutout))
            .await
            .map_err(|e| SplicerError::internal(format!("PNG encoding task panicked: {e}")))??;

        info!(result_bytes = png.len(), "Local background removal succeeded");
        Ok(Bytes::from(png))
    }

    async fn warm_up(&self) -> Result<()> {
        self.pipeline.initialize().await
    }
}
