//! pixstyle_runtime_diffusion - Text-to-image predictor
//!
//! This crate plumbs a [`GenerationRequest`] through a [`Backend`]: it picks
//! the checkpoints, swaps in the requested scheduler, applies the style,
//! seeds the generator and writes the resulting images to disk.

mod output;

use anyhow::{Context, Result};
use candle_core::Device;
use pixstyle_core::{apply_style, resolve_scheduler, resolve_seed, Config, GenerationRequest};
use pixstyle_runtime_api::{
    precision_dtype, select_best_device, Backend, DiffusionPipeline, EncoderOptions, Generator,
    OutputType, PipelineCall, PipelineOptions,
};
use std::path::PathBuf;

pub use output::save_images;

/// Runs one request at a time against a backend.
///
/// Every call loads its own text encoder and pipeline; nothing carries over
/// between requests except what the backend caches internally.
pub struct Predictor<B: Backend> {
    backend: B,
    config: Config,
    device: Device,
}

impl<B: Backend> Predictor<B> {
    /// Create a predictor on the device selected by `config`
    pub fn new(backend: B, config: Config) -> Result<Self> {
        let device =
            select_best_device(config.device.device_map()).context("failed to set up device")?;
        tracing::info!("Device: {:?}", device);
        Ok(Self::with_device(backend, config, device))
    }

    pub fn with_device(backend: B, config: Config, device: Device) -> Self {
        Self {
            backend,
            config,
            device,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a single prediction and return the saved image paths.
    ///
    /// Either all `num_outputs` images are written or the call fails.
    pub fn predict(&self, request: GenerationRequest) -> Result<Vec<PathBuf>> {
        request.validate()?;

        let model_id = request.effective_model_id();
        let text_encoder_id = request.effective_text_encoder_id();
        tracing::info!(
            "Loading pipeline {} with text encoder {}",
            model_id,
            text_encoder_id
        );

        let encoder_options = EncoderOptions::from_config(&self.config.precision);
        let text_encoder = self
            .backend
            .load_text_encoder(text_encoder_id, &encoder_options)?;

        let pipeline_options = PipelineOptions::new(
            precision_dtype(self.config.precision.dtype),
            self.device.clone(),
        );
        let mut pipeline = self
            .backend
            .load_pipeline(model_id, text_encoder, &pipeline_options)?;

        let scheduler = resolve_scheduler(&request.scheduler_name, pipeline.scheduler_config())?;
        pipeline.set_scheduler(scheduler);

        let styled = apply_style(
            &request.style_name,
            &request.prompt,
            request.negative_prompt.as_deref(),
        )?;
        tracing::info!(
            "Prompt: {} Negative Prompt: {:?}",
            styled.prompt,
            styled.negative_prompt
        );

        let seed = resolve_seed(request.seed)?;
        let mut generator = Generator::manual_seed(&self.device, seed)?;

        let call = PipelineCall {
            prompt: &styled.prompt,
            negative_prompt: styled.negative_prompt.as_deref(),
            width: request.width,
            height: request.height,
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
            num_images_per_prompt: request.num_outputs,
            output_type: OutputType::Image,
        };
        let images = pipeline.generate(&call, &mut generator)?;

        if images.len() != request.num_outputs as usize {
            anyhow::bail!(
                "Pipeline returned {} images, expected {}",
                images.len(),
                request.num_outputs
            );
        }

        save_images(&images, &self.config)
    }
}
