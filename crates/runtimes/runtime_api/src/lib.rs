//! pixstyle_runtime_api - Contracts for the external generative pipeline
//!
//! The predictor never touches weights or tensors itself. A backend loads a
//! text encoder and a diffusion pipeline by identifier, and the pipeline turns
//! a prompt pair into images. This crate defines that contract.

mod device;
mod generator;

use anyhow::Result;
use candle_core::{DType, Device};
use image::DynamicImage;
use pixstyle_core::config::PrecisionConfig;
use pixstyle_core::{Scheduler, SchedulerConfig};

pub use device::{precision_dtype, select_best_device};
pub use generator::Generator;

/// Weight quantization applied when loading the text encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantization {
    None,
    Int8,
}

/// Options for loading a text encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// Subfolder of the checkpoint repository holding the encoder weights
    pub subfolder: String,
    pub quantization: Quantization,
    /// Let the loader place layers across the available devices
    pub auto_device_map: bool,
}

impl EncoderOptions {
    pub fn from_config(precision: &PrecisionConfig) -> Self {
        Self {
            subfolder: "text_encoder".to_string(),
            quantization: if precision.text_encoder_8bit {
                Quantization::Int8
            } else {
                Quantization::None
            },
            auto_device_map: true,
        }
    }
}

/// Options for loading a diffusion pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub dtype: DType,
    pub use_safetensors: bool,
    /// Swap the text encoder's attention for the fused fast path after loading
    pub optimize_text_encoder: bool,
    /// Device the pipeline is moved to after loading
    pub device: Device,
}

impl PipelineOptions {
    pub fn new(dtype: DType, device: Device) -> Self {
        Self {
            dtype,
            use_safetensors: true,
            optimize_text_encoder: true,
            device,
        }
    }
}

/// Form in which the pipeline returns its outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Decoded RGB images
    #[default]
    Image,
}

/// Arguments of one pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCall<'a> {
    pub prompt: &'a str,
    pub negative_prompt: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub num_images_per_prompt: u32,
    pub output_type: OutputType,
}

/// A loaded text-to-image pipeline
pub trait DiffusionPipeline {
    /// Configuration of the scheduler currently installed
    fn scheduler_config(&self) -> &SchedulerConfig;

    /// Replace the installed scheduler
    fn set_scheduler(&mut self, scheduler: Scheduler);

    /// Run the pipeline.
    ///
    /// Must return `num_images_per_prompt` images whose content and order are
    /// fully determined by the generator's seed and the call arguments.
    fn generate(
        &mut self,
        call: &PipelineCall<'_>,
        generator: &mut Generator,
    ) -> Result<Vec<DynamicImage>>;
}

/// Loader for the pretrained components
pub trait Backend {
    type TextEncoder;
    type Pipeline: DiffusionPipeline;

    /// Load a text encoder by hub identifier
    fn load_text_encoder(&self, id: &str, options: &EncoderOptions) -> Result<Self::TextEncoder>;

    /// Load a pipeline by hub identifier around an already loaded text encoder
    fn load_pipeline(
        &self,
        model_id: &str,
        text_encoder: Self::TextEncoder,
        options: &PipelineOptions,
    ) -> Result<Self::Pipeline>;
}
