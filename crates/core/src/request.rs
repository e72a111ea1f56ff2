//! Generation request

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::models::{self, DEFAULT_MODEL};
use crate::schedulers::{self, DEFAULT_SCHEDULER};
use crate::styles::{self, NO_STYLE};

pub const NUM_OUTPUTS_RANGE: RangeInclusive<u32> = 1..=4;
pub const NUM_INFERENCE_STEPS_RANGE: RangeInclusive<u32> = 1..=100;
pub const GUIDANCE_SCALE_RANGE: RangeInclusive<f64> = 1.0..=50.0;

/// A single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default = "default_prompt")]
    pub prompt: String,

    #[serde(default)]
    pub negative_prompt: Option<String>,

    /// Preset checkpoint, ignored when `use_custom_model` is set
    #[serde(default = "default_model")]
    pub model_id: String,

    #[serde(default)]
    pub use_custom_model: bool,

    /// Hub repository used when `use_custom_model` is set
    #[serde(default = "default_model")]
    pub custom_model: String,

    #[serde(default = "default_model")]
    pub text_encoder_id: String,

    #[serde(default)]
    pub use_custom_text_encoder: bool,

    #[serde(default = "default_model")]
    pub custom_text_encoder: String,

    #[serde(default = "default_style")]
    pub style_name: String,

    #[serde(default = "default_size")]
    pub width: u32,

    #[serde(default = "default_size")]
    pub height: u32,

    #[serde(default = "default_num_outputs")]
    pub num_outputs: u32,

    #[serde(default = "default_scheduler")]
    pub scheduler_name: String,

    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u32,

    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,

    /// Leave empty to draw a random seed
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_prompt() -> String {
    "A cat doing karate in Madrid, cinematic, 8k UHD".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_style() -> String {
    NO_STYLE.to_string()
}

fn default_size() -> u32 {
    1024
}

fn default_num_outputs() -> u32 {
    1
}

fn default_scheduler() -> String {
    DEFAULT_SCHEDULER.to_string()
}

fn default_num_inference_steps() -> u32 {
    14
}

fn default_guidance_scale() -> f64 {
    4.5
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            negative_prompt: None,
            model_id: default_model(),
            use_custom_model: false,
            custom_model: default_model(),
            text_encoder_id: default_model(),
            use_custom_text_encoder: false,
            custom_text_encoder: default_model(),
            style_name: default_style(),
            width: default_size(),
            height: default_size(),
            num_outputs: default_num_outputs(),
            scheduler_name: default_scheduler(),
            num_inference_steps: default_num_inference_steps(),
            guidance_scale: default_guidance_scale(),
            seed: None,
        }
    }
}

impl GenerationRequest {
    /// Diffusion checkpoint to load
    pub fn effective_model_id(&self) -> &str {
        models::resolve_model_id(&self.model_id, self.use_custom_model, &self.custom_model)
    }

    /// Text encoder checkpoint to load
    pub fn effective_text_encoder_id(&self) -> &str {
        models::resolve_model_id(
            &self.text_encoder_id,
            self.use_custom_text_encoder,
            &self.custom_text_encoder,
        )
    }

    /// Check every field against the input surface before anything is loaded
    pub fn validate(&self) -> Result<()> {
        if !self.use_custom_model && !models::is_preset(&self.model_id) {
            return Err(Error::UnknownModel(self.model_id.clone()));
        }
        if !self.use_custom_text_encoder && !models::is_preset(&self.text_encoder_id) {
            return Err(Error::UnknownModel(self.text_encoder_id.clone()));
        }
        if self.use_custom_model && self.custom_model.trim().is_empty() {
            return Err(invalid("custom_model", "must not be empty".to_string()));
        }
        if self.use_custom_text_encoder && self.custom_text_encoder.trim().is_empty() {
            return Err(invalid("custom_text_encoder", "must not be empty".to_string()));
        }
        if styles::find_style(&self.style_name).is_none() {
            return Err(Error::UnknownStyle(self.style_name.clone()));
        }
        if schedulers::find_scheduler(&self.scheduler_name).is_none() {
            return Err(Error::UnknownScheduler(self.scheduler_name.clone()));
        }
        if self.width == 0 {
            return Err(invalid("width", "must be positive".to_string()));
        }
        if self.height == 0 {
            return Err(invalid("height", "must be positive".to_string()));
        }
        if !NUM_OUTPUTS_RANGE.contains(&self.num_outputs) {
            return Err(out_of_range("num_outputs", self.num_outputs, &NUM_OUTPUTS_RANGE));
        }
        if !NUM_INFERENCE_STEPS_RANGE.contains(&self.num_inference_steps) {
            return Err(out_of_range(
                "num_inference_steps",
                self.num_inference_steps,
                &NUM_INFERENCE_STEPS_RANGE,
            ));
        }
        if !GUIDANCE_SCALE_RANGE.contains(&self.guidance_scale) {
            return Err(out_of_range(
                "guidance_scale",
                self.guidance_scale,
                &GUIDANCE_SCALE_RANGE,
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> Error {
    Error::InvalidRequest { field, reason }
}

fn out_of_range<T: std::fmt::Display>(
    field: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Error {
    invalid(
        field,
        format!("{} is outside {}..={}", value, range.start(), range.end()),
    )
}
