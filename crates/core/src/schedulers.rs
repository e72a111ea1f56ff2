//! Scheduler registry
//!
//! Maps the user-facing scheduler names onto scheduler families. A new
//! scheduler is always built from the pipeline's current configuration, so
//! everything the checkpoint ships in `scheduler_config.json` carries over.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Error, Result};

/// Scheduler used when a request does not name one.
pub const DEFAULT_SCHEDULER: &str = "DPMSolverMultistep";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerFamily {
    Ddim,
    DpmSolverMultistep,
    HeunDiscrete,
    EulerAncestralDiscrete,
    EulerDiscrete,
    Pndm,
}

impl SchedulerFamily {
    /// Class name recorded in `_class_name` of a diffusers scheduler config
    pub fn class_name(&self) -> &'static str {
        match self {
            SchedulerFamily::Ddim => "DDIMScheduler",
            SchedulerFamily::DpmSolverMultistep => "DPMSolverMultistepScheduler",
            SchedulerFamily::HeunDiscrete => "HeunDiscreteScheduler",
            SchedulerFamily::EulerAncestralDiscrete => "EulerAncestralDiscreteScheduler",
            SchedulerFamily::EulerDiscrete => "EulerDiscreteScheduler",
            SchedulerFamily::Pndm => "PNDMScheduler",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaSchedule {
    Linear,
    ScaledLinear,
    SquaredcosCapV2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    Epsilon,
    VPrediction,
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestepSpacing {
    Linspace,
    Leading,
    Trailing,
}

/// Scheduler configuration as stored in a diffusers `scheduler_config.json`.
///
/// Keys without a typed field are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(rename = "_class_name", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default = "default_num_train_timesteps")]
    pub num_train_timesteps: usize,

    #[serde(default = "default_beta_start")]
    pub beta_start: f64,

    #[serde(default = "default_beta_end")]
    pub beta_end: f64,

    #[serde(default = "default_beta_schedule")]
    pub beta_schedule: BetaSchedule,

    #[serde(default = "default_prediction_type")]
    pub prediction_type: PredictionType,

    #[serde(default = "default_timestep_spacing")]
    pub timestep_spacing: TimestepSpacing,

    #[serde(default)]
    pub steps_offset: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_karras_sigmas: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_num_train_timesteps() -> usize {
    1000
}

fn default_beta_start() -> f64 {
    0.0001
}

fn default_beta_end() -> f64 {
    0.02
}

fn default_beta_schedule() -> BetaSchedule {
    BetaSchedule::Linear
}

fn default_prediction_type() -> PredictionType {
    PredictionType::Epsilon
}

fn default_timestep_spacing() -> TimestepSpacing {
    TimestepSpacing::Linspace
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            class_name: None,
            num_train_timesteps: default_num_train_timesteps(),
            beta_start: default_beta_start(),
            beta_end: default_beta_end(),
            beta_schedule: default_beta_schedule(),
            prediction_type: default_prediction_type(),
            timestep_spacing: default_timestep_spacing(),
            steps_offset: 0,
            use_karras_sigmas: None,
            extra: Map::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig =
            serde_json::from_str(content).context("Failed to parse scheduler config")?;
        Ok(config)
    }

    /// Read a `scheduler_config.json` from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scheduler config {:?}", path))?;
        Self::from_json_str(&content)
    }
}

/// Extra flags layered over the inherited configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub use_karras_sigmas: Option<bool>,
}

/// A configured scheduler, ready to be installed on a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheduler {
    pub family: SchedulerFamily,
    pub config: SchedulerConfig,
}

impl Scheduler {
    /// Build a scheduler of `family` from an existing configuration
    pub fn from_config(
        family: SchedulerFamily,
        config: &SchedulerConfig,
        options: &SchedulerOptions,
    ) -> Self {
        let mut config = config.clone();
        config.class_name = Some(family.class_name().to_string());
        if let Some(use_karras_sigmas) = options.use_karras_sigmas {
            config.use_karras_sigmas = Some(use_karras_sigmas);
        }
        Self { family, config }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerEntry {
    pub name: &'static str,
    pub family: SchedulerFamily,
    pub options: SchedulerOptions,
}

const fn entry(name: &'static str, family: SchedulerFamily) -> SchedulerEntry {
    SchedulerEntry {
        name,
        family,
        options: SchedulerOptions {
            use_karras_sigmas: None,
        },
    }
}

pub static SCHEDULERS: [SchedulerEntry; 7] = [
    entry("DDIM", SchedulerFamily::Ddim),
    entry("DPMSolverMultistep", SchedulerFamily::DpmSolverMultistep),
    entry("HeunDiscrete", SchedulerFamily::HeunDiscrete),
    SchedulerEntry {
        name: "KarrasDPM",
        family: SchedulerFamily::DpmSolverMultistep,
        options: SchedulerOptions {
            use_karras_sigmas: Some(true),
        },
    },
    entry("K_EULER_ANCESTRAL", SchedulerFamily::EulerAncestralDiscrete),
    entry("K_EULER", SchedulerFamily::EulerDiscrete),
    entry("PNDM", SchedulerFamily::Pndm),
];

pub fn find_scheduler(name: &str) -> Option<&'static SchedulerEntry> {
    SCHEDULERS.iter().find(|entry| entry.name == name)
}

pub fn scheduler_names() -> impl Iterator<Item = &'static str> {
    SCHEDULERS.iter().map(|entry| entry.name)
}

/// Build the named scheduler from the pipeline's current configuration
pub fn resolve_scheduler(name: &str, current_config: &SchedulerConfig) -> Result<Scheduler> {
    let entry = find_scheduler(name).ok_or_else(|| Error::UnknownScheduler(name.to_string()))?;
    let scheduler = Scheduler::from_config(entry.family, current_config, &entry.options);
    tracing::debug!(
        "Scheduler {} -> {}",
        name,
        scheduler.family.class_name()
    );
    Ok(scheduler)
}
