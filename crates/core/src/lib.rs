//! pixstyle_core - Core library for the pixstyle predictor
//!
//! This crate provides:
//! - The style catalog and prompt templating
//! - The scheduler registry and scheduler configuration model
//! - Seed resolution
//! - The generation request model, model presets and configuration

pub mod config;
pub mod error;
pub mod models;
pub mod request;
pub mod schedulers;
pub mod seed;
pub mod styles;

pub use config::{Config, DeviceMap, Precision};
pub use error::{Error, Result};
pub use request::GenerationRequest;
pub use schedulers::{resolve_scheduler, Scheduler, SchedulerConfig, SchedulerFamily};
pub use seed::resolve_seed;
pub use styles::{apply_style, StyledPrompt};
