use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where generated images are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Accelerator selection
    #[serde(default)]
    pub device: DeviceConfig,

    /// Numeric precision of the loaded weights
    #[serde(default)]
    pub precision: PrecisionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for output images (default: system temp dir)
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name prefix, images are named `<prefix>-<index>.png`
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Run on CPU even when a GPU is available
    #[serde(default)]
    pub cpu: bool,

    /// GPU ordinal
    #[serde(default)]
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionConfig {
    /// Pipeline weight precision
    #[serde(default = "default_dtype")]
    pub dtype: Precision,

    /// Load the text encoder with 8-bit quantization
    #[serde(default = "default_text_encoder_8bit")]
    pub text_encoder_8bit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    F16,
    Bf16,
    F32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Ordinal(usize),
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Ordinal(0)
    }
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_prefix() -> String {
    "out".to_string()
}

fn default_dtype() -> Precision {
    Precision::F16
}

fn default_text_encoder_8bit() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            prefix: default_prefix(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            cpu: false,
            ordinal: 0,
        }
    }
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            dtype: default_dtype(),
            text_encoder_8bit: default_text_encoder_8bit(),
        }
    }
}

impl DeviceConfig {
    pub fn device_map(&self) -> DeviceMap {
        if self.cpu {
            DeviceMap::ForceCpu
        } else {
            DeviceMap::Ordinal(self.ordinal)
        }
    }
}

impl Config {
    /// Get the base directory: ~/.config/pixstyle/
    pub fn base_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("USERPROFILE").map(PathBuf::from))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".config").join("pixstyle"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, falling back to defaults when it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the config file path: ~/.config/pixstyle/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Path of the `index`-th output image
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.output
            .dir
            .join(format!("{}-{}.png", self.output.prefix, index))
    }
}
