//! Configuration file for the CLI.
//!
//! Looked up at `--config` or `<config dir>/vramcheck/config.yaml`. A
//! missing file is not an error; defaults apply.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use vramcheck::{GpuCatalog, Quantization};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Extra catalog file merged over the built-in GPUs.
    pub catalog_path: Option<PathBuf>,

    /// Use only `catalog_path`, dropping the built-in GPUs.
    pub replace_builtin_catalog: bool,

    /// Defaults for flags not given on the command line.
    pub defaults: RequestDefaults,

    /// Configuration source path
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Request defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub quantization: Quantization,
    pub context_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            catalog_path: None,
            replace_builtin_catalog: false,
            defaults: RequestDefaults::default(),
            source: None,
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            quantization: Quantization::FP16,
            context_tokens: 4096,
        }
    }
}

impl AppConfig {
    /// Load configuration from file or create default
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let mut config = Self::default();
            config.source = Some(config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Default config location, if the platform has a config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vramcheck").join("config.yaml"))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Build the GPU catalog. `override_path` (from `--catalog`) takes
    /// precedence over `catalog_path`.
    pub fn build_catalog(&self, override_path: Option<&Path>) -> Result<GpuCatalog> {
        let path = override_path.or(self.catalog_path.as_deref());

        let Some(path) = path else {
            return Ok(GpuCatalog::builtin());
        };

        let custom = GpuCatalog::from_path(path)
            .with_context(|| format!("Failed to load GPU catalog: {}", path.display()))?;

        if self.replace_builtin_catalog {
            debug!(gpus = custom.len(), "using custom catalog only");
            return Ok(custom);
        }

        let mut catalog = GpuCatalog::builtin();
        catalog.extend(custom);
        debug!(gpus = catalog.len(), "merged custom catalog over built-in");
        Ok(catalog)
    }
}
