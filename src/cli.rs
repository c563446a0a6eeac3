//! Command-line interface for the GPU fit estimator.
//!
//! Parameters are organized into categories:
//!
//! ## Model
//! - `--params`: Model size in billions of parameters
//! - `--quant`: Weight precision in bits (32/16/8/4)
//! - `--context`: Context window in tokens
//!
//! ## Hardware
//! - `--gpu`: One GPU slot as `KEY[:COUNT]`; repeat for mixed setups
//! - `--catalog`: Extra GPU catalog file (YAML or JSON)
//!
//! ## Modes
//! - `--recommend`: Highest precision and longest context that fit
//! - `--sweep`: Quantization x context grid (CSV output)
//! - `--list-gpus`: Print the catalog in picker order
//!
//! Flags left unset fall back to the config file defaults.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Parser;

use vramcheck::{GpuSlot, ModelRequest, Quantization, CONTEXT_PRESETS};

use crate::config::RequestDefaults;

#[derive(Parser, Debug)]
#[command(name = "vramcheck")]
#[command(author, version, about = "Estimate whether an LLM fits your GPUs, and how fast and hungry it will be")]
pub struct Cli {
    // =========================================================================
    // Model
    // =========================================================================

    /// Model size in billions of parameters (e.g. 7, 13, 70)
    #[arg(long, help_heading = "Model")]
    pub params: Option<f64>,

    /// Weight precision in bits: 32, 16, 8 or 4
    /// [HIGH IMPACT: scales weights and KV-cache linearly]
    #[arg(long, help_heading = "Model")]
    pub quant: Option<u32>,

    /// Context window in tokens
    #[arg(long, help_heading = "Model")]
    pub context: Option<u32>,

    // =========================================================================
    // Hardware
    // =========================================================================

    /// GPU slot as KEY[:COUNT], e.g. rtx3090:2 (repeat for mixed setups)
    #[arg(long = "gpu", value_name = "KEY[:COUNT]", help_heading = "Hardware")]
    pub gpus: Vec<String>,

    /// Extra GPU catalog file (YAML or JSON), merged over the built-in one
    #[arg(long, value_name = "FILE", help_heading = "Hardware")]
    pub catalog: Option<PathBuf>,

    // =========================================================================
    // Modes
    // =========================================================================

    /// Print the full estimate as JSON
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub json: bool,

    /// List the GPUs in the catalog and exit
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub list_gpus: bool,

    /// Search for the highest precision and longest context that fit
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub recommend: bool,

    /// Accept borderline fits during --recommend
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub allow_borderline: bool,

    /// Enable parameter sweep mode (CSV output)
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub sweep: bool,

    /// Quantization bits to sweep (comma-separated)
    #[arg(long, default_value = "32,16,8,4", help_heading = "Modes")]
    pub sweep_quant: String,

    /// Context lengths to sweep (comma-separated)
    #[arg(long, default_value = "4096,8192,16384,32768,65536,131072", help_heading = "Modes")]
    pub sweep_ctx: String,

    /// Show per-slot throughput and detailed capacity figures
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub verbose: bool,

    // =========================================================================
    // Setup
    // =========================================================================

    /// Config file (YAML or JSON)
    #[arg(long, value_name = "FILE", help_heading = "Setup")]
    pub config: Option<PathBuf>,

    /// Log level (overrides config; RUST_LOG takes precedence)
    #[arg(long, help_heading = "Setup")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Build the request from CLI args, falling back to config defaults.
    pub fn to_request(&self, defaults: &RequestDefaults) -> Result<ModelRequest> {
        let params = self
            .params
            .ok_or_else(|| anyhow!("--params is required (model size in billions)"))?;

        let quantization = match self.quant {
            Some(bits) => Quantization::from_bits(bits)
                .ok_or_else(|| anyhow!("unsupported --quant {}: expected 32, 16, 8 or 4", bits))?,
            None => defaults.quantization,
        };

        let mut request = ModelRequest::new(
            params,
            quantization,
            self.context.unwrap_or(defaults.context_tokens),
        );
        for spec in &self.gpus {
            request.gpu_slots.push(parse_gpu_slot(spec)?);
        }
        Ok(request)
    }

    /// Parse sweep quantization values.
    pub fn parse_sweep_quant(&self) -> Result<Vec<Quantization>> {
        self.sweep_quant
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .ok()
                    .and_then(Quantization::from_bits)
                    .ok_or_else(|| anyhow!("unsupported sweep quantization '{}'", s))
            })
            .collect()
    }

    /// Parse sweep context lengths.
    pub fn parse_sweep_ctx(&self) -> Vec<u32> {
        let values: Vec<u32> = self
            .sweep_ctx
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if values.is_empty() {
            CONTEXT_PRESETS.to_vec()
        } else {
            values
        }
    }
}

/// Parse `KEY[:COUNT]` into a slot. The count is passed through unchecked
/// so the validator can report non-positive values against the slot.
pub fn parse_gpu_slot(spec: &str) -> Result<GpuSlot> {
    let (key, count) = match spec.rsplit_once(':') {
        Some((key, count)) => {
            let count: i64 = count
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid GPU count in '{}'", spec))?;
            (key.trim(), count)
        }
        None => (spec.trim(), 1),
    };
    if key.is_empty() {
        bail!("missing GPU key in '{}'", spec);
    }
    Ok(GpuSlot::new(key, count))
}

/// Format gigabytes.
pub fn format_gb(gb: f64) -> String {
    if gb >= 1024.0 {
        format!("{:.2} TB", gb / 1024.0)
    } else {
        format!("{:.2} GB", gb)
    }
}

/// Format tokens per second.
pub fn format_tps(tps: u32) -> String {
    format!("~{} tok/s", tps)
}

/// Format watts.
pub fn format_watts(watts: f64) -> String {
    if watts >= 1000.0 {
        format!("{:.2} kW", watts / 1000.0)
    } else {
        format!("{:.0} W", watts)
    }
}

/// Format percentage.
pub fn format_pct(value: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{:.1}%", 100.0 * value / total)
    } else {
        "0.0%".to_string()
    }
}
