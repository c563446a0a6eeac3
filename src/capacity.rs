//! Memory capacity model: weights, KV-cache, VRAM across a heterogeneous
//! multi-GPU set, and host-side requirements.
//!
//! All sizes are in GB of 2^30 bytes. The formulas are heuristics kept
//! exactly as-is so results stay reproducible:
//!
//! - weights: `P * Q * 1e9 / (8 * 2^30)`
//! - hidden size: `sqrt(P * 1e9 / 6)`
//! - KV-cache: `2 * hidden * C * 2 * Q / 8` bytes
//! - GPU overhead: 10% of the weights

use serde::Serialize;

use crate::catalog::GpuCatalog;
use crate::error::{EstimateError, Result};
use crate::model::{ModelRequest, Quantization};

/// Bytes in one GB as used throughout the estimators.
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// VRAM efficiency applied once more than a single first GPU is in play.
pub const MULTI_GPU_VRAM_EFFICIENCY: f64 = 0.9;

/// Fixed disk allowance on top of the weights (runtime, cache, OS).
const STORAGE_BASE_GB: f64 = 10.0;

/// Capacity estimate for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityResult {
    /// Raw weight storage at the requested precision.
    pub base_model_gb: f64,
    /// KV-cache for the full context window.
    pub kv_cache_gb: f64,
    /// Weights + KV-cache + runtime overhead.
    pub total_gpu_ram_gb: f64,
    /// Host RAM needed to stage the model.
    pub total_system_ram_gb: f64,
    /// Sum of VRAM across populated slots.
    pub total_available_vram_gb: f64,
    /// Available VRAM after the multi-GPU efficiency factor.
    pub effective_vram_gb: f64,
    /// `total_available_vram_gb - total_gpu_ram_gb` (uses raw VRAM).
    pub vram_margin_gb: f64,
    /// Minimum host RAM tier for the model size.
    pub minimum_system_ram_gb: f64,
    /// Disk needed for weights plus runtime.
    pub storage_required_gb: f64,
    /// Suggested CPU cores.
    pub recommended_cores: u32,
    /// Whether the staged model meets the host RAM tier.
    pub system_requirements_met: bool,
}

/// Weight storage in GB.
#[inline]
pub fn base_model_gb(params_billions: f64, quant: Quantization) -> f64 {
    params_billions * quant.bits() as f64 * 1e9 / (8.0 * BYTES_PER_GB)
}

/// Transformer hidden dimension approximated from the parameter count
/// (params ~ 12 * hidden^2 per layer pair).
#[inline]
pub fn hidden_size(params_billions: f64) -> f64 {
    (params_billions * 1e9 / 6.0).sqrt()
}

/// KV-cache size in GB for `context_tokens` tokens.
#[inline]
pub fn kv_cache_gb(params_billions: f64, context_tokens: u32, quant: Quantization) -> f64 {
    let hidden = hidden_size(params_billions);
    // K and V projections, 2-byte factor, scaled by bit width
    (2.0 * hidden * context_tokens as f64 * 2.0 * quant.bits() as f64 / 8.0) / BYTES_PER_GB
}

/// Host RAM headroom relative to the GPU footprint.
#[inline]
pub fn system_ram_multiplier(quant: Quantization) -> f64 {
    match quant {
        Quantization::FP32 => 2.0,
        Quantization::FP16 => 1.5,
        Quantization::INT8 => 1.2,
        Quantization::INT4 => 1.1,
    }
}

/// Host RAM tier by model size.
#[inline]
pub fn minimum_system_ram_gb(params_billions: f64) -> f64 {
    if params_billions <= 3.0 {
        8.0
    } else if params_billions <= 7.0 {
        16.0
    } else if params_billions <= 13.0 {
        32.0
    } else {
        64.0
    }
}

#[inline]
pub fn recommended_cores(params_billions: f64) -> u32 {
    if params_billions > 13.0 {
        8
    } else {
        4
    }
}

/// Total VRAM over populated slots, and the VRAM of the first slot (0 if
/// the first slot is unset). Non-positive counts contribute nothing.
fn available_vram(request: &ModelRequest, catalog: &GpuCatalog) -> Result<(f64, f64)> {
    let mut total = 0.0;
    for (key, slot) in request.selected_slots() {
        let spec = catalog
            .get(key)
            .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))?;
        total += spec.vram_gb * slot.count.max(0) as f64;
    }

    let first = match request.gpu_slots.first().and_then(|s| s.selected_key()) {
        Some(key) => catalog
            .get(key)
            .map(|spec| spec.vram_gb)
            .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))?,
        None => 0.0,
    };

    Ok((total, first))
}

/// Efficiency factor for the available VRAM.
///
/// Compares the total against the first slot's single-GPU VRAM, so it
/// depends on slot order: one slot with `count = 2` counts as multi-GPU,
/// and so do two slots with `count = 1`. A lone single GPU does not.
#[inline]
pub fn multi_gpu_efficiency(total_available_vram_gb: f64, first_slot_vram_gb: f64) -> f64 {
    if total_available_vram_gb > first_slot_vram_gb {
        MULTI_GPU_VRAM_EFFICIENCY
    } else {
        1.0
    }
}

/// Run the capacity model. Fails with [`EstimateError::UnknownGpuKey`] if a
/// populated slot is missing from the catalog.
pub fn estimate_capacity(request: &ModelRequest, catalog: &GpuCatalog) -> Result<CapacityResult> {
    let params = request.params_billions;
    let quant = request.quantization;

    let base_model_gb = base_model_gb(params, quant);
    let kv_cache_gb = kv_cache_gb(params, request.context_tokens, quant);
    let gpu_overhead_gb = 0.10 * base_model_gb;
    let total_gpu_ram_gb = base_model_gb + kv_cache_gb + gpu_overhead_gb;
    let total_system_ram_gb = total_gpu_ram_gb * system_ram_multiplier(quant);

    let (total_available_vram_gb, first_slot_vram_gb) = available_vram(request, catalog)?;
    let effective_vram_gb =
        total_available_vram_gb * multi_gpu_efficiency(total_available_vram_gb, first_slot_vram_gb);

    let minimum_system_ram_gb = minimum_system_ram_gb(params);

    Ok(CapacityResult {
        base_model_gb,
        kv_cache_gb,
        total_gpu_ram_gb,
        total_system_ram_gb,
        total_available_vram_gb,
        effective_vram_gb,
        vram_margin_gb: total_available_vram_gb - total_gpu_ram_gb,
        minimum_system_ram_gb,
        storage_required_gb: STORAGE_BASE_GB + base_model_gb,
        recommended_cores: recommended_cores(params),
        system_requirements_met: total_system_ram_gb >= minimum_system_ram_gb,
    })
}
