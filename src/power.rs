//! Power draw model.
//!
//! Sustained draw is approximated from TDP scaled by a utilization factor
//! that depends on quantization. Multi-GPU slots pay 10% extra per
//! additional card, and the host adds a base overhead by model size plus
//! 25 W per additional card.

use serde::Serialize;

use crate::catalog::GpuCatalog;
use crate::error::{EstimateError, Result};
use crate::model::{ModelRequest, Quantization};

/// Host overhead per GPU beyond the first in a slot.
const EXTRA_GPU_SYSTEM_WATTS: f64 = 25.0;

/// Per-card overhead fraction for multi-GPU slots.
const MULTI_GPU_OVERHEAD: f64 = 0.1;

/// Power draw for one populated slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotPower {
    /// GPU display name.
    pub name: String,
    pub count: i64,
    /// Slot draw including multi-GPU overhead.
    pub total_watts: f64,
    /// Draw of a single card.
    pub per_unit_watts: f64,
}

/// Power estimate for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerResult {
    pub total_power_watts: f64,
    /// Populated slots only, in sequence order.
    pub per_gpu_breakdown: Vec<SlotPower>,
    pub system_overhead_watts: f64,
    /// Fraction of TDP assumed under load.
    pub utilization_factor: f64,
}

/// Fraction of TDP drawn under inference load.
#[inline]
pub fn utilization_factor(quant: Quantization) -> f64 {
    match quant {
        Quantization::FP32 => 0.85,
        Quantization::FP16 => 0.75,
        Quantization::INT8 => 0.65,
        Quantization::INT4 => 0.60,
    }
}

/// Host overhead before per-GPU additions.
#[inline]
pub fn base_system_overhead_watts(params_billions: f64) -> f64 {
    if params_billions <= 3.0 {
        75.0
    } else if params_billions <= 7.0 {
        100.0
    } else if params_billions <= 13.0 {
        150.0
    } else {
        200.0
    }
}

/// Draw for `count` cards of a given TDP. Returns `(per_unit, total)`.
#[inline]
pub fn slot_watts(tdp_watts: f64, count: i64, utilization: f64) -> (f64, f64) {
    let per_unit = (tdp_watts * utilization).round();
    let n = count.max(0) as f64;
    let overhead = if count > 1 {
        (n - 1.0) * MULTI_GPU_OVERHEAD * per_unit
    } else {
        0.0
    };
    (per_unit, (per_unit * n + overhead).round())
}

/// Run the power model.
pub fn estimate_power(request: &ModelRequest, catalog: &GpuCatalog) -> Result<PowerResult> {
    let utilization = utilization_factor(request.quantization);
    let mut system_overhead_watts = base_system_overhead_watts(request.params_billions);
    let mut per_gpu_breakdown = Vec::new();

    for (key, slot) in request.selected_slots() {
        let spec = catalog
            .get(key)
            .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))?;
        let (per_unit_watts, total_watts) = slot_watts(spec.tdp_watts, slot.count, utilization);

        if slot.count > 1 {
            system_overhead_watts += (slot.count - 1) as f64 * EXTRA_GPU_SYSTEM_WATTS;
        }

        per_gpu_breakdown.push(SlotPower {
            name: spec.name.clone(),
            count: slot.count,
            total_watts,
            per_unit_watts,
        });
    }

    let gpu_watts: f64 = per_gpu_breakdown.iter().map(|s| s.total_watts).sum();

    Ok(PowerResult {
        total_power_watts: (gpu_watts + system_overhead_watts).round(),
        per_gpu_breakdown,
        system_overhead_watts,
        utilization_factor: utilization,
    })
}
