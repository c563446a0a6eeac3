//! Token throughput model.
//!
//! Per GPU, the theoretical decode rate is `tflops / (6 * params)` scaled
//! down to 5% to account for real-world inference efficiency. Extra GPUs in
//! a slot add 90% of a single unit each.

use crate::catalog::{GpuCatalog, GpuSpec};
use crate::error::{EstimateError, Result};
use crate::model::{ModelRequest, Quantization};

/// Upper bound on the reported tokens/second.
pub const MAX_TOKENS_PER_SECOND: f64 = 200.0;

/// Fraction of peak FLOPs realised during inference.
const INFERENCE_UTILIZATION: f64 = 0.05;

/// Contribution of each GPU beyond the first in a slot.
const ADDITIONAL_GPU_SCALING: f64 = 0.9;

/// Throughput multiplier relative to FP16.
#[inline]
pub fn quant_speed_factor(quant: Quantization) -> f64 {
    match quant {
        Quantization::FP32 => 0.5,
        Quantization::FP16 => 1.0,
        Quantization::INT8 => 1.8,
        Quantization::INT4 => 2.2,
    }
}

/// Single-GPU tokens/second before quantization scaling.
#[inline]
pub fn base_tokens_per_second(tflops: f64, params_billions: f64) -> f64 {
    (tflops * 1e12) / (6.0 * params_billions * 1e9) * INFERENCE_UTILIZATION
}

/// Unclamped tokens/second for `count` GPUs of one model.
pub fn slot_tokens_per_second(
    spec: &GpuSpec,
    count: i64,
    params_billions: f64,
    quant: Quantization,
) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    let base = base_tokens_per_second(spec.tflops, params_billions);
    let factor = quant_speed_factor(quant);
    let first = base * factor;
    let additional = (count - 1) as f64 * base * ADDITIONAL_GPU_SCALING * factor;
    first + additional
}

/// Per-slot throughput in sequence order; `None` for unset slots.
pub fn per_slot_tokens_per_second(
    request: &ModelRequest,
    catalog: &GpuCatalog,
) -> Result<Vec<Option<f64>>> {
    request
        .gpu_slots
        .iter()
        .map(|slot| match slot.selected_key() {
            Some(key) => {
                let spec = catalog
                    .get(key)
                    .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))?;
                Ok(Some(slot_tokens_per_second(
                    spec,
                    slot.count,
                    request.params_billions,
                    request.quantization,
                )))
            }
            None => Ok(None),
        })
        .collect()
}

/// Aggregate tokens/second across all slots, clamped to
/// `[0, MAX_TOKENS_PER_SECOND]` and rounded.
pub fn estimate_tokens_per_second(request: &ModelRequest, catalog: &GpuCatalog) -> Result<u32> {
    let total: f64 = per_slot_tokens_per_second(request, catalog)?
        .into_iter()
        .flatten()
        .sum();
    Ok(total.clamp(0.0, MAX_TOKENS_PER_SECOND).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GpuSlot;

    #[test]
    fn test_base_tps() {
        let tps = base_tokens_per_second(82.6, 7.0);
        assert!((tps - 98.33333333333334).abs() < 1e-9);
    }

    #[test]
    fn test_quant_factors_ordered() {
        assert!(quant_speed_factor(Quantization::FP32) < quant_speed_factor(Quantization::FP16));
        assert!(quant_speed_factor(Quantization::FP16) < quant_speed_factor(Quantization::INT8));
        assert!(quant_speed_factor(Quantization::INT8) < quant_speed_factor(Quantization::INT4));
    }

    #[test]
    fn test_additional_gpus_scale_at_90_percent() {
        let catalog = GpuCatalog::builtin();
        let spec = catalog.get("rtx3090").unwrap();
        let one = slot_tokens_per_second(spec, 1, 13.0, Quantization::INT8);
        let two = slot_tokens_per_second(spec, 2, 13.0, Quantization::INT8);
        let four = slot_tokens_per_second(spec, 4, 13.0, Quantization::INT8);
        assert!((two - one * 1.9).abs() < 1e-9);
        assert!((four - one * 3.7).abs() < 1e-9);
        assert_eq!(slot_tokens_per_second(spec, 0, 13.0, Quantization::INT8), 0.0);
    }

    #[test]
    fn test_total_is_summed_then_rounded() {
        let catalog = GpuCatalog::builtin();
        // Two separate rtx3090 slots: 41.077 each
        let req = ModelRequest::new(13.0, Quantization::INT8, 4096)
            .with_gpu("rtx3090", 1)
            .with_gpu("rtx3090", 1);
        assert_eq!(estimate_tokens_per_second(&req, &catalog).unwrap(), 82);

        // Same two cards in one slot scale at 90%
        let req = ModelRequest::new(13.0, Quantization::INT8, 4096).with_gpu("rtx3090", 2);
        assert_eq!(estimate_tokens_per_second(&req, &catalog).unwrap(), 78);
    }

    #[test]
    fn test_fractional_slots_round_once() {
        let catalog = GpuCatalog::builtin();
        // 4.238 + 4.060 + 3.310 = 11.607; rounding each slot first would give 11
        let req = ModelRequest::new(70.0, Quantization::FP16, 4096)
            .with_gpu("rtx3090", 1)
            .with_gpu("rtx3080ti", 1)
            .with_gpu("a5000", 1);
        let slots: Vec<f64> = per_slot_tokens_per_second(&req, &catalog)
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let rounded_each: f64 = slots.iter().map(|t| t.round()).sum();
        assert_eq!(rounded_each, 11.0);
        assert_eq!(estimate_tokens_per_second(&req, &catalog).unwrap(), 12);
    }

    #[test]
    fn test_clamped_to_max() {
        let catalog = GpuCatalog::builtin();
        let req = ModelRequest::new(70.0, Quantization::INT4, 4096).with_gpu("h200", 1);
        assert_eq!(estimate_tokens_per_second(&req, &catalog).unwrap(), 200);
    }

    #[test]
    fn test_unset_slot_yields_none() {
        let catalog = GpuCatalog::builtin();
        let mut req = ModelRequest::new(7.0, Quantization::FP16, 4096).with_gpu("rtx4090", 1);
        req.gpu_slots.push(GpuSlot::empty());
        let slots = per_slot_tokens_per_second(&req, &catalog).unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].is_some());
        assert!(slots[1].is_none());
        assert_eq!(estimate_tokens_per_second(&req, &catalog).unwrap(), 98);
    }
}
