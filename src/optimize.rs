//! Search over quantization and context length.
//!
//! Answers the follow-up questions a user asks after a first estimate:
//! which precision is the highest that still fits, how much context fits,
//! and how the picture changes across a grid of settings.

use serde::Serialize;

use crate::advisory::Verdict;
use crate::catalog::GpuCatalog;
use crate::error::Result;
use crate::estimate::{estimate, EstimationResult};
use crate::model::{ModelRequest, Quantization};

/// Context lengths offered by default, in tokens.
pub const CONTEXT_PRESETS: [u32; 6] = [4096, 8192, 16_384, 32_768, 65_536, 131_072];

/// Search parameters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchParams {
    /// Accept borderline fits, not just compatible ones.
    pub allow_borderline: bool,
}

impl SearchParams {
    fn accepts(&self, verdict: Verdict) -> bool {
        match verdict {
            Verdict::Compatible => true,
            Verdict::Borderline => self.allow_borderline,
            Verdict::Insufficient => false,
        }
    }
}

/// Result of the quantization search.
#[derive(Debug, Clone, Serialize)]
pub struct QuantRecommendation {
    /// Highest precision that fits.
    pub quantization: Quantization,
    /// Estimate at that precision.
    pub result: EstimationResult,
    /// Number of precisions evaluated.
    pub configs_evaluated: u32,
    /// Number rejected for not fitting.
    pub configs_rejected: u32,
}

/// Find the highest-precision quantization that fits the request's GPUs.
///
/// Tries FP32, FP16, INT8, INT4 in that order and stops at the first one
/// whose verdict `params` accepts. Returns `Ok(None)` if none fit.
pub fn recommend_quantization(
    request: &ModelRequest,
    catalog: &GpuCatalog,
    params: &SearchParams,
) -> Result<Option<QuantRecommendation>> {
    let mut configs_evaluated = 0u32;
    let mut configs_rejected = 0u32;

    for quantization in Quantization::ALL {
        let candidate = ModelRequest {
            quantization,
            ..request.clone()
        };
        let result = estimate(&candidate, catalog)?;
        configs_evaluated += 1;

        if params.accepts(result.advisory.verdict) {
            return Ok(Some(QuantRecommendation {
                quantization,
                result,
                configs_evaluated,
                configs_rejected,
            }));
        }
        configs_rejected += 1;
    }

    Ok(None)
}

/// Largest context from `candidates` that fits at the request's precision.
pub fn max_fitting_context(
    request: &ModelRequest,
    catalog: &GpuCatalog,
    candidates: &[u32],
    params: &SearchParams,
) -> Result<Option<u32>> {
    let mut best = None;
    for &context_tokens in candidates {
        let candidate = ModelRequest {
            context_tokens,
            ..request.clone()
        };
        let result = estimate(&candidate, catalog)?;
        if params.accepts(result.advisory.verdict) {
            best = best.max(Some(context_tokens));
        }
    }
    Ok(best)
}

/// Estimate every quantization/context combination.
pub fn parameter_sweep(
    request: &ModelRequest,
    catalog: &GpuCatalog,
    quants: &[Quantization],
    contexts: &[u32],
) -> Result<Vec<SweepResult>> {
    let mut results = Vec::with_capacity(quants.len() * contexts.len());

    for &quantization in quants {
        for &context_tokens in contexts {
            let candidate = ModelRequest {
                quantization,
                context_tokens,
                ..request.clone()
            };
            let result = estimate(&candidate, catalog)?;

            results.push(SweepResult {
                bits: quantization.bits(),
                context_tokens,
                gpu_ram_gb: result.capacity.total_gpu_ram_gb,
                effective_vram_gb: result.capacity.effective_vram_gb,
                margin_gb: result.capacity.vram_margin_gb,
                tokens_per_second: result.tokens_per_second,
                power_watts: result.power.total_power_watts,
                verdict: result.advisory.verdict,
            });
        }
    }

    Ok(results)
}

/// Single row of a parameter sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub bits: u32,
    pub context_tokens: u32,
    pub gpu_ram_gb: f64,
    pub effective_vram_gb: f64,
    pub margin_gb: f64,
    pub tokens_per_second: u32,
    pub power_watts: f64,
    pub verdict: Verdict,
}

impl SweepResult {
    /// CSV header.
    pub fn csv_header() -> &'static str {
        "bits,context_tokens,gpu_ram_gb,effective_vram_gb,margin_gb,tokens_per_second,power_watts,verdict"
    }

    /// Format as CSV row.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{:.2},{:.2},{:.2},{},{:.0},{:?}",
            self.bits,
            self.context_tokens,
            self.gpu_ram_gb,
            self.effective_vram_gb,
            self.margin_gb,
            self.tokens_per_second,
            self.power_watts,
            self.verdict
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimateError;

    #[test]
    fn test_recommend_picks_highest_fitting_precision() {
        let catalog = GpuCatalog::builtin();
        // 13B on 24GB: FP32 and FP16 do not fit, INT8 does
        let req = ModelRequest::new(13.0, Quantization::FP32, 4096).with_gpu("rtx4090", 1);
        let rec = recommend_quantization(&req, &catalog, &SearchParams::default())
            .unwrap()
            .unwrap();
        assert_eq!(rec.quantization, Quantization::INT8);
        assert_eq!(rec.configs_evaluated, 3);
        assert_eq!(rec.configs_rejected, 2);
        assert_eq!(rec.result.advisory.verdict, Verdict::Compatible);
    }

    #[test]
    fn test_recommend_none_when_nothing_fits() {
        let catalog = GpuCatalog::builtin();
        let req = ModelRequest::new(405.0, Quantization::FP16, 4096).with_gpu("gtx1060", 1);
        let rec = recommend_quantization(&req, &catalog, &SearchParams::default()).unwrap();
        assert!(rec.is_none());
    }

    #[test]
    fn test_borderline_acceptance() {
        let catalog = GpuCatalog::builtin();
        // 8B INT8 on a 10GB card is borderline; INT4 is compatible
        let req = ModelRequest::new(8.0, Quantization::INT8, 4096).with_gpu("rtx3080", 1);

        let strict = recommend_quantization(&req, &catalog, &SearchParams::default())
            .unwrap()
            .unwrap();
        assert_eq!(strict.quantization, Quantization::INT4);

        let lenient = SearchParams { allow_borderline: true };
        let rec = recommend_quantization(&req, &catalog, &lenient).unwrap().unwrap();
        assert_eq!(rec.quantization, Quantization::INT8);
    }

    #[test]
    fn test_max_fitting_context() {
        let catalog = GpuCatalog::builtin();
        // 7B FP16 on 24GB: 32K needs ~22.7GB (borderline), 64K does not fit
        let req = ModelRequest::new(7.0, Quantization::FP16, 4096).with_gpu("rtx4090", 1);
        let strict = max_fitting_context(&req, &catalog, &CONTEXT_PRESETS, &SearchParams::default())
            .unwrap();
        assert_eq!(strict, Some(16_384));
        let lenient = SearchParams { allow_borderline: true };
        let best = max_fitting_context(&req, &catalog, &CONTEXT_PRESETS, &lenient).unwrap();
        assert_eq!(best, Some(32_768));
    }

    #[test]
    fn test_sweep_produces_grid() {
        let catalog = GpuCatalog::builtin();
        let req = ModelRequest::new(7.0, Quantization::FP16, 4096).with_gpu("rtx4090", 1);
        let quants = [Quantization::FP16, Quantization::INT4];
        let results = parameter_sweep(&req, &catalog, &quants, &[4096, 65_536]).unwrap();
        assert_eq!(results.len(), 4);

        // Lower precision needs less memory at the same context
        let fp16 = results.iter().find(|r| r.bits == 16 && r.context_tokens == 65_536).unwrap();
        let int4 = results.iter().find(|r| r.bits == 4 && r.context_tokens == 65_536).unwrap();
        assert!(int4.gpu_ram_gb < fp16.gpu_ram_gb);
        assert_eq!(fp16.verdict, Verdict::Insufficient);

        let row = results[0].to_csv();
        assert_eq!(row.split(',').count(), SweepResult::csv_header().split(',').count());
    }

    #[test]
    fn test_search_propagates_validation_errors() {
        let catalog = GpuCatalog::builtin();
        let req = ModelRequest::new(7.0, Quantization::FP16, 4096);
        assert!(matches!(
            recommend_quantization(&req, &catalog, &SearchParams::default()),
            Err(EstimateError::NoGpuSelected)
        ));
    }
}
