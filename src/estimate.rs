//! Estimation entry point: validate, run every estimator, and assemble
//! one [`EstimationResult`].
//!
//! [`estimate`] is a pure function of its inputs. Callers re-run it
//! whenever they decide the inputs changed; nothing is cached between
//! calls, so concurrent or superseded calls need no coordination.

use serde::Serialize;
use tracing::debug;

use crate::advisory::{advise, AdvisoryResult};
use crate::capacity::{estimate_capacity, CapacityResult};
use crate::catalog::GpuCatalog;
use crate::error::{EstimateError, Result};
use crate::model::ModelRequest;
use crate::power::{estimate_power, PowerResult};
use crate::throughput::estimate_tokens_per_second;
use crate::validate::validate;

/// Full estimate for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub capacity: CapacityResult,
    /// Aggregate tokens/second, clamped to `[0, 200]`.
    pub tokens_per_second: u32,
    pub power: PowerResult,
    pub advisory: AdvisoryResult,
    /// Display label such as `2x RTX 3090 + 1x A6000`.
    pub gpu_config: String,
}

/// Human-readable label for the populated slots, joined with ` + `.
///
/// This is display-only formatting; nothing parses it back.
pub fn gpu_config_label(request: &ModelRequest, catalog: &GpuCatalog) -> Result<String> {
    let parts = request
        .selected_slots()
        .map(|(key, slot)| {
            catalog
                .get(key)
                .map(|spec| format!("{}x {}", slot.count, spec.name))
                .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" + "))
}

/// Validate `request` and run the capacity, throughput, power and advisory
/// estimators against `catalog`.
pub fn estimate(request: &ModelRequest, catalog: &GpuCatalog) -> Result<EstimationResult> {
    validate(request, catalog)?;

    let capacity = estimate_capacity(request, catalog)?;
    let tokens_per_second = estimate_tokens_per_second(request, catalog)?;
    let power = estimate_power(request, catalog)?;
    let advisory = advise(request, catalog, &capacity)?;
    let gpu_config = gpu_config_label(request, catalog)?;

    debug!(
        params_b = request.params_billions,
        bits = request.quantization.bits(),
        context = request.context_tokens,
        gpu_config = %gpu_config,
        verdict = ?advisory.verdict,
        "estimate computed"
    );

    Ok(EstimationResult {
        capacity,
        tokens_per_second,
        power,
        advisory,
        gpu_config,
    })
}
