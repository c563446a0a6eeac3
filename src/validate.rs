//! Request validation. Runs before any estimator and reports the first
//! rule a request breaks.

use crate::catalog::GpuCatalog;
use crate::error::{EstimateError, Result};
use crate::model::ModelRequest;

/// Check a request against the rules below, in order:
///
/// 1. `params_billions` is finite and > 0 ([`EstimateError::InvalidParameterCount`])
/// 2. at least one slot references a GPU ([`EstimateError::NoGpuSelected`])
/// 3. every populated slot has `count >= 1` ([`EstimateError::InvalidGpuCount`])
/// 4. every populated slot resolves in `catalog` ([`EstimateError::UnknownGpuKey`])
pub fn validate(request: &ModelRequest, catalog: &GpuCatalog) -> Result<()> {
    let params = request.params_billions;
    if !params.is_finite() || params <= 0.0 {
        return Err(EstimateError::InvalidParameterCount(params));
    }

    if request.selected_slots().next().is_none() {
        return Err(EstimateError::NoGpuSelected);
    }

    for (slot, gpu) in request.gpu_slots.iter().enumerate() {
        if let Some(key) = gpu.selected_key() {
            if gpu.count <= 0 {
                return Err(EstimateError::InvalidGpuCount {
                    slot,
                    gpu_key: key.to_string(),
                    count: gpu.count,
                });
            }
        }
    }

    if let Some((key, _)) = request.selected_slots().find(|(key, _)| !catalog.contains(key)) {
        return Err(EstimateError::UnknownGpuKey(key.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GpuSlot, Quantization};

    fn request() -> ModelRequest {
        ModelRequest::new(7.0, Quantization::FP16, 4096)
    }

    #[test]
    fn test_valid_request() {
        let catalog = GpuCatalog::builtin();
        let req = request().with_gpu("rtx4090", 1);
        assert_eq!(validate(&req, &catalog), Ok(()));
    }

    #[test]
    fn test_parameter_count_rules() {
        let catalog = GpuCatalog::builtin();
        for bad in [0.0, -7.0, f64::NAN, f64::INFINITY] {
            let req = ModelRequest {
                params_billions: bad,
                ..request().with_gpu("rtx4090", 1)
            };
            assert!(matches!(
                validate(&req, &catalog),
                Err(EstimateError::InvalidParameterCount(_))
            ));
        }
    }

    #[test]
    fn test_rules_checked_in_order() {
        let catalog = GpuCatalog::builtin();
        // Bad params and no GPU: params rule wins
        let req = ModelRequest { params_billions: 0.0, ..request() };
        assert!(matches!(
            validate(&req, &catalog),
            Err(EstimateError::InvalidParameterCount(_))
        ));

        // Bad count and unknown key: count rule wins
        let req = request().with_gpu("not-a-gpu", 1).with_gpu("rtx4090", 0);
        assert!(matches!(
            validate(&req, &catalog),
            Err(EstimateError::InvalidGpuCount { slot: 1, .. })
        ));
    }

    #[test]
    fn test_unset_slot_count_ignored() {
        let catalog = GpuCatalog::builtin();
        let mut req = request().with_gpu("rtx4090", 1);
        req.gpu_slots.push(GpuSlot { gpu_key: None, count: -3 });
        assert_eq!(validate(&req, &catalog), Ok(()));
    }

    #[test]
    fn test_unknown_key() {
        let catalog = GpuCatalog::builtin();
        let req = request().with_gpu("rtx9999", 1);
        assert_eq!(
            validate(&req, &catalog),
            Err(EstimateError::UnknownGpuKey("rtx9999".to_string()))
        );
    }

    #[test]
    fn test_does_not_mutate() {
        let catalog = GpuCatalog::builtin();
        let req = request().with_gpu("rtx4090", 0);
        let before = req.clone();
        let _ = validate(&req, &catalog);
        assert_eq!(req, before);
    }
}
