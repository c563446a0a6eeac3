//! Compatibility verdict and advisory warnings.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::capacity::CapacityResult;
use crate::catalog::{GpuCatalog, Generation, AMD_CONSUMER_KEY_PREFIX};
use crate::error::{EstimateError, Result};
use crate::model::{ModelRequest, Quantization};

/// Spare VRAM below which a fitting configuration is called borderline.
pub const BORDERLINE_MARGIN_GB: f64 = 2.0;

/// Context length above which long-context warnings apply.
pub const EXTENDED_CONTEXT_TOKENS: u32 = 32_768;

/// Model size above which multiple GPUs are suggested.
const LARGE_MODEL_PARAMS_B: f64 = 13.0;

/// Outcome of the capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Fits with at least [`BORDERLINE_MARGIN_GB`] to spare.
    Compatible,
    /// Fits, but with less than [`BORDERLINE_MARGIN_GB`] to spare.
    Borderline,
    /// Effective VRAM is below the requirement.
    Insufficient,
}

impl Verdict {
    /// Classify a capacity estimate.
    ///
    /// Borderline needs a strictly positive margin; an exact fit with zero
    /// spare reads as compatible.
    pub fn from_capacity(capacity: &CapacityResult) -> Self {
        let margin = capacity.vram_margin_gb;
        if capacity.effective_vram_gb < capacity.total_gpu_ram_gb {
            Verdict::Insufficient
        } else if margin > 0.0 && margin < BORDERLINE_MARGIN_GB {
            Verdict::Borderline
        } else {
            Verdict::Compatible
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Verdict::Compatible => "Compatible Configuration",
            Verdict::Borderline => "Borderline Configuration",
            Verdict::Insufficient => "Insufficient VRAM",
        }
    }

    /// Remedies worth trying for this verdict.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Verdict::Compatible => &[],
            Verdict::Borderline => &["Reduce context length", "Add GPUs for more headroom"],
            Verdict::Insufficient => &[
                "Use more GPUs",
                "Use a lower-precision quantization (e.g. 8-bit)",
                "Reduce context length",
                "Use a GPU with more VRAM",
            ],
        }
    }
}

/// An advisory note attached to an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    SmallModelRam,
    MediumModelRam,
    LargeModelRam,
    XlModelRam,
    AmdDriverSupport,
    Int8Tradeoff,
    Int4Tradeoff,
    ExtendedContext,
    Fp16LongContext,
    MultiGpuScaling,
    LegacyArchitecture,
    BenefitsFromMultiGpu,
    MixedArchitectures,
}

impl Warning {
    pub fn message(&self) -> &'static str {
        match self {
            Warning::SmallModelRam => {
                "Small model (3B or less): 8GB of system RAM is enough for most setups."
            }
            Warning::MediumModelRam => "7B-class model: at least 16GB of system RAM is recommended.",
            Warning::LargeModelRam => "13B-class model: at least 32GB of system RAM is recommended.",
            Warning::XlModelRam => {
                "Large model (over 13B): 64GB or more of system RAM is recommended."
            }
            Warning::AmdDriverSupport => {
                "AMD GPUs need ROCm support. Linux is recommended; Windows support is limited."
            }
            Warning::Int8Tradeoff => {
                "8-bit quantization halves memory use versus FP16 with a small accuracy loss."
            }
            Warning::Int4Tradeoff => {
                "4-bit quantization gives the largest memory savings but can noticeably reduce output quality."
            }
            Warning::ExtendedContext => {
                "Context lengths above 32K tokens substantially increase KV-cache VRAM usage."
            }
            Warning::Fp16LongContext => {
                "FP16 with an extended context needs much more VRAM; consider 8-bit quantization."
            }
            Warning::MultiGpuScaling => {
                "More than two GPU groups: multi-GPU scaling efficiency drops as groups are added."
            }
            Warning::LegacyArchitecture => {
                "Pascal GPUs have limited optimization support in current inference runtimes."
            }
            Warning::BenefitsFromMultiGpu => {
                "Models above 13B parameters benefit from multiple GPUs or high-VRAM accelerators."
            }
            Warning::MixedArchitectures => {
                "Mixed GPU architectures can cause uneven performance; the slowest GPU sets the pace."
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Verdict plus warnings for an estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryResult {
    pub verdict: Verdict,
    /// True for both compatible and borderline verdicts.
    pub is_compatible: bool,
    pub is_borderline: bool,
    /// Warning messages, in rule order.
    pub warnings: Vec<String>,
}

/// RAM tier advisory, on the same thresholds as the minimum RAM tiers.
fn ram_tier_warning(params_billions: f64) -> Warning {
    if params_billions <= 3.0 {
        Warning::SmallModelRam
    } else if params_billions <= 7.0 {
        Warning::MediumModelRam
    } else if params_billions <= 13.0 {
        Warning::LargeModelRam
    } else {
        Warning::XlModelRam
    }
}

/// Every warning that applies to a request, in rule order.
pub fn collect_warnings(request: &ModelRequest, catalog: &GpuCatalog) -> Result<Vec<Warning>> {
    let mut generations = BTreeSet::new();
    let mut any_amd = false;
    let mut populated = 0usize;

    for (key, _) in request.selected_slots() {
        let spec = catalog
            .get(key)
            .ok_or_else(|| EstimateError::UnknownGpuKey(key.to_string()))?;
        generations.insert(spec.generation);
        any_amd |= key.starts_with(AMD_CONSUMER_KEY_PREFIX);
        populated += 1;
    }

    let mut warnings = vec![ram_tier_warning(request.params_billions)];

    if any_amd {
        warnings.push(Warning::AmdDriverSupport);
    }

    match request.quantization {
        Quantization::INT8 => warnings.push(Warning::Int8Tradeoff),
        Quantization::INT4 => warnings.push(Warning::Int4Tradeoff),
        Quantization::FP16 | Quantization::FP32 => {}
    }

    if request.context_tokens > EXTENDED_CONTEXT_TOKENS {
        warnings.push(Warning::ExtendedContext);
        if request.quantization == Quantization::FP16 {
            warnings.push(Warning::Fp16LongContext);
        }
    }

    if populated > 2 {
        warnings.push(Warning::MultiGpuScaling);
    }

    if generations.contains(&Generation::OLDEST_SUPPORTED) {
        warnings.push(Warning::LegacyArchitecture);
    }

    if request.params_billions > LARGE_MODEL_PARAMS_B {
        warnings.push(Warning::BenefitsFromMultiGpu);
    }

    if generations.len() > 1 {
        warnings.push(Warning::MixedArchitectures);
    }

    Ok(warnings)
}

/// Derive the verdict and warnings for a request and its capacity estimate.
pub fn advise(
    request: &ModelRequest,
    catalog: &GpuCatalog,
    capacity: &CapacityResult,
) -> Result<AdvisoryResult> {
    let verdict = Verdict::from_capacity(capacity);
    let warnings = collect_warnings(request, catalog)?
        .iter()
        .map(|w| w.message().to_string())
        .collect();

    Ok(AdvisoryResult {
        verdict,
        is_compatible: verdict != Verdict::Insufficient,
        is_borderline: verdict == Verdict::Borderline,
        warnings,
    })
}
