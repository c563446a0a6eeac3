//! LLM GPU fit estimator.
//!
//! Given a model size, weight quantization, context length and an ordered
//! set of GPUs, estimates whether the model fits in VRAM, how much system
//! RAM it needs, the expected throughput and power draw, and which caveats
//! apply.
//!
//! Every estimator is a pure function over a [`ModelRequest`] and a
//! [`GpuCatalog`]; [`estimate`] runs them all behind the validator.
//!
//! ```
//! use vramcheck::{estimate, GpuCatalog, ModelRequest, Quantization, Verdict};
//!
//! let catalog = GpuCatalog::builtin();
//! let request = ModelRequest::new(7.0, Quantization::FP16, 4096).with_gpu("rtx4090", 1);
//! let result = estimate(&request, &catalog).unwrap();
//! assert_eq!(result.advisory.verdict, Verdict::Compatible);
//! ```

pub mod advisory;
pub mod capacity;
pub mod catalog;
pub mod error;
pub mod estimate;
pub mod model;
pub mod optimize;
pub mod power;
pub mod throughput;
pub mod validate;


pub use advisory::{advise, collect_warnings, AdvisoryResult, Verdict, Warning};
pub use capacity::{estimate_capacity, CapacityResult};
pub use catalog::{Generation, GpuCatalog, GpuSpec};
pub use error::{CatalogError, EstimateError};
pub use estimate::{estimate, gpu_config_label, EstimationResult};
pub use model::{GpuSlot, ModelRequest, Quantization};
pub use optimize::{
    max_fitting_context, parameter_sweep, recommend_quantization, QuantRecommendation,
    SearchParams, SweepResult, CONTEXT_PRESETS,
};
pub use power::{estimate_power, PowerResult, SlotPower};
pub use throughput::estimate_tokens_per_second;
pub use validate::validate;
