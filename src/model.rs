//! Request model: what the caller asks the estimators about.
//!
//! A [`ModelRequest`] describes one model (parameter count, quantization,
//! context length) and an ordered list of [`GpuSlot`]s. Requests are plain
//! values, built fresh for every estimation and never mutated by the engine.

use serde::{Deserialize, Serialize};

/// Numeric precision used to store model weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Quantization {
    FP32,
    #[default]
    FP16,
    INT8,
    INT4,
}

impl Quantization {
    /// All supported precisions, highest first.
    pub const ALL: [Quantization; 4] = [Self::FP32, Self::FP16, Self::INT8, Self::INT4];

    pub fn bits(&self) -> u32 {
        match self {
            Self::FP32 => 32,
            Self::FP16 => 16,
            Self::INT8 => 8,
            Self::INT4 => 4,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::FP32),
            16 => Some(Self::FP16),
            8 => Some(Self::INT8),
            4 => Some(Self::INT4),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FP32 => "32-bit (FP32)",
            Self::FP16 => "16-bit (FP16)",
            Self::INT8 => "8-bit (INT8)",
            Self::INT4 => "4-bit (INT4)",
        }
    }
}

impl TryFrom<u32> for Quantization {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
            .ok_or_else(|| format!("unsupported quantization: {} bits (expected 4, 8, 16 or 32)", bits))
    }
}

impl From<Quantization> for u32 {
    fn from(q: Quantization) -> u32 {
        q.bits()
    }
}

/// One row of a GPU configuration: a catalog key and how many of that card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSlot {
    /// Catalog key; `None` or an empty string means the row is unset.
    #[serde(default)]
    pub gpu_key: Option<String>,
    /// Number of physical GPUs. Signed so that bad input reaches the
    /// validator instead of failing to construct.
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    1
}

impl GpuSlot {
    pub fn new(gpu_key: impl Into<String>, count: i64) -> Self {
        Self {
            gpu_key: Some(gpu_key.into()),
            count,
        }
    }

    /// An unset row.
    pub fn empty() -> Self {
        Self {
            gpu_key: None,
            count: 1,
        }
    }

    /// The catalog key if this row is set.
    pub fn selected_key(&self) -> Option<&str> {
        self.gpu_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Everything the estimators need for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Model size in billions of parameters.
    pub params_billions: f64,
    /// Weight precision.
    #[serde(default)]
    pub quantization: Quantization,
    /// Context window in tokens.
    #[serde(default = "default_context")]
    pub context_tokens: u32,
    /// Ordered GPU rows. Order matters only for the multi-GPU efficiency
    /// rule, which looks at the first row.
    pub gpu_slots: Vec<GpuSlot>,
}

fn default_context() -> u32 {
    4096
}

impl ModelRequest {
    pub fn new(params_billions: f64, quantization: Quantization, context_tokens: u32) -> Self {
        Self {
            params_billions,
            quantization,
            context_tokens,
            gpu_slots: Vec::new(),
        }
    }

    /// Builder-style helper for adding a populated row.
    pub fn with_gpu(mut self, gpu_key: impl Into<String>, count: i64) -> Self {
        self.gpu_slots.push(GpuSlot::new(gpu_key, count));
        self
    }

    /// Rows that reference a GPU, paired with their key, in sequence order.
    pub fn selected_slots(&self) -> impl Iterator<Item = (&str, &GpuSlot)> {
        self.gpu_slots
            .iter()
            .filter_map(|slot| slot.selected_key().map(|key| (key, slot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantization_bits() {
        for q in Quantization::ALL {
            assert_eq!(Quantization::from_bits(q.bits()), Some(q));
        }
        assert_eq!(Quantization::from_bits(6), None);
        assert_eq!(Quantization::default(), Quantization::FP16);
    }

    #[test]
    fn test_quantization_serde_as_bits() {
        let json = serde_json::to_string(&Quantization::INT8).unwrap();
        assert_eq!(json, "8");
        assert!(serde_json::from_str::<Quantization>("3").is_err());
    }

    #[test]
    fn test_selected_key_treats_blank_as_unset() {
        assert_eq!(GpuSlot::new("rtx4090", 1).selected_key(), Some("rtx4090"));
        assert_eq!(GpuSlot::new("", 1).selected_key(), None);
        assert_eq!(GpuSlot::new("   ", 1).selected_key(), None);
        assert_eq!(GpuSlot::empty().selected_key(), None);
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{"params_billions": 7, "quantization": 4,
            "gpu_slots": [{"gpu_key": "rtx3090", "count": 2}, {}]}"#;
        let req: ModelRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.quantization, Quantization::INT4);
        assert_eq!(req.context_tokens, 4096);
        assert_eq!(req.gpu_slots.len(), 2);
        assert_eq!(req.selected_slots().count(), 1);
    }
}
