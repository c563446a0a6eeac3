//! GPU catalog: the static table of accelerator specs the estimators read from.
//!
//! The catalog is plain data. A built-in table ships with the crate, and
//! [`GpuCatalog::from_path`] loads a replacement (or extension) from a
//! YAML or JSON file so new hardware can be added without touching the
//! estimators.
//!
//! # File format
//!
//! ```yaml
//! gpus:
//!   rtx4090:
//!     name: RTX 4090
//!     vram_gb: 24
//!     generation: Ada Lovelace
//!     tflops: 82.6
//!     tdp_watts: 450
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogError;

/// Key prefix shared by AMD Radeon consumer cards in the catalog.
pub const AMD_CONSUMER_KEY_PREFIX: &str = "rx";

// ============================================================================
// Architecture Generations
// ============================================================================

/// GPU architecture generation.
///
/// Serialized as its display name; parsed through [`Generation::from_str`],
/// so catalog files may use the short forms too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Generation {
    Pascal,
    Volta,
    Turing,
    Ampere,
    AdaLovelace,
    Hopper,
    Blackwell,
    Rdna2,
    Rdna3,
    AppleSilicon,
}

impl Generation {
    /// Oldest architecture the calculator still lists.
    pub const OLDEST_SUPPORTED: Generation = Generation::Pascal;

    /// Parse from string, case-insensitive. Accepts the display names and
    /// compact forms like `ada` or `apple`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pascal" => Some(Self::Pascal),
            "volta" => Some(Self::Volta),
            "turing" => Some(Self::Turing),
            "ampere" => Some(Self::Ampere),
            "ada lovelace" | "ada" | "adalovelace" => Some(Self::AdaLovelace),
            "hopper" => Some(Self::Hopper),
            "blackwell" => Some(Self::Blackwell),
            "rdna2" => Some(Self::Rdna2),
            "rdna3" => Some(Self::Rdna3),
            "apple silicon" | "apple" | "applesilicon" => Some(Self::AppleSilicon),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pascal => "Pascal",
            Self::Volta => "Volta",
            Self::Turing => "Turing",
            Self::Ampere => "Ampere",
            Self::AdaLovelace => "Ada Lovelace",
            Self::Hopper => "Hopper",
            Self::Blackwell => "Blackwell",
            Self::Rdna2 => "RDNA2",
            Self::Rdna3 => "RDNA3",
            Self::AppleSilicon => "Apple Silicon",
        }
    }
}

impl TryFrom<String> for Generation {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s).ok_or_else(|| format!("unknown GPU generation '{}'", s))
    }
}

impl From<Generation> for String {
    fn from(g: Generation) -> String {
        g.name().to_string()
    }
}

// ============================================================================
// GPU Specs
// ============================================================================

/// Specification of a single accelerator model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSpec {
    /// Unique catalog key (e.g. `rtx4090`).
    pub key: String,
    /// Display name.
    pub name: String,
    /// VRAM capacity in GB.
    pub vram_gb: f64,
    /// Architecture generation.
    pub generation: Generation,
    /// FP16 throughput in TFLOPS.
    pub tflops: f64,
    /// Thermal design power in watts.
    pub tdp_watts: f64,
}

impl GpuSpec {
    /// Reject specs that would poison the estimators with zero or
    /// non-finite figures.
    fn check(&self) -> Result<(), CatalogError> {
        let fields = [
            ("vram_gb", self.vram_gb),
            ("tflops", self.tflops),
            ("tdp_watts", self.tdp_watts),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(CatalogError::InvalidSpec {
                    key: self.key.clone(),
                    reason: format!("{} must be a finite number > 0, got {}", field, value),
                });
            }
        }
        if self.key.trim().is_empty() {
            return Err(CatalogError::InvalidSpec {
                key: self.key.clone(),
                reason: "key must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// On-disk form of a catalog entry (the key lives in the enclosing map).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpecEntry {
    name: String,
    vram_gb: f64,
    generation: Generation,
    tflops: f64,
    tdp_watts: f64,
}

/// On-disk catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    gpus: BTreeMap<String, SpecEntry>,
}

struct BuiltinGpu {
    key: &'static str,
    name: &'static str,
    vram_gb: f64,
    generation: Generation,
    tflops: f64,
    tdp_watts: f64,
}

const fn gpu(
    key: &'static str,
    name: &'static str,
    vram_gb: f64,
    generation: Generation,
    tflops: f64,
    tdp_watts: f64,
) -> BuiltinGpu {
    BuiltinGpu { key, name, vram_gb, generation, tflops, tdp_watts }
}

/// Built-in accelerator table. TFLOPS are FP16 / mixed-precision figures.
const BUILTIN_GPUS: &[BuiltinGpu] = &[
    // Data center
    gpu("h200", "H200", 141.0, Generation::Hopper, 1979.0, 700.0),
    gpu("h100", "H100", 80.0, Generation::Hopper, 1979.0, 700.0),
    gpu("a100-80gb", "A100 80GB", 80.0, Generation::Ampere, 312.0, 400.0),
    gpu("a100-40gb", "A100 40GB", 40.0, Generation::Ampere, 312.0, 400.0),
    gpu("a40", "A40", 48.0, Generation::Ampere, 149.8, 300.0),
    gpu("v100-32gb", "V100 32GB", 32.0, Generation::Volta, 125.0, 300.0),
    gpu("v100-16gb", "V100 16GB", 16.0, Generation::Volta, 125.0, 300.0),
    gpu("teslap40", "Tesla P40", 24.0, Generation::Pascal, 12.0, 250.0),
    gpu("teslap100", "Tesla P100", 16.0, Generation::Pascal, 9.3, 250.0),
    // Workstation
    gpu("a6000", "A6000", 48.0, Generation::Ampere, 38.7, 300.0),
    gpu("a5000", "A5000", 24.0, Generation::Ampere, 27.8, 230.0),
    gpu("a4000", "A4000", 16.0, Generation::Ampere, 19.2, 140.0),
    // GeForce
    gpu("rtx5090", "RTX 5090", 32.0, Generation::Blackwell, 104.8, 575.0),
    gpu("rtx4090", "RTX 4090", 24.0, Generation::AdaLovelace, 82.6, 450.0),
    gpu("rtx4080", "RTX 4080", 16.0, Generation::AdaLovelace, 65.0, 320.0),
    gpu("rtx4060ti", "RTX 4060 Ti", 8.0, Generation::AdaLovelace, 22.1, 165.0),
    gpu("rtx3090ti", "RTX 3090 Ti", 24.0, Generation::Ampere, 40.0, 450.0),
    gpu("rtx3090", "RTX 3090", 24.0, Generation::Ampere, 35.6, 350.0),
    gpu("rtx3080ti", "RTX 3080 Ti", 12.0, Generation::Ampere, 34.1, 350.0),
    gpu("rtx3080", "RTX 3080", 10.0, Generation::Ampere, 29.8, 320.0),
    gpu("gtx1080ti", "GTX 1080 Ti", 11.0, Generation::Pascal, 11.3, 250.0),
    gpu("gtx1070ti", "GTX 1070 Ti", 8.0, Generation::Pascal, 8.1, 180.0),
    gpu("gtx1070", "GTX 1070", 8.0, Generation::Pascal, 6.5, 150.0),
    gpu("gtx1060", "GTX 1060", 6.0, Generation::Pascal, 4.4, 120.0),
    // Apple (unified memory; VRAM is the base configuration)
    gpu("m4", "Apple M4", 16.0, Generation::AppleSilicon, 4.6, 22.0),
    gpu("m3", "Apple M3", 8.0, Generation::AppleSilicon, 4.1, 20.0),
    gpu("m2", "Apple M2", 8.0, Generation::AppleSilicon, 3.6, 20.0),
    gpu("m1", "Apple M1", 8.0, Generation::AppleSilicon, 2.6, 20.0),
    // AMD Radeon
    gpu("rx7900xtx", "Radeon RX 7900 XTX", 24.0, Generation::Rdna3, 61.0, 355.0),
    gpu("rx7900xt", "Radeon RX 7900 XT", 20.0, Generation::Rdna3, 52.0, 315.0),
    gpu("rx7900gre", "Radeon RX 7900 GRE", 16.0, Generation::Rdna3, 46.0, 260.0),
    gpu("rx7800xt", "Radeon RX 7800 XT", 16.0, Generation::Rdna3, 37.0, 263.0),
    gpu("rx7700xt", "Radeon RX 7700 XT", 12.0, Generation::Rdna3, 35.0, 245.0),
];

// ============================================================================
// Catalog
// ============================================================================

/// Fixed mapping from catalog key to [`GpuSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct GpuCatalog {
    specs: HashMap<String, GpuSpec>,
}

impl Default for GpuCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GpuCatalog {
    /// Catalog built from the shipped table.
    pub fn builtin() -> Self {
        let specs = BUILTIN_GPUS
            .iter()
            .map(|g| {
                (
                    g.key.to_string(),
                    GpuSpec {
                        key: g.key.to_string(),
                        name: g.name.to_string(),
                        vram_gb: g.vram_gb,
                        generation: g.generation,
                        tflops: g.tflops,
                        tdp_watts: g.tdp_watts,
                    },
                )
            })
            .collect();
        Self { specs }
    }

    /// Build a catalog from arbitrary specs. Later duplicates replace
    /// earlier ones.
    pub fn from_specs<I>(specs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = GpuSpec>,
    {
        let mut map = HashMap::new();
        for spec in specs {
            spec.check()?;
            map.insert(spec.key.clone(), spec);
        }
        if map.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { specs: map })
    }

    /// Parse a YAML catalog document.
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        Self::from_file_entries(file)
    }

    /// Parse a JSON catalog document.
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::from_file_entries(file)
    }

    /// Load a catalog file, choosing the parser from the extension
    /// (`.json` is JSON, anything else is YAML).
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        debug!(path = %path.display(), gpus = catalog.len(), "loaded GPU catalog");
        Ok(catalog)
    }

    fn from_file_entries(file: CatalogFile) -> Result<Self, CatalogError> {
        Self::from_specs(file.gpus.into_iter().map(|(key, entry)| GpuSpec {
            key,
            name: entry.name,
            vram_gb: entry.vram_gb,
            generation: entry.generation,
            tflops: entry.tflops,
            tdp_watts: entry.tdp_watts,
        }))
    }

    /// Merge `other` into this catalog; entries in `other` win on key clash.
    pub fn extend(&mut self, other: GpuCatalog) {
        self.specs.extend(other.specs);
    }

    pub fn get(&self, key: &str) -> Option<&GpuSpec> {
        self.specs.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs ordered for a picker: by the first word of the display name,
    /// then by VRAM, then by key so ties stay stable.
    pub fn sorted_for_display(&self) -> Vec<&GpuSpec> {
        let mut specs: Vec<&GpuSpec> = self.specs.values().collect();
        specs.sort_by(|a, b| {
            let prefix = |s: &GpuSpec| {
                s.name.split_whitespace().next().unwrap_or("").to_lowercase()
            };
            prefix(a)
                .cmp(&prefix(b))
                .then_with(|| a.vram_gb.total_cmp(&b.vram_gb))
                .then_with(|| a.key.cmp(&b.key))
        });
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_reference_gpus() {
        let catalog = GpuCatalog::builtin();
        let rtx4090 = catalog.get("rtx4090").unwrap();
        assert_eq!(rtx4090.vram_gb, 24.0);
        assert_eq!(rtx4090.tflops, 82.6);
        assert_eq!(rtx4090.tdp_watts, 450.0);
        assert_eq!(rtx4090.generation, Generation::AdaLovelace);

        assert_eq!(catalog.get("h200").unwrap().vram_gb, 141.0);
        assert!(catalog.get("does-not-exist").is_none());
    }

    #[test]
    fn test_builtin_specs_are_valid() {
        let catalog = GpuCatalog::builtin();
        for spec in catalog.sorted_for_display() {
            assert!(spec.check().is_ok(), "{} failed validation", spec.key);
        }
        assert_eq!(catalog.len(), BUILTIN_GPUS.len(), "duplicate builtin keys");
    }

    #[test]
    fn test_yaml_catalog() {
        let yaml = r#"
gpus:
  l40s:
    name: L40S
    vram_gb: 48
    generation: Ada Lovelace
    tflops: 362
    tdp_watts: 350
"#;
        let catalog = GpuCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.len(), 1);
        let spec = catalog.get("l40s").unwrap();
        assert_eq!(spec.key, "l40s");
        assert_eq!(spec.generation, Generation::AdaLovelace);
    }

    #[test]
    fn test_json_catalog() {
        let json = r#"{"gpus": {"mi300x": {"name": "MI300X", "vram_gb": 192,
            "generation": "RDNA3", "tflops": 1307, "tdp_watts": 750}}}"#;
        let catalog = GpuCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.get("mi300x").unwrap().vram_gb, 192.0);
    }

    #[test]
    fn test_rejects_bad_specs() {
        let yaml = r#"
gpus:
  broken:
    name: Broken
    vram_gb: 0
    generation: Ampere
    tflops: 10
    tdp_watts: 100
"#;
        let err = GpuCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSpec { ref key, .. } if key == "broken"));

        assert!(matches!(GpuCatalog::from_yaml_str("gpus: {}"), Err(CatalogError::Empty)));
        assert!(matches!(
            GpuCatalog::from_json_str("not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_extend_overrides() {
        let mut catalog = GpuCatalog::builtin();
        let before = catalog.len();
        let custom = GpuCatalog::from_specs(vec![
            GpuSpec {
                key: "rtx4090".to_string(),
                name: "RTX 4090 (OC)".to_string(),
                vram_gb: 24.0,
                generation: Generation::AdaLovelace,
                tflops: 90.0,
                tdp_watts: 500.0,
            },
            GpuSpec {
                key: "l4".to_string(),
                name: "L4".to_string(),
                vram_gb: 24.0,
                generation: Generation::AdaLovelace,
                tflops: 121.0,
                tdp_watts: 72.0,
            },
        ])
        .unwrap();
        catalog.extend(custom);
        assert_eq!(catalog.len(), before + 1);
        assert_eq!(catalog.get("rtx4090").unwrap().tflops, 90.0);
    }

    #[test]
    fn test_display_order() {
        let catalog = GpuCatalog::builtin();
        let sorted = catalog.sorted_for_display();
        // Grouped by name prefix, ascending VRAM within a group
        let rtx: Vec<f64> = sorted
            .iter()
            .filter(|s| s.name.starts_with("RTX"))
            .map(|s| s.vram_gb)
            .collect();
        assert!(rtx.windows(2).all(|w| w[0] <= w[1]));
        let first_apple = sorted.iter().position(|s| s.name.starts_with("Apple")).unwrap();
        let first_rtx = sorted.iter().position(|s| s.name.starts_with("RTX")).unwrap();
        assert!(first_apple < first_rtx);
    }

    #[test]
    fn test_catalog_accepts_short_generation_names() {
        let yaml = r#"
gpus:
  l4:
    name: L4
    vram_gb: 24
    generation: ada
    tflops: 121
    tdp_watts: 72
  m3max:
    name: Apple M3 Max
    vram_gb: 36
    generation: APPLE
    tflops: 28.4
    tdp_watts: 60
"#;
        let catalog = GpuCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.get("l4").unwrap().generation, Generation::AdaLovelace);
        assert_eq!(catalog.get("m3max").unwrap().generation, Generation::AppleSilicon);

        let bad = yaml.replace("generation: ada", "generation: kepler");
        assert!(matches!(GpuCatalog::from_yaml_str(&bad), Err(CatalogError::Yaml(_))));
    }

    #[test]
    fn test_generation_serializes_as_display_name() {
        let json = serde_json::to_string(&Generation::AdaLovelace).unwrap();
        assert_eq!(json, "\"Ada Lovelace\"");
        let back: Generation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Generation::AdaLovelace);
    }

    #[test]
    fn test_generation_parse() {
        assert_eq!(Generation::from_str("ada"), Some(Generation::AdaLovelace));
        assert_eq!(Generation::from_str("Apple Silicon"), Some(Generation::AppleSilicon));
        assert_eq!(Generation::from_str("kepler"), None);
        assert_eq!(Generation::OLDEST_SUPPORTED.name(), "Pascal");
    }
}
