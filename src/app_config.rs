use crate::model::MatchMode;
use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: MatchMode,
    /// Pairs scoring at or above this value (0–100) are kept as edges.
    pub similarity_threshold: f64,
    /// Global ceiling on pairwise comparisons in near mode.
    pub max_comparisons: usize,
    /// Corpus ceiling; larger corpora are cut to the biggest documents
    /// and the scan is reported as truncated.
    pub max_documents: usize,
    /// Documents read per batch between yield points.
    pub batch_size: usize,
    /// Comparisons between yield points in the scoring loop.
    pub yield_interval: usize,
    /// Documents larger than this are ignored outright.
    pub size_cap_bytes: i64,
    /// Path-prefix ignore rules.
    pub ignore_prefixes: Vec<String>,
    pub semantic: SemanticConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    /// Per-text character budget sent to the model.
    pub truncate_chars: usize,
    /// Length of the rating vector requested from the model.
    pub embed_dimensions: usize,
    /// Embeddings are precomputed for at most this many documents,
    /// capping external-call volume.
    pub embed_document_limit: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Exact,
            similarity_threshold: 80.0,
            max_comparisons: 10_000,
            max_documents: 500,
            batch_size: 20,
            yield_interval: 50,
            size_cap_bytes: 10 * 1024 * 1024,
            ignore_prefixes: Vec::new(),
            semantic: SemanticConfig::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            truncate_chars: 4000,
            embed_dimensions: 10,
            embed_document_limit: 50,
        }
    }
}

pub fn load_configuration() -> Result<ScanConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<ScanConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.mode, MatchMode::Exact);
        assert_eq!(cfg.similarity_threshold, 80.0);
        assert_eq!(cfg.max_documents, 500);
        assert_eq!(cfg.batch_size, 20);
        assert_eq!(cfg.yield_interval, 50);
        assert!(!cfg.semantic.enabled);
        assert_eq!(cfg.semantic.embed_dimensions, 10);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let cfg: ScanConfig = Config::builder()
            .add_source(config::File::from_str(
                "mode = \"near\"\nsimilarity_threshold = 75.0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.mode, MatchMode::Near);
        assert_eq!(cfg.similarity_threshold, 75.0);
        // Everything else keeps its default
        assert_eq!(cfg.max_comparisons, 10_000);
    }
}
