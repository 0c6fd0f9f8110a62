use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque handle to a document in the store. The engine only ever reads
/// these fields; ownership of the underlying object stays with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Stable unique key for the document.
    pub path: String,
    pub size: i64,
    /// Integer timestamp (seconds); only compared for equality.
    pub modified: i64,
}

/// Persisted cache entry for one document.
///
/// Valid for reuse only while `size` and `modified` both equal the live
/// document's values; any mismatch forces recomputation and overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub path: String,
    pub size: i64,
    pub modified: i64,
    pub content_hash: String,
    /// Hash of whitespace/markup-normalized text. Only populated in
    /// canonical mode, independent of `content_hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_hash: Option<String>,
}

/// Which notion of "duplicate" a scan applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Byte-identical content.
    Exact,
    /// Identical after whitespace/markup normalization.
    Canonical,
    /// Similarity score at or above the configured threshold.
    Near,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Canonical => "canonical",
            MatchMode::Near => "near",
        }
    }
}

/// Which scoring path produced a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMethod {
    LexicalJaccard,
    LexicalCosine,
    LexicalEdit,
    SemanticScore,
    SemanticVector,
    /// Short-circuited at 0 by the size-ratio filter.
    SizeFiltered,
    /// Served from the in-session pair memo.
    Cached,
}

impl SimilarityMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMethod::LexicalJaccard => "lexical-jaccard",
            SimilarityMethod::LexicalCosine => "lexical-cosine",
            SimilarityMethod::LexicalEdit => "lexical-edit",
            SimilarityMethod::SemanticScore => "semantic-score",
            SimilarityMethod::SemanticVector => "semantic-vector",
            SimilarityMethod::SizeFiltered => "size-filtered",
            SimilarityMethod::Cached => "cached",
        }
    }
}

/// A scored pair that met the active threshold.
#[derive(Debug, Clone)]
pub struct SimilarityEdge {
    pub path_a: String,
    pub path_b: String,
    /// 0–100.
    pub score: f64,
    pub method: SimilarityMethod,
}

/// A group of duplicate (or near-duplicate) documents. Always ≥2 members.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Content/canonical hash for exact modes, `near-<n>` for clusters.
    pub group_key: String,
    pub members: Vec<DocumentRef>,
    pub match_type: MatchMode,
    /// Near mode only: mean score of the threshold-passing edges whose
    /// endpoints both lie in this group. An audit of why the members were
    /// grouped, not a guarantee every pair was compared.
    pub similarity_score: Option<f64>,
}

/// Everything a scan hands back to the caller. Scan-scoped; rebuilt on
/// every invocation.
#[derive(Debug)]
pub struct ScanOutcome {
    pub groups: Vec<DuplicateGroup>,
    /// True when the corpus exceeded the document ceiling and only the
    /// largest documents were considered.
    pub truncated: bool,
    pub stats: ScanStats,
}

#[derive(Debug, Default)]
pub struct ScanStats {
    pub scan_duration: Duration,
    pub documents_listed: usize,
    pub documents_considered: usize,
    pub documents_skipped: usize,
    pub cache_hits: usize,
    pub comparisons: usize,
}

/// Point-in-time counters exposed to the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    pub cache_size: usize,
    pub total_documents: usize,
    pub memo_size: usize,
}
