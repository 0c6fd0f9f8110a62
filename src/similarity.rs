use crate::hasher;
use crate::model::SimilarityMethod;
use crate::semantic::SemanticAugmenter;
use ahash::{AHashMap, AHashSet};
use tracing::trace;

/// Within-session cache of already-computed pairwise scores, keyed by the
/// sorted path pair. Entries carry the content fingerprints of the texts
/// they were computed from and go stale the moment either document
/// changes, so a rescan after an in-session edit never serves an
/// outdated score.
#[derive(Debug, Default)]
pub struct PairMemo {
    scores: AHashMap<(String, String), MemoEntry>,
}

#[derive(Debug)]
struct MemoEntry {
    fingerprints: (String, String),
    score: f64,
}

/// Canonical (path-sorted) key for an unordered pair, with the
/// fingerprints swapped to match.
fn keyed(
    path_a: &str,
    fp_a: &str,
    path_b: &str,
    fp_b: &str,
) -> ((String, String), (String, String)) {
    if path_a <= path_b {
        (
            (path_a.to_string(), path_b.to_string()),
            (fp_a.to_string(), fp_b.to_string()),
        )
    } else {
        (
            (path_b.to_string(), path_a.to_string()),
            (fp_b.to_string(), fp_a.to_string()),
        )
    }
}

impl PairMemo {
    pub fn get(&self, path_a: &str, fp_a: &str, path_b: &str, fp_b: &str) -> Option<f64> {
        let (key, fingerprints) = keyed(path_a, fp_a, path_b, fp_b);
        let entry = self.scores.get(&key)?;
        (entry.fingerprints == fingerprints).then_some(entry.score)
    }

    pub fn insert(&mut self, path_a: &str, fp_a: &str, path_b: &str, fp_b: &str, score: f64) {
        let (key, fingerprints) = keyed(path_a, fp_a, path_b, fp_b);
        self.scores.insert(key, MemoEntry { fingerprints, score });
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

/// Length disparity beyond this ratio is conclusive evidence of
/// dissimilarity; the pair scores 0 without further work.
const SIZE_RATIO_LIMIT: f64 = 0.5;

/// Everything the scorer consults besides the two texts: the optional
/// semantic augmenter, precomputed embedding vectors, and the active
/// threshold (semantic results are only decisive at or above it).
pub struct ScorerContext<'a> {
    pub augmenter: Option<&'a SemanticAugmenter<'a>>,
    pub embeddings: &'a AHashMap<String, Vec<f64>>,
    pub threshold: f64,
}

impl<'a> ScorerContext<'a> {
    pub fn lexical_only(threshold: f64, embeddings: &'a AHashMap<String, Vec<f64>>) -> Self {
        Self {
            augmenter: None,
            embeddings,
            threshold,
        }
    }
}

/// Score a document pair in [0, 100], short-circuiting at each step:
/// memo hit, size-ratio filter, semantic judgment, embedding cosine, then
/// the always-available lexical ensemble. Every computed score lands in
/// the memo before returning, tagged with the texts' content fingerprints.
pub fn score_pair(
    memo: &mut PairMemo,
    ctx: &ScorerContext<'_>,
    path_a: &str,
    text_a: &str,
    path_b: &str,
    text_b: &str,
) -> (f64, SimilarityMethod) {
    let fp_a = hasher::content_hash(text_a.as_bytes());
    let fp_b = hasher::content_hash(text_b.as_bytes());
    if let Some(score) = memo.get(path_a, &fp_a, path_b, &fp_b) {
        return (score, SimilarityMethod::Cached);
    }

    let len_a = text_a.chars().count();
    let len_b = text_b.chars().count();
    let max_len = len_a.max(len_b);
    if max_len > 0 {
        let disparity = len_a.abs_diff(len_b) as f64 / max_len as f64;
        if disparity > SIZE_RATIO_LIMIT {
            memo.insert(path_a, &fp_a, path_b, &fp_b, 0.0);
            return (0.0, SimilarityMethod::SizeFiltered);
        }
    }

    if let Some(augmenter) = ctx.augmenter {
        match augmenter.judge_similarity(text_a, text_b) {
            Ok(score) if score >= ctx.threshold => {
                memo.insert(path_a, &fp_a, path_b, &fp_b, score);
                return (score, SimilarityMethod::SemanticScore);
            }
            Ok(score) => {
                trace!(
                    "Semantic judgment {:.1} below threshold for {} / {}",
                    score,
                    path_a,
                    path_b
                );
            }
            Err(err) => {
                // Augmentation is an optimization; fall through to the
                // lexical ensemble.
                trace!("Semantic judgment failed ({}), falling back", err);
            }
        }

        if let (Some(vec_a), Some(vec_b)) =
            (ctx.embeddings.get(path_a), ctx.embeddings.get(path_b))
        {
            let score = vector_cosine_score(vec_a, vec_b);
            if score >= ctx.threshold {
                memo.insert(path_a, &fp_a, path_b, &fp_b, score);
                return (score, SimilarityMethod::SemanticVector);
            }
        }
    }

    let (score, method) = lexical_ensemble(text_a, text_b);
    memo.insert(path_a, &fp_a, path_b, &fp_b, score);
    (score, method)
}

/// Maximum of three independent lexical signals. Favors recall: one
/// strong signal is enough to surface the pair for review.
pub fn lexical_ensemble(text_a: &str, text_b: &str) -> (f64, SimilarityMethod) {
    let tokens_a = tokenize(text_a);
    let tokens_b = tokenize(text_b);

    let jaccard = jaccard_score(&tokens_a, &tokens_b);
    let cosine = cosine_score(&tokens_a, &tokens_b);
    let edit = edit_score(text_a, text_b);

    let mut best = (jaccard, SimilarityMethod::LexicalJaccard);
    if cosine > best.0 {
        best = (cosine, SimilarityMethod::LexicalCosine);
    }
    if edit > best.0 {
        best = (edit, SimilarityMethod::LexicalEdit);
    }
    best
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// |intersection| / |union| over token sets, scaled to 0–100. Two empty
/// token streams are identical and score 100.
pub fn jaccard_score(tokens_a: &[String], tokens_b: &[String]) -> f64 {
    let set_a: AHashSet<&str> = tokens_a.iter().map(|s| s.as_str()).collect();
    let set_b: AHashSet<&str> = tokens_b.iter().map(|s| s.as_str()).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 100.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64 * 100.0
}

/// Term-frequency cosine over the same token streams, scaled to 0–100.
pub fn cosine_score(tokens_a: &[String], tokens_b: &[String]) -> f64 {
    let mut tf_a: AHashMap<&str, f64> = AHashMap::new();
    for token in tokens_a {
        *tf_a.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let mut tf_b: AHashMap<&str, f64> = AHashMap::new();
    for token in tokens_b {
        *tf_b.entry(token.as_str()).or_insert(0.0) += 1.0;
    }

    let dot: f64 = tf_a
        .iter()
        .filter_map(|(token, freq_a)| tf_b.get(token).map(|freq_b| freq_a * freq_b))
        .sum();
    let norm_a: f64 = tf_a.values().map(|f| f * f).sum::<f64>().sqrt();
    let norm_b: f64 = tf_b.values().map(|f| f * f).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b) * 100.0
}

/// Edit comparison window. The DP below is quadratic, so longer texts
/// are compared by prefix only; past this point the signal is an
/// approximation and the other lexical metrics carry the full text.
const EDIT_PREFIX_CHARS: usize = 2000;

/// Normalized edit similarity on the raw (untokenized) text, capped to
/// the first [`EDIT_PREFIX_CHARS`] chars of each side:
/// `100 * (1 - lev / max_len)`. Both empty → 100, one empty → 0.
pub fn edit_score(text_a: &str, text_b: &str) -> f64 {
    let chars_a: Vec<char> = text_a.chars().take(EDIT_PREFIX_CHARS).collect();
    let chars_b: Vec<char> = text_b.chars().take(EDIT_PREFIX_CHARS).collect();
    let max_len = chars_a.len().max(chars_b.len());
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein(&chars_a, &chars_b);
    100.0 * (1.0 - distance as f64 / max_len as f64)
}

/// Two-row Levenshtein distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Cosine between two embedding vectors, scaled to 0–100 and clamped.
pub fn vector_cosine_score(vec_a: &[f64], vec_b: &[f64]) -> f64 {
    if vec_a.len() != vec_b.len() || vec_a.is_empty() {
        return 0.0;
    }
    let dot: f64 = vec_a.iter().zip(vec_b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = vec_a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = vec_b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::semantic::LlmClient;
    use std::cell::Cell;

    fn no_embeddings() -> AHashMap<String, Vec<f64>> {
        AHashMap::new()
    }

    #[test]
    fn test_jaccard_basic() {
        let a = tokenize("alpha beta gamma delta");
        let b = tokenize("alpha beta gamma epsilon");
        // intersection 3, union 5
        assert!((jaccard_score(&a, &b) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_identical_and_disjoint() {
        let a = tokenize("one two three");
        assert_eq!(jaccard_score(&a, &a), 100.0);
        let b = tokenize("four five six");
        assert_eq!(jaccard_score(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_identical() {
        let a = tokenize("repeat repeat token");
        assert!((cosine_score(&a, &a) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_edit_score_edge_cases() {
        assert_eq!(edit_score("", ""), 100.0);
        assert_eq!(edit_score("", "abc"), 0.0);
        assert_eq!(edit_score("abc", ""), 0.0);
        // one substitution in four chars
        assert!((edit_score("abcd", "abcx") - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_edit_score_compares_long_texts_by_prefix() {
        let a = "x".repeat(5000);
        let mut b = "x".repeat(4000);
        b.push_str(&"y".repeat(1000));
        // Divergence beyond the comparison window is invisible to this
        // signal
        assert_eq!(edit_score(&a, &b), 100.0);
        // Divergence inside the window is not
        let c = format!("z{}", "x".repeat(4999));
        assert!(edit_score(&a, &c) < 100.0);
    }

    #[test]
    fn test_score_symmetry() {
        let embeddings = no_embeddings();
        let ctx = ScorerContext::lexical_only(80.0, &embeddings);
        let text_a = "the quick brown fox jumps";
        let text_b = "the quick brown fox sleeps";

        let mut memo = PairMemo::default();
        let (forward, _) = score_pair(&mut memo, &ctx, "a", text_a, "b", text_b);
        let mut memo = PairMemo::default();
        let (backward, _) = score_pair(&mut memo, &ctx, "b", text_b, "a", text_a);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_size_filter_short_circuits() {
        let embeddings = no_embeddings();
        let ctx = ScorerContext::lexical_only(80.0, &embeddings);
        let mut memo = PairMemo::default();

        let short = "tiny";
        let long = "this text is far more than double the other's length";
        let (score, method) = score_pair(&mut memo, &ctx, "a", short, "b", long);
        assert_eq!(score, 0.0);
        assert_eq!(method, SimilarityMethod::SizeFiltered);
        // The zero is memoized too
        let fp_short = hasher::content_hash(short.as_bytes());
        let fp_long = hasher::content_hash(long.as_bytes());
        assert_eq!(memo.get("b", &fp_long, "a", &fp_short), Some(0.0));
    }

    #[test]
    fn test_memo_invalidated_when_text_changes() {
        let embeddings = no_embeddings();
        let ctx = ScorerContext::lexical_only(80.0, &embeddings);
        let mut memo = PairMemo::default();

        let text = "shared words in both";
        let (first, _) = score_pair(&mut memo, &ctx, "a", text, "b", text);
        assert_eq!(first, 100.0);

        // Same paths, new content on one side: the stale entry must not
        // be served back.
        let (second, method) =
            score_pair(&mut memo, &ctx, "a", text, "b", "unrelated topic entirely now");
        assert_ne!(method, SimilarityMethod::Cached);
        assert!(second < 80.0);
        // The fresh score replaced the stale entry
        assert_eq!(memo.len(), 1);
    }

    struct CountingClient {
        calls: Cell<usize>,
        reply: String,
    }

    impl LlmClient for CountingClient {
        fn send(&self, _system: &str, _user: &str) -> Result<String, Error> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.reply.clone())
        }
    }

    struct FailingClient;

    impl LlmClient for FailingClient {
        fn send(&self, _system: &str, _user: &str) -> Result<String, Error> {
            Err(Error::Llm("connection refused".to_string()))
        }
    }

    #[test]
    fn test_size_filter_skips_semantic_path() {
        let client = CountingClient {
            calls: Cell::new(0),
            reply: "95".to_string(),
        };
        let augmenter = SemanticAugmenter::new(&client, 4000, 10);
        let embeddings = no_embeddings();
        let ctx = ScorerContext {
            augmenter: Some(&augmenter),
            embeddings: &embeddings,
            threshold: 80.0,
        };

        let mut memo = PairMemo::default();
        let long = "x".repeat(100);
        let (score, method) = score_pair(&mut memo, &ctx, "a", "short one", "b", &long);
        assert_eq!(score, 0.0);
        assert_eq!(method, SimilarityMethod::SizeFiltered);
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn test_semantic_score_wins_when_above_threshold() {
        let client = CountingClient {
            calls: Cell::new(0),
            reply: "The documents rate 92 out of 100.".to_string(),
        };
        let augmenter = SemanticAugmenter::new(&client, 4000, 10);
        let embeddings = no_embeddings();
        let ctx = ScorerContext {
            augmenter: Some(&augmenter),
            embeddings: &embeddings,
            threshold: 80.0,
        };

        let mut memo = PairMemo::default();
        let (score, method) =
            score_pair(&mut memo, &ctx, "a", "same length text", "b", "same length also");
        assert_eq!(score, 92.0);
        assert_eq!(method, SimilarityMethod::SemanticScore);
    }

    #[test]
    fn test_embedding_cosine_wins_when_judgment_is_low() {
        let client = CountingClient {
            calls: Cell::new(0),
            reply: "10".to_string(),
        };
        let augmenter = SemanticAugmenter::new(&client, 4000, 3);
        let mut embeddings = AHashMap::new();
        embeddings.insert("a".to_string(), vec![1.0, 2.0, 3.0]);
        embeddings.insert("b".to_string(), vec![1.0, 2.0, 3.0]);
        let ctx = ScorerContext {
            augmenter: Some(&augmenter),
            embeddings: &embeddings,
            threshold: 80.0,
        };

        let mut memo = PairMemo::default();
        let (score, method) = score_pair(
            &mut memo,
            &ctx,
            "a",
            "nothing in common here",
            "b",
            "totally different words",
        );
        // The judgment was consulted but came back below threshold; the
        // identical precomputed vectors decide the pair instead.
        assert_eq!(client.calls.get(), 1);
        assert_eq!(method, SimilarityMethod::SemanticVector);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_semantic_failure_falls_back_to_lexical() {
        let client = FailingClient;
        let augmenter = SemanticAugmenter::new(&client, 4000, 10);
        let embeddings = no_embeddings();
        let ctx = ScorerContext {
            augmenter: Some(&augmenter),
            embeddings: &embeddings,
            threshold: 50.0,
        };

        let mut memo = PairMemo::default();
        let text = "identical text either side";
        let (score, method) = score_pair(&mut memo, &ctx, "a", text, "b", text);
        assert_eq!(score, 100.0);
        assert!(matches!(
            method,
            SimilarityMethod::LexicalJaccard
                | SimilarityMethod::LexicalCosine
                | SimilarityMethod::LexicalEdit
        ));
    }

    #[test]
    fn test_memo_hit_returns_cached() {
        let embeddings = no_embeddings();
        let ctx = ScorerContext::lexical_only(80.0, &embeddings);
        let mut memo = PairMemo::default();

        let (first, _) = score_pair(&mut memo, &ctx, "a", "words here", "b", "words there");
        let (second, method) = score_pair(&mut memo, &ctx, "a", "words here", "b", "words there");
        assert_eq!(first, second);
        assert_eq!(method, SimilarityMethod::Cached);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_vector_cosine() {
        assert!((vector_cosine_score(&[1.0, 0.0], &[1.0, 0.0]) - 100.0).abs() < 1e-9);
        assert_eq!(vector_cosine_score(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(vector_cosine_score(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
