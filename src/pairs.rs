use crate::model::DocumentRef;
use ahash::AHashSet;
use tracing::{debug, warn};

/// Candidate pairs for near-duplicate comparison, as indices into the
/// caller's document slice.
#[derive(Debug)]
pub struct CandidatePairs {
    pub pairs: Vec<(usize, usize)>,
    /// True when the corpus exceeded the document ceiling and only the
    /// largest documents were considered.
    pub truncated: bool,
}

/// Bound the O(n²) comparison space.
///
/// Small corpora get every unordered pair. Above `max_comparisons`, each
/// document (visited in descending size order) contributes at most
/// `max_comparisons / n` candidates, ranked by absolute size difference —
/// near-duplicates are overwhelmingly similar in byte length. This is a
/// documented sampling heuristic that trades recall for bounded cost.
///
/// Corpora above `max_documents` are first cut to the largest documents
/// and the result is flagged truncated.
pub fn generate(
    docs: &[DocumentRef],
    max_comparisons: usize,
    max_documents: usize,
) -> CandidatePairs {
    // Descending size; ties broken by index for determinism.
    let mut order: Vec<usize> = (0..docs.len()).collect();
    order.sort_by(|&a, &b| docs[b].size.cmp(&docs[a].size).then(a.cmp(&b)));

    let truncated = order.len() > max_documents;
    if truncated {
        warn!(
            "Corpus of {} documents exceeds ceiling of {}, comparing only the largest",
            order.len(),
            max_documents
        );
        order.truncate(max_documents);
    }

    let n = order.len();
    if n < 2 {
        return CandidatePairs {
            pairs: Vec::new(),
            truncated,
        };
    }

    let total_pairs = n * (n - 1) / 2;
    if total_pairs <= max_comparisons {
        let mut pairs = Vec::with_capacity(total_pairs);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push(ordered(order[i], order[j]));
            }
        }
        return CandidatePairs { pairs, truncated };
    }

    let per_document = (max_comparisons / n).max(1);
    debug!(
        "Sampling candidate pairs: {} documents, {} per document, {} max",
        n, per_document, max_comparisons
    );

    let mut emitted: AHashSet<(usize, usize)> = AHashSet::new();
    let mut pairs = Vec::with_capacity(max_comparisons);

    'outer: for (pos, &i) in order.iter().enumerate() {
        let mut candidates: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|&(other_pos, &j)| other_pos != pos && !emitted.contains(&ordered(i, j)))
            .map(|(_, &j)| j)
            .collect();
        candidates.sort_by_key(|&j| docs[i].size.abs_diff(docs[j].size));

        for j in candidates.into_iter().take(per_document) {
            let pair = ordered(i, j);
            if emitted.insert(pair) {
                pairs.push(pair);
                if pairs.len() >= max_comparisons {
                    break 'outer;
                }
            }
        }
    }

    CandidatePairs { pairs, truncated }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
