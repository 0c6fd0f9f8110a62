use crate::app_config::ScanConfig;
use crate::cluster;
use crate::error::Error;
use crate::hasher;
use crate::model::{
    DocumentRef, DuplicateGroup, EngineStats, FileRecord, MatchMode, ScanOutcome, ScanStats,
    SimilarityEdge,
};
use crate::pairs;
use crate::progress::ProgressReporter;
use crate::semantic::{neutral_embedding, LlmClient, SemanticAugmenter};
use crate::session::ScanSession;
use crate::similarity::{score_pair, ScorerContext};
use crate::store::{should_ignore, DocumentStore};
use ahash::AHashMap;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Duplicate-detection engine. Runs the full pipeline:
/// 1. Enumerate and filter documents (ignore prefixes, size cap)
/// 2. Exact/canonical: incremental hashing through the metadata cache,
///    group by equal key
/// 3. Near: bounded candidate pairing, multi-method scoring, disjoint-set
///    clustering of threshold-passing edges
///
/// Single-threaded cooperative execution: document reads happen in
/// bounded batches and long loops yield periodically so the host gets
/// scheduling opportunities. A scan runs to completion or failure; there
/// is no cancellation.
pub struct ScanEngine<'a> {
    store: &'a dyn DocumentStore,
    llm: Option<&'a dyn LlmClient>,
    config: ScanConfig,
}

impl<'a> ScanEngine<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: ScanConfig) -> Self {
        Self {
            store,
            llm: None,
            config,
        }
    }

    /// Attach the language-model boundary. The semantic path is only
    /// taken when this is set and `semantic.enabled` is on.
    pub fn with_llm_client(mut self, client: &'a dyn LlmClient) -> Self {
        self.llm = Some(client);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run one scan. Only a failure to enumerate the document store is
    /// fatal; per-document errors are logged and the document excluded.
    pub fn scan(
        &self,
        session: &mut ScanSession,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanOutcome, Error> {
        let start = Instant::now();
        reporter.on_scan_start();

        let all_docs = self.store.list_documents()?;
        let docs: Vec<DocumentRef> = all_docs
            .iter()
            .filter(|doc| {
                !should_ignore(doc, &self.config.ignore_prefixes, self.config.size_cap_bytes)
            })
            .cloned()
            .collect();

        let mut stats = ScanStats {
            documents_listed: all_docs.len(),
            documents_considered: docs.len(),
            ..ScanStats::default()
        };
        info!(
            "Scanning {} documents ({} listed) in {} mode",
            docs.len(),
            all_docs.len(),
            self.config.mode.as_str()
        );

        let (groups, truncated) = match self.config.mode {
            MatchMode::Exact => (self.scan_by_hash(&docs, false, session, reporter, &mut stats), false),
            MatchMode::Canonical => {
                (self.scan_by_hash(&docs, true, session, reporter, &mut stats), false)
            }
            MatchMode::Near => self.scan_near(&docs, session, reporter, &mut stats),
        };

        stats.scan_duration = start.elapsed();
        info!(
            "Scan complete: {} groups in {:.2}s ({} comparisons, {} cache hits)",
            groups.len(),
            stats.scan_duration.as_secs_f64(),
            stats.comparisons,
            stats.cache_hits,
        );
        reporter.on_scan_complete(groups.len(), stats.scan_duration.as_secs_f64());

        Ok(ScanOutcome {
            groups,
            truncated,
            stats,
        })
    }

    /// Counters for the presentation layer.
    pub fn stats(&self, session: &ScanSession) -> Result<EngineStats, Error> {
        Ok(EngineStats {
            cache_size: session.cache.len(),
            total_documents: self.store.list_documents()?.len(),
            memo_size: session.memo_size(),
        })
    }

    // ── Exact / canonical path ───────────────────────────────────

    fn scan_by_hash(
        &self,
        docs: &[DocumentRef],
        canonical: bool,
        session: &mut ScanSession,
        reporter: &dyn ProgressReporter,
        stats: &mut ScanStats,
    ) -> Vec<DuplicateGroup> {
        let mut keys: Vec<Option<String>> = Vec::with_capacity(docs.len());

        for batch in docs.chunks(self.config.batch_size.max(1)) {
            for doc in batch {
                keys.push(self.group_key(doc, canonical, session, stats));
            }
            reporter.on_hash_progress(keys.len(), docs.len());
            // Suspension point between batches: bounds in-flight I/O and
            // lets host-driven event processing interleave.
            thread::yield_now();
        }

        // Partition into equivalence classes by key, first-seen order.
        let mut class_order: Vec<String> = Vec::new();
        let mut classes: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (idx, key) in keys.iter().enumerate() {
            let Some(key) = key else { continue };
            let members = classes.entry(key.clone()).or_insert_with(|| {
                class_order.push(key.clone());
                Vec::new()
            });
            members.push(idx);
        }

        let match_type = if canonical {
            MatchMode::Canonical
        } else {
            MatchMode::Exact
        };

        class_order
            .into_iter()
            .filter_map(|key| {
                let members = classes.remove(&key)?;
                if members.len() < 2 {
                    return None;
                }
                Some(DuplicateGroup {
                    group_key: key,
                    members: members.iter().map(|&i| docs[i].clone()).collect(),
                    match_type,
                    similarity_score: None,
                })
            })
            .collect()
    }

    /// Resolve the grouping key for one document: cached hash when the
    /// stored size/modified still match, otherwise recompute and
    /// overwrite. Returns `None` when the document could not be processed
    /// (it is then excluded from every group this scan).
    fn group_key(
        &self,
        doc: &DocumentRef,
        canonical: bool,
        session: &mut ScanSession,
        stats: &mut ScanStats,
    ) -> Option<String> {
        if let Some(record) = session.cache.get_valid(doc) {
            stats.cache_hits += 1;
            if !canonical {
                return Some(record.content_hash.clone());
            }
            if let Some(normalized) = &record.normalized_hash {
                return Some(normalized.clone());
            }
            // Cached content hash predates canonical mode; backfill the
            // normalized hash without re-reading bytes.
            let mut record = record.clone();
            return match self.store.read_text(&doc.path) {
                Ok(text) => {
                    let normalized = hasher::normalized_hash(&text);
                    record.normalized_hash = Some(normalized.clone());
                    session.cache.set(&doc.path, record);
                    Some(normalized)
                }
                Err(err) => {
                    warn!(
                        "Text read failed for '{}' ({}), using content hash as canonical key",
                        doc.path, err
                    );
                    Some(record.content_hash)
                }
            };
        }

        let bytes = match self.store.read_bytes(&doc.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Skipping unreadable document '{}': {}", doc.path, err);
                stats.documents_skipped += 1;
                return None;
            }
        };
        let content_hash = hasher::content_hash(&bytes);

        let mut record = FileRecord {
            path: doc.path.clone(),
            size: doc.size,
            modified: doc.modified,
            content_hash: content_hash.clone(),
            normalized_hash: None,
        };

        let key = if canonical {
            match self.store.read_text(&doc.path) {
                Ok(text) => {
                    let normalized = hasher::normalized_hash(&text);
                    record.normalized_hash = Some(normalized.clone());
                    normalized
                }
                Err(err) => {
                    warn!(
                        "Text read failed for '{}' ({}), using content hash as canonical key",
                        doc.path, err
                    );
                    content_hash.clone()
                }
            }
        } else {
            content_hash.clone()
        };

        session.cache.set(&doc.path, record);
        Some(key)
    }

    // ── Near path ────────────────────────────────────────────────

    fn scan_near(
        &self,
        docs: &[DocumentRef],
        session: &mut ScanSession,
        reporter: &dyn ProgressReporter,
        stats: &mut ScanStats,
    ) -> (Vec<DuplicateGroup>, bool) {
        let candidates = pairs::generate(docs, self.config.max_comparisons, self.config.max_documents);
        if candidates.truncated {
            reporter.on_truncated(self.config.max_documents, docs.len());
        }

        // Read every candidate document, batched with a yield point after
        // each batch. Unreadable documents drop out of all pairs.
        let mut needed: Vec<usize> = candidates
            .pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();
        needed.sort_unstable();
        needed.dedup();

        let mut texts: AHashMap<usize, String> = AHashMap::with_capacity(needed.len());
        for batch in needed.chunks(self.config.batch_size.max(1)) {
            for &idx in batch {
                match self.store.read_text(&docs[idx].path) {
                    Ok(text) => {
                        texts.insert(idx, text);
                    }
                    Err(err) => {
                        warn!("Skipping unreadable document '{}': {}", docs[idx].path, err);
                        stats.documents_skipped += 1;
                    }
                }
            }
            reporter.on_read_progress(texts.len() + stats.documents_skipped, needed.len());
            thread::yield_now();
        }

        let embeddings = self.precompute_embeddings(docs, &needed, &texts);
        let augmenter = self
            .llm
            .filter(|_| self.config.semantic.enabled)
            .map(|client| {
                SemanticAugmenter::new(
                    client,
                    self.config.semantic.truncate_chars,
                    self.config.semantic.embed_dimensions,
                )
            });
        let ctx = ScorerContext {
            augmenter: augmenter.as_ref(),
            embeddings: &embeddings,
            threshold: self.config.similarity_threshold,
        };

        let total_pairs = candidates.pairs.len();
        let mut edges: Vec<SimilarityEdge> = Vec::new();
        for &(a, b) in &candidates.pairs {
            let (Some(text_a), Some(text_b)) = (texts.get(&a), texts.get(&b)) else {
                continue;
            };
            let (score, method) = score_pair(
                &mut session.memo,
                &ctx,
                &docs[a].path,
                text_a,
                &docs[b].path,
                text_b,
            );
            stats.comparisons += 1;
            if stats.comparisons % self.config.yield_interval.max(1) == 0 {
                reporter.on_compare_progress(stats.comparisons, total_pairs);
                thread::yield_now();
            }

            if score >= self.config.similarity_threshold {
                edges.push(SimilarityEdge {
                    path_a: docs[a].path.clone(),
                    path_b: docs[b].path.clone(),
                    score,
                    method,
                });
            }
        }
        debug!(
            "{} of {} compared pairs met threshold {}",
            edges.len(),
            stats.comparisons,
            self.config.similarity_threshold
        );

        let path_index: AHashMap<String, usize> = docs
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.path.clone(), i))
            .collect();
        let clusters = cluster::build_clusters(docs.len(), &edges, &path_index);

        let groups = clusters
            .into_iter()
            .enumerate()
            .map(|(seq, cluster)| DuplicateGroup {
                group_key: format!("near-{}", seq + 1),
                members: cluster.members.iter().map(|&i| docs[i].clone()).collect(),
                match_type: MatchMode::Near,
                similarity_score: Some(cluster.mean_score),
            })
            .collect();

        (groups, candidates.truncated)
    }

    /// Precompute embedding vectors for the first N candidate documents,
    /// capping external-call volume. A failed embedding degrades to the
    /// all-midpoint vector; embeddings are an optimization, not a
    /// correctness requirement.
    fn precompute_embeddings(
        &self,
        docs: &[DocumentRef],
        needed: &[usize],
        texts: &AHashMap<usize, String>,
    ) -> AHashMap<String, Vec<f64>> {
        let mut embeddings: AHashMap<String, Vec<f64>> = AHashMap::new();
        if !self.config.semantic.enabled || self.config.semantic.embed_document_limit == 0 {
            return embeddings;
        }
        let Some(client) = self.llm else {
            return embeddings;
        };
        let augmenter = SemanticAugmenter::new(
            client,
            self.config.semantic.truncate_chars,
            self.config.semantic.embed_dimensions,
        );

        for &idx in needed.iter().take(self.config.semantic.embed_document_limit) {
            let Some(text) = texts.get(&idx) else { continue };
            let vector = match augmenter.embed(text) {
                Ok(vector) => vector,
                Err(err) => {
                    warn!("Embedding failed for '{}': {}", docs[idx].path, err);
                    neutral_embedding(self.config.semantic.embed_dimensions)
                }
            };
            embeddings.insert(docs[idx].path.clone(), vector);
        }
        debug!("Precomputed {} embedding vectors", embeddings.len());
        embeddings
    }
}
