/// Trait for reporting scan progress to the presentation layer.
///
/// The CLI implements this with indicatif progress bars; embedders can
/// bridge it to their own notification mechanism. All methods default to
/// no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    /// Exact/canonical phase: documents hashed so far.
    fn on_hash_progress(&self, _processed: usize, _total: usize) {}
    /// Near phase: candidate documents read so far.
    fn on_read_progress(&self, _processed: usize, _total: usize) {}
    /// Near phase: pairwise comparisons completed so far.
    fn on_compare_progress(&self, _compared: usize, _total: usize) {}
    /// The corpus exceeded the document ceiling; only `kept` of `total`
    /// documents are being compared.
    fn on_truncated(&self, _kept: usize, _total: usize) {}
    fn on_scan_complete(&self, _groups: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
