//! Progress reporting and cooperative cancellation.
//!
//! A job declares its work as a table of weighted [`Stage`]s. The
//! [`ProgressTracker`] turns "stage *i*, *k* items done" into one global
//! percentage, forwards it to the caller's [`JobProgressCallback`], and owns
//! the [`CancellationToken`] the job polls between units of work.
//!
//! Cancellation is never pre-emptive: a page that has started runs to
//! completion, and the job notices the flag at its next checkpoint.
//!
//! # Example
//!
//! ```rust
//! use pdfops::CancellationToken;
//! use pdfops::progress::{ProgressTracker, Stage};
//!
//! let tracker = ProgressTracker::new(
//!     vec![Stage::new("load", 10.0), Stage::with_items("pages", 90.0, 4)],
//!     None,
//!     CancellationToken::new(),
//! );
//! tracker.advance(1, 2);
//! assert_eq!(tracker.percent(), 55.0);
//! ```

use crate::error::PdfOpsError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Called by the pipeline as a job moves through its stages and pages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait JobProgressCallback: Send + Sync {
    /// Called once after validation, before the first stage.
    ///
    /// # Arguments
    /// * `operation`: operation name, e.g. `"split"`
    /// * `total_units`: pages or items the job will process
    fn on_job_start(&self, operation: &str, total_units: usize) {
        let _ = (operation, total_units);
    }

    /// Called whenever the global percentage moves forward.
    ///
    /// # Arguments
    /// * `percent`: 0.0–100.0, never decreasing within a run
    /// * `stage`: name of the stage currently running
    fn on_progress(&self, percent: f32, stage: &str) {
        let _ = (percent, stage);
    }

    /// Called before a page is processed.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number in the source document
    /// * `total_pages`: pages the job will process
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page is processed successfully.
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page fails but the job continues (OCR only).
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once when the job produced its outputs.
    fn on_job_complete(&self, outputs: usize) {
        let _ = outputs;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::JobConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

/// Shared flag the caller sets to stop a running job.
///
/// Clones share the flag, so the caller keeps one clone and hands another to
/// the job.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One weighted unit of pipeline work.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: &'static str,
    /// Relative share of total progress. Weights are normalised, so they
    /// need not sum to 100.
    pub weight: f32,
    /// Items the stage iterates over; 1 for a single-step stage.
    pub items: usize,
}

impl Stage {
    /// A single-step stage.
    pub fn new(name: &'static str, weight: f32) -> Self {
        Self {
            name,
            weight,
            items: 1,
        }
    }

    /// An iterative stage over `items` pages or files.
    pub fn with_items(name: &'static str, weight: f32, items: usize) -> Self {
        Self {
            name,
            weight,
            items,
        }
    }
}

/// Global percentage for `items_done` of `stages[stage_index]`.
///
/// Weights are normalised to 100; the result is clamped to `[0, 100]`. An
/// out-of-range stage index counts as "all stages done".
pub fn stage_percent(stages: &[Stage], stage_index: usize, items_done: usize) -> f32 {
    let total: f32 = stages.iter().map(|s| s.weight.max(0.0)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let Some(stage) = stages.get(stage_index) else {
        return 100.0;
    };
    let before: f32 = stages[..stage_index]
        .iter()
        .map(|s| s.weight.max(0.0))
        .sum();
    let fraction = if stage.items == 0 {
        1.0
    } else {
        (items_done.min(stage.items) as f32) / stage.items as f32
    };
    let percent = (before + stage.weight.max(0.0) * fraction) * 100.0 / total;
    percent.clamp(0.0, 100.0)
}

/// Coordinates weighted progress and cancellation for one job run.
///
/// Created fresh per run; nothing carries over between runs.
pub struct ProgressTracker {
    stages: Vec<Stage>,
    current: Mutex<f32>,
    callback: Option<ProgressCallback>,
    cancellation: CancellationToken,
}

impl ProgressTracker {
    pub fn new(
        stages: Vec<Stage>,
        callback: Option<ProgressCallback>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            stages,
            current: Mutex::new(0.0),
            callback,
            cancellation,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Record `items_done` items of stage `stage_index` and return the global
    /// percentage. The reported value never decreases.
    pub fn advance(&self, stage_index: usize, items_done: usize) -> f32 {
        let candidate = stage_percent(&self.stages, stage_index, items_done);
        let (value, moved) = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if candidate > *current {
                *current = candidate;
                (candidate, true)
            } else {
                (*current, false)
            }
        };
        if moved {
            if let Some(ref cb) = self.callback {
                let name = self
                    .stages
                    .get(stage_index)
                    .map(|s| s.name)
                    .unwrap_or("done");
                cb.on_progress(value, name);
            }
        }
        value
    }

    /// Mark stage `stage_index` fully complete.
    pub fn complete_stage(&self, stage_index: usize) -> f32 {
        let items = self.stages.get(stage_index).map(|s| s.items).unwrap_or(0);
        self.advance(stage_index, items)
    }

    /// Jump to 100 %.
    pub fn finish(&self) -> f32 {
        self.advance(self.stages.len(), 0)
    }

    /// Current global percentage.
    pub fn percent(&self) -> f32 {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancellation checkpoint: `Err(Cancelled)` once the caller has asked
    /// the job to stop.
    pub fn checkpoint(&self) -> Result<(), PdfOpsError> {
        if self.cancellation.is_cancelled() {
            Err(PdfOpsError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn callback(&self) -> Option<&ProgressCallback> {
        self.callback.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Recording {
        values: Mutex<Vec<f32>>,
        pages: AtomicUsize,
    }

    impl JobProgressCallback for Recording {
        fn on_progress(&self, percent: f32, _stage: &str) {
            self.values.lock().unwrap().push(percent);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stages() -> Vec<Stage> {
        vec![
            Stage::new("load", 10.0),
            Stage::with_items("pages", 80.0, 4),
            Stage::new("save", 10.0),
        ]
    }

    #[test]
    fn percent_is_previous_weight_plus_fraction() {
        let s = stages();
        assert_eq!(stage_percent(&s, 0, 0), 0.0);
        assert_eq!(stage_percent(&s, 0, 1), 10.0);
        assert_eq!(stage_percent(&s, 1, 2), 50.0);
        assert_eq!(stage_percent(&s, 2, 1), 100.0);
        assert_eq!(stage_percent(&s, 9, 0), 100.0);
    }

    #[test]
    fn weights_are_normalised() {
        let s = vec![Stage::new("a", 1.0), Stage::new("b", 3.0)];
        assert_eq!(stage_percent(&s, 0, 1), 25.0);
        assert_eq!(stage_percent(&s, 1, 1), 100.0);
    }

    #[test]
    fn items_done_beyond_count_is_clamped() {
        let s = stages();
        assert_eq!(stage_percent(&s, 1, 40), 90.0);
    }

    #[test]
    fn tracker_never_decreases() {
        let tracker = ProgressTracker::new(stages(), None, CancellationToken::new());
        let mut last = 0.0;
        for (stage, items) in [(1, 3), (1, 1), (0, 1), (2, 0), (1, 4), (2, 1), (0, 0)] {
            let v = tracker.advance(stage, items);
            assert!(v >= last, "{v} < {last}");
            assert!(v <= 100.0);
            last = v;
        }
        assert_eq!(tracker.percent(), 100.0);
    }

    #[test]
    fn callback_sees_only_forward_moves() {
        let rec = Arc::new(Recording {
            values: Mutex::new(Vec::new()),
            pages: AtomicUsize::new(0),
        });
        let tracker = ProgressTracker::new(
            stages(),
            Some(rec.clone() as ProgressCallback),
            CancellationToken::new(),
        );
        tracker.complete_stage(0);
        tracker.advance(1, 1);
        tracker.advance(1, 1);
        tracker.advance(0, 0);
        tracker.finish();
        assert_eq!(*rec.values.lock().unwrap(), vec![10.0, 30.0, 100.0]);
    }

    #[test]
    fn checkpoint_reports_cancellation() {
        let token = CancellationToken::new();
        let tracker = ProgressTracker::new(stages(), None, token.clone());
        assert!(tracker.checkpoint().is_ok());
        token.cancel();
        assert!(tracker.is_cancelled());
        assert!(matches!(tracker.checkpoint(), Err(PdfOpsError::Cancelled)));
    }

    #[test]
    fn empty_or_zero_weight_tables() {
        assert_eq!(stage_percent(&[], 0, 0), 0.0);
        let s = vec![Stage::new("a", 0.0)];
        assert_eq!(stage_percent(&s, 0, 1), 0.0);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: Arc<dyn JobProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_job_start("split", 3);
        cb.on_progress(12.5, "load");
        cb.on_page_start(1, 3);
        cb.on_page_complete(1, 3);
        cb.on_page_error(2, 3, "boom");
        cb.on_job_complete(2);
    }
}
