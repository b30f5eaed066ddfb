//! One module per document operation.
//!
//! Every operation follows the same shape:
//!
//! 1. validate its options (no I/O),
//! 2. build a stage table and a [`ProgressTracker`],
//! 3. load the input and resolve the page selection under its policy,
//! 4. loop over pages or items, polling cancellation before each one,
//! 5. save and return the outputs.
//!
//! [`crate::job::Operation`] dispatches to the `run` function of each module.

pub mod annotations;
pub mod forms;
pub mod images;
pub mod ocr;
pub mod recolor;
pub mod split;
pub mod tint;

use crate::config::JobConfig;
use crate::document::PdfDocument;
use crate::error::PdfOpsError;
use crate::output::{JobOutput, JobStats, OutputFile};
use crate::pipeline::input::InputFile;
use crate::progress::{JobProgressCallback, ProgressTracker, Stage};
use tracing::debug;

/// What every operation needs from the job that runs it.
pub(crate) struct OpContext<'a> {
    pub config: &'a JobConfig,
    pub operation: &'static str,
}

impl<'a> OpContext<'a> {
    pub fn new(config: &'a JobConfig, operation: &'static str) -> Self {
        Self { config, operation }
    }

    pub fn tracker(&self, stages: Vec<Stage>) -> ProgressTracker {
        ProgressTracker::new(
            stages,
            self.config.progress_callback.clone(),
            self.config.cancellation.clone(),
        )
    }

    /// Cancellation checkpoint for work that runs before the tracker exists.
    pub fn checkpoint(&self) -> Result<(), PdfOpsError> {
        if self.config.cancellation.is_cancelled() {
            Err(PdfOpsError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn callback(&self) -> Option<&dyn JobProgressCallback> {
        self.config.progress_callback.as_deref()
    }

    pub fn job_started(&self, total_units: usize) {
        debug!("{}: {} unit(s) to process", self.operation, total_units);
        if let Some(cb) = self.callback() {
            cb.on_job_start(self.operation, total_units);
        }
    }

    pub fn page_started(&self, page_num: usize, total: usize) {
        if let Some(cb) = self.callback() {
            cb.on_page_start(page_num, total);
        }
    }

    pub fn page_completed(&self, page_num: usize, total: usize) {
        if let Some(cb) = self.callback() {
            cb.on_page_complete(page_num, total);
        }
    }

    pub fn page_failed(&self, page_num: usize, total: usize, error: &str) {
        if let Some(cb) = self.callback() {
            cb.on_page_error(page_num, total, error);
        }
    }

    pub fn load(&self, input: &InputFile) -> Result<PdfDocument, PdfOpsError> {
        PdfDocument::load(&input.name, &input.bytes, self.config.tolerant_load)
    }

    /// Wrap outputs into a [`JobOutput`]; the job layer fills in timing.
    pub fn output(
        &self,
        files: Vec<OutputFile>,
        units_processed: usize,
        metadata: Option<crate::output::DocumentMetadata>,
    ) -> JobOutput {
        JobOutput {
            stats: JobStats {
                operation: self.operation.to_string(),
                units_processed,
                units_failed: 0,
                outputs: files.len(),
                duration_ms: 0,
            },
            files,
            pages: Vec::new(),
            metadata,
        }
    }
}

/// Standard three-stage table for load → per-page work → save.
pub(crate) fn page_stages(
    work: &'static str,
    load_weight: f32,
    work_weight: f32,
    save_weight: f32,
    pages: usize,
) -> Vec<Stage> {
    vec![
        Stage::new("load", load_weight),
        Stage::with_items(work, work_weight, pages),
        Stage::new("save", save_weight),
    ]
}
