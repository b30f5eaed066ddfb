//! Split one document into several, one per page range.

use super::OpContext;
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::naming::{ranges_every_n, split_output_name};
use crate::pipeline::pages::{validate_ranges, PageRange};
use crate::progress::Stage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How to cut the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SplitMode {
    /// Explicit 1-based inclusive ranges, written in the given order.
    Ranges(Vec<PageRange>),
    /// Consecutive chunks of `n` pages; the last chunk may be shorter.
    EveryN(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOptions {
    pub mode: SplitMode,
}

impl SplitOptions {
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        match &self.mode {
            SplitMode::Ranges(ranges) if ranges.is_empty() => Err(PdfOpsError::InvalidOptions(
                "split needs at least one page range".into(),
            )),
            SplitMode::EveryN(0) => Err(PdfOpsError::InvalidOptions(
                "split chunk size must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Concrete ranges for a document of `total` pages, validated against it.
    pub fn ranges(&self, total: usize) -> Result<Vec<PageRange>, PdfOpsError> {
        let ranges = match &self.mode {
            SplitMode::Ranges(ranges) => ranges.clone(),
            SplitMode::EveryN(n) => ranges_every_n(total, *n)?,
        };
        validate_ranges(&ranges, total)?;
        if ranges.is_empty() {
            return Err(PdfOpsError::NoValidPages { total });
        }
        Ok(ranges)
    }
}

/// The job's page selection does not apply; ranges come from the options.
pub(crate) async fn run(
    ctx: &OpContext<'_>,
    input: &InputFile,
    options: &SplitOptions,
) -> Result<JobOutput, PdfOpsError> {
    options.validate()?;
    ctx.checkpoint()?;
    let doc = ctx.load(input)?;
    let total = doc.page_count();
    let ranges = options.ranges(total)?;

    let tracker = ctx.tracker(vec![
        Stage::new("load", 10.0),
        Stage::with_items("split", 90.0, ranges.len()),
    ]);
    tracker.complete_stage(0);
    ctx.job_started(ranges.len());

    let mut files = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        tracker.checkpoint()?;
        let position = i + 1;
        ctx.page_started(position, ranges.len());

        let mut part = doc.extract_pages(*range)?;
        let bytes = part.save()?;
        let name = split_output_name(&input.name, *range, position, ranges.len());
        debug!("{}: pages {}-{} ({} bytes)", name, range.start, range.end, bytes.len());
        files.push(OutputFile::pdf(name, bytes, range.len()));

        ctx.page_completed(position, ranges.len());
        tracker.advance(1, position);
    }
    tracker.finish();
    info!("Split {} page(s) into {} file(s)", total, files.len());

    let pages_written = ranges.iter().map(PageRange::len).sum();
    Ok(ctx.output(files, pages_written, Some(doc.metadata())))
}
