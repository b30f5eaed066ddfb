//! Paint a background colour behind the content of selected pages.

use super::{page_stages, OpContext};
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::naming::derived_name;
use crate::pipeline::pages::{PageSelection, SelectionPolicy};
use crate::pipeline::recolor::Rgb;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TintOptions {
    pub color: Rgb,
}

impl Default for TintOptions {
    /// A pale cream that reads as "paper" on screen.
    fn default() -> Self {
        Self {
            color: Rgb::new(0xFF, 0xF8, 0xE7),
        }
    }
}

pub(crate) async fn run(
    ctx: &OpContext<'_>,
    input: &InputFile,
    selection: &PageSelection,
    options: &TintOptions,
) -> Result<JobOutput, PdfOpsError> {
    ctx.checkpoint()?;
    let mut doc = ctx.load(input)?;
    let total = doc.page_count();
    let indices = selection.resolve_required(total, SelectionPolicy::Additive)?;

    let tracker = ctx.tracker(page_stages("tint", 10.0, 80.0, 10.0, indices.len()));
    tracker.complete_stage(0);
    ctx.job_started(indices.len());

    for (done, &idx) in indices.iter().enumerate() {
        tracker.checkpoint()?;
        ctx.page_started(idx + 1, indices.len());
        doc.add_background(idx, options.color)?;
        ctx.page_completed(idx + 1, indices.len());
        tracker.advance(1, done + 1);
    }

    tracker.checkpoint()?;
    let bytes = doc.save()?;
    tracker.finish();
    info!("Tinted {} of {} page(s)", indices.len(), total);

    let name = derived_name(&input.name, "tinted", "pdf");
    Ok(ctx.output(
        vec![OutputFile::pdf(name, bytes, total)],
        indices.len(),
        Some(doc.metadata()),
    ))
}
