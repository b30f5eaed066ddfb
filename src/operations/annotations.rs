//! Remove annotations (comments, highlights, links, widgets) from pages.

use super::{page_stages, OpContext};
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::naming::derived_name;
use crate::pipeline::pages::{PageSelection, SelectionPolicy};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StripOptions {
    /// Also drop the document's interactive form (`/AcroForm`).
    #[serde(default)]
    pub remove_form: bool,
}

pub(crate) async fn run(
    ctx: &OpContext<'_>,
    input: &InputFile,
    selection: &PageSelection,
    options: &StripOptions,
) -> Result<JobOutput, PdfOpsError> {
    ctx.checkpoint()?;
    let mut doc = ctx.load(input)?;
    let total = doc.page_count();
    let indices = selection.resolve_required(total, SelectionPolicy::Additive)?;

    let tracker = ctx.tracker(page_stages("strip", 10.0, 80.0, 10.0, indices.len()));
    tracker.complete_stage(0);
    ctx.job_started(indices.len());

    let mut removed = 0;
    for (done, &idx) in indices.iter().enumerate() {
        tracker.checkpoint()?;
        ctx.page_started(idx + 1, indices.len());
        removed += doc.strip_annotations(&[idx], false)?;
        ctx.page_completed(idx + 1, indices.len());
        tracker.advance(1, done + 1);
    }
    if options.remove_form {
        doc.strip_annotations(&[], true)?;
    }

    tracker.checkpoint()?;
    let bytes = doc.save()?;
    tracker.finish();
    info!(
        "Removed {} annotation(s) from {} page(s)",
        removed,
        indices.len()
    );

    let name = derived_name(&input.name, "no_annotations", "pdf");
    Ok(ctx.output(
        vec![OutputFile::pdf(name, bytes, total)],
        indices.len(),
        Some(doc.metadata()),
    ))
}
