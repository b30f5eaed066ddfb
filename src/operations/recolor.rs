//! Rasterise pages, recolour text by brightness, and put the result back.
//!
//! A recoloured page becomes a single image at the page's original size;
//! its text is no longer selectable.

use super::{page_stages, OpContext};
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::layout::{compute_geometry, LayoutSpec};
use crate::pipeline::naming::derived_name;
use crate::pipeline::pages::{PageSelection, SelectionPolicy};
use crate::pipeline::recolor::{recolor, RecolorMode, Rgb, DEFAULT_THRESHOLD};
use crate::pipeline::render::Rasterizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecolorOptions {
    #[serde(default)]
    pub mode: RecolorMode,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    pub target: Rgb,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

impl Default for RecolorOptions {
    fn default() -> Self {
        Self {
            mode: RecolorMode::Dark,
            threshold: DEFAULT_THRESHOLD,
            target: Rgb::BLACK,
        }
    }
}

pub(crate) async fn run<R: Rasterizer>(
    ctx: &OpContext<'_>,
    input: &InputFile,
    selection: &PageSelection,
    options: &RecolorOptions,
    rasterizer: &R,
) -> Result<JobOutput, PdfOpsError> {
    ctx.checkpoint()?;
    let mut doc = ctx.load(input)?;
    let total = doc.page_count();
    let indices = selection.resolve_required(total, SelectionPolicy::Additive)?;

    let tracker = ctx.tracker(page_stages("recolor", 5.0, 85.0, 10.0, indices.len()));
    tracker.complete_stage(0);
    ctx.job_started(indices.len());

    let source: Arc<[u8]> = Arc::from(input.bytes.as_slice());
    let scale = ctx.config.render_scale;

    for (done, &idx) in indices.iter().enumerate() {
        tracker.checkpoint()?;
        let page_num = idx + 1;
        ctx.page_started(page_num, indices.len());

        let mut rendered = rasterizer
            .render_page(Arc::clone(&source), idx, scale)
            .await?;
        let changed = recolor(
            &mut rendered.buffer,
            options.mode,
            options.threshold,
            options.target,
        );
        let geometry = compute_geometry(
            rendered.page_width,
            rendered.page_height,
            &LayoutSpec::full_page(rendered.page_width, rendered.page_height),
        );
        doc.replace_page_with_image(
            idx,
            geometry.page_width,
            geometry.page_height,
            &rendered.buffer,
            geometry.placement,
        )?;
        debug!(
            "Page {}: {} pixel(s) recoloured, {}x{} px",
            page_num,
            changed,
            rendered.buffer.width(),
            rendered.buffer.height()
        );

        ctx.page_completed(page_num, indices.len());
        tracker.advance(1, done + 1);
    }

    tracker.checkpoint()?;
    let bytes = doc.save()?;
    tracker.finish();

    let name = derived_name(&input.name, "recolored", "pdf");
    Ok(ctx.output(
        vec![OutputFile::pdf(name, bytes, total)],
        indices.len(),
        Some(doc.metadata()),
    ))
}
