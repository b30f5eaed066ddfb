//! Recognise the text of selected pages into one plain-text output.
//!
//! One [`OcrSession`] serves the whole job. Pages go through it in order;
//! a page whose recognition fails leaves a marker in the text and the job
//! carries on. A rasteriser failure or cancellation ends the job, and the
//! session is terminated before the error is returned.

use super::OpContext;
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile, PageText};
use crate::pipeline::input::InputFile;
use crate::pipeline::naming::derived_name;
use crate::pipeline::ocr::{OcrSession, RecognitionEngine};
use crate::pipeline::pages::{PageSelection, SelectionPolicy};
use crate::pipeline::postprocess::clean_text;
use crate::pipeline::render::Rasterizer;
use crate::progress::{ProgressTracker, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrOptions {
    /// Recognition languages in priority order. Empty means the job
    /// config's languages.
    #[serde(default)]
    pub languages: Vec<String>,
}

pub(crate) async fn run<R: Rasterizer, E: RecognitionEngine>(
    ctx: &OpContext<'_>,
    input: &InputFile,
    selection: &PageSelection,
    options: &OcrOptions,
    rasterizer: &R,
    engine: &mut E,
) -> Result<JobOutput, PdfOpsError> {
    let languages = if options.languages.is_empty() {
        ctx.config.languages.clone()
    } else {
        options.languages.clone()
    };

    ctx.checkpoint()?;
    let doc = ctx.load(input)?;
    let total = doc.page_count();
    let indices = selection.resolve_required(total, SelectionPolicy::Additive)?;

    let tracker = ctx.tracker(vec![
        Stage::new("load", 5.0),
        Stage::with_items("recognize", 90.0, indices.len()),
        Stage::new("assemble", 5.0),
    ]);
    tracker.complete_stage(0);
    ctx.job_started(indices.len());
    tracker.checkpoint()?;

    let source: Arc<[u8]> = Arc::from(input.bytes.as_slice());
    let mut session = OcrSession::start(engine, &languages).await?;
    let result = recognize_pages(ctx, &tracker, &mut session, rasterizer, source, &indices).await;
    session.terminate().await;
    let pages = result?;

    let failed = pages.iter().filter(|p| p.error.is_some()).count();
    let separator = &ctx.config.page_separator;
    let mut text = String::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            text.push_str(&separator.render(page.page_num));
        }
        text.push_str(&page.rendered());
    }
    tracker.finish();
    info!(
        "Recognised {} page(s), {} failed",
        pages.len() - failed,
        failed
    );

    let name = derived_name(&input.name, "ocr", "txt");
    let mut output = ctx.output(
        vec![OutputFile::text(name, text)],
        pages.len() - failed,
        Some(doc.metadata()),
    );
    output.stats.units_failed = failed;
    output.pages = pages;
    Ok(output)
}

/// Page loop. Returns early only on cancellation or a rasteriser error;
/// recognition failures are recorded per page.
async fn recognize_pages<R: Rasterizer, E: RecognitionEngine>(
    ctx: &OpContext<'_>,
    tracker: &ProgressTracker,
    session: &mut OcrSession<'_, E>,
    rasterizer: &R,
    source: Arc<[u8]>,
    indices: &[usize],
) -> Result<Vec<PageText>, PdfOpsError> {
    let scale = ctx.config.render_scale;
    let mut pages = Vec::with_capacity(indices.len());

    for (done, &idx) in indices.iter().enumerate() {
        tracker.checkpoint()?;
        let page_num = idx + 1;
        ctx.page_started(page_num, indices.len());

        let rendered = rasterizer
            .render_page(Arc::clone(&source), idx, scale)
            .await?;
        match session.recognize(page_num, &rendered.buffer).await {
            Ok(raw) => {
                let text = clean_text(&raw);
                debug!("Page {}: {} chars", page_num, text.len());
                ctx.page_completed(page_num, indices.len());
                pages.push(PageText {
                    page_num,
                    text,
                    error: None,
                });
            }
            Err(e) => {
                ctx.page_failed(page_num, indices.len(), &e.to_string());
                pages.push(PageText {
                    page_num,
                    text: String::new(),
                    error: Some(e),
                });
            }
        }
        tracker.advance(1, done + 1);
    }

    Ok(pages)
}
