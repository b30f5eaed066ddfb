//! Build a new document with one page per input image.

use super::OpContext;
use crate::document::PdfDocument;
use crate::error::PdfOpsError;
use crate::output::{JobOutput, OutputFile};
use crate::pipeline::input::InputFile;
use crate::pipeline::layout::{compute_geometry, LayoutSpec};
use crate::pipeline::naming::base_name;
use crate::pipeline::recolor::PixelBuffer;
use crate::progress::Stage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagesOptions {
    #[serde(default)]
    pub layout: LayoutSpec,
}

/// `{base}.pdf` for a single image, `images.pdf` otherwise.
pub fn output_name(inputs: &[InputFile]) -> String {
    match inputs {
        [only] => format!("{}.pdf", base_name(&only.name)),
        _ => "images.pdf".to_string(),
    }
}

/// Decode PNG or JPEG bytes into an RGBA buffer.
pub fn decode_image(input: &InputFile) -> Result<PixelBuffer, PdfOpsError> {
    let img = image::load_from_memory(&input.bytes).map_err(|e| {
        PdfOpsError::ProcessingFailed(format!("cannot decode image '{}': {}", input.name, e))
    })?;
    Ok(PixelBuffer::from(img.to_rgba8()))
}

pub(crate) async fn run(
    ctx: &OpContext<'_>,
    inputs: &[InputFile],
    options: &ImagesOptions,
) -> Result<JobOutput, PdfOpsError> {
    let tracker = ctx.tracker(vec![
        Stage::with_items("place", 90.0, inputs.len()),
        Stage::new("save", 10.0),
    ]);
    ctx.job_started(inputs.len());

    let mut doc = PdfDocument::new();
    for (done, input) in inputs.iter().enumerate() {
        tracker.checkpoint()?;
        let item = done + 1;
        ctx.page_started(item, inputs.len());

        let buffer = decode_image(input)?;
        // One image pixel is one point.
        let geometry = compute_geometry(
            buffer.width() as f32,
            buffer.height() as f32,
            &options.layout,
        );
        doc.add_image_page(
            geometry.page_width,
            geometry.page_height,
            &buffer,
            geometry.placement,
        )?;
        debug!(
            "Image '{}' placed on {}x{} pt page at scale {:.3}",
            input.name, geometry.page_width, geometry.page_height, geometry.scale
        );

        ctx.page_completed(item, inputs.len());
        tracker.advance(0, item);
    }

    tracker.checkpoint()?;
    let bytes = doc.save()?;
    tracker.finish();
    info!("Built {} page(s) from images", inputs.len());

    Ok(ctx.output(
        vec![OutputFile::pdf(output_name(inputs), bytes, inputs.len())],
        inputs.len(),
        Some(doc.metadata()),
    ))
}
