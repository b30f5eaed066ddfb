//! Page rasterisation: render one page of a PDF to a [`PixelBuffer`].
//!
//! The [`Rasterizer`] trait is the seam between the pipeline and whatever
//! renders pages. [`PdfiumRasterizer`] is the production implementation.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so
//! the runtime's worker threads never stall on CPU-heavy rendering.
//!
//! The library is bound once per process and shared by every rasteriser;
//! the first successful binding wins, later `library_dir` values are ignored.

use super::recolor::PixelBuffer;
use crate::error::PdfOpsError;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// A rendered page plus the page's size at scale 1.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub buffer: PixelBuffer,
    /// Page width in points.
    pub page_width: f32,
    /// Page height in points.
    pub page_height: f32,
}

/// Renders single pages of a document.
///
/// `document` holds the complete PDF bytes; implementations may cache a
/// parsed copy but must not assume two calls see the same document.
pub trait Rasterizer {
    fn render_page(
        &self,
        document: Arc<[u8]>,
        page_index: usize,
        scale: f32,
    ) -> impl Future<Output = Result<RenderedPage, PdfOpsError>> + Send;
}

/// Rasteriser backed by pdfium.
///
/// The library is located via `PDFIUM_LIB_PATH` (a directory containing
/// `libpdfium`) or, failing that, the system library search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind from `PDFIUM_LIB_PATH` or the system library path.
    pub fn new() -> Self {
        Self {
            library_dir: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Bind from an explicit directory containing the pdfium library.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    async fn render_page(
        &self,
        document: Arc<[u8]>,
        page_index: usize,
        scale: f32,
    ) -> Result<RenderedPage, PdfOpsError> {
        let library_dir = self.library_dir.clone();
        tokio::task::spawn_blocking(move || {
            render_page_blocking(library_dir, &document, page_index, scale)
        })
        .await
        .map_err(|e| PdfOpsError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// The process-wide pdfium instance, bound on first use.
///
/// A failed binding is not cached, so a later call may retry.
fn shared_pdfium(library_dir: Option<PathBuf>) -> Result<&'static Pdfium, PdfOpsError> {
    PDFIUM.get_or_try_init(|| bind_pdfium(library_dir))
}

fn bind_pdfium(library_dir: Option<PathBuf>) -> Result<Pdfium, PdfOpsError> {
    let source = library_dir
        .as_ref()
        .map_or_else(|| "system path".to_string(), |dir| dir.display().to_string());
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            .or_else(|_| Pdfium::bind_to_system_library()),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PdfOpsError::PdfiumBindingFailed(format!("{:?}", e)))?;
    info!("Bound pdfium from {}", source);
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_page_blocking(
    library_dir: Option<PathBuf>,
    document: &[u8],
    page_index: usize,
    scale: f32,
) -> Result<RenderedPage, PdfOpsError> {
    let pdfium = shared_pdfium(library_dir)?;

    let doc = pdfium.load_pdf_from_byte_slice(document, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            PdfOpsError::Encrypted {
                name: "document".into(),
            }
        } else {
            PdfOpsError::ProcessingFailed(format!("pdfium could not load document: {err_str}"))
        }
    })?;

    let pages = doc.pages();
    let total_pages = pages.len() as usize;
    if page_index >= total_pages {
        return Err(PdfOpsError::ProcessingFailed(format!(
            "Page {} is out of range (document has {} pages)",
            page_index + 1,
            total_pages
        )));
    }

    let page = pages.get(page_index as u16).map_err(|e| {
        PdfOpsError::ProcessingFailed(format!("Page {}: {:?}", page_index + 1, e))
    })?;
    let page_width = page.width().value;
    let page_height = page.height().value;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        PdfOpsError::ProcessingFailed(format!(
            "Rasterisation failed for page {}: {:?}",
            page_index + 1,
            e
        ))
    })?;

    let image = bitmap.as_image().to_rgba8();
    debug!(
        "Rendered page {} at {:.2}x → {}x{} px",
        page_index + 1,
        scale,
        image.width(),
        image.height()
    );

    Ok(RenderedPage {
        buffer: PixelBuffer::from(image),
        page_width,
        page_height,
    })
}
