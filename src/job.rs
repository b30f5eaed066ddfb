//! Job entry points.
//!
//! A [`Job`] names its inputs, a page selection and one [`Operation`].
//! [`Pipeline::run`] validates everything that can be checked without
//! touching a collaborator, then dispatches to the operation module.
//! Every path returns a `Result<JobOutput, PdfOpsError>`.

use crate::config::JobConfig;
use crate::document::PdfDocument;
use crate::error::PdfOpsError;
use crate::operations::{
    annotations::{self, StripOptions},
    forms::{self, FormFieldsOptions},
    images::{self, ImagesOptions},
    ocr::{self, OcrOptions},
    recolor::{self, RecolorOptions},
    split::{self, SplitOptions},
    tint::{self, TintOptions},
    OpContext,
};
use crate::output::{DocumentMetadata, JobOutput};
use crate::pipeline::input::{require_images, require_single_pdf, InputFile};
use crate::pipeline::llm::VisionRecognizer;
use crate::pipeline::ocr::RecognitionEngine;
use crate::pipeline::pages::PageSelection;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// The operation a job performs, with its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Ocr(OcrOptions),
    StripAnnotations(StripOptions),
    BackgroundTint(TintOptions),
    Recolor(RecolorOptions),
    FormFields(FormFieldsOptions),
    ImagesToPdf(ImagesOptions),
    Split(SplitOptions),
}

impl Operation {
    /// Short name used in logs, progress events and stats.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ocr(_) => "ocr",
            Operation::StripAnnotations(_) => "strip_annotations",
            Operation::BackgroundTint(_) => "tint",
            Operation::Recolor(_) => "recolor",
            Operation::FormFields(_) => "form_fields",
            Operation::ImagesToPdf(_) => "images_to_pdf",
            Operation::Split(_) => "split",
        }
    }

    /// Whether the operation needs the rasteriser.
    pub fn rasterizes(&self) -> bool {
        matches!(self, Operation::Ocr(_) | Operation::Recolor(_))
    }

    /// Option checks that need neither the inputs nor a collaborator.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        match self {
            Operation::FormFields(opts) => opts.validate(),
            Operation::Split(opts) => opts.validate(),
            Operation::ImagesToPdf(opts) => opts.layout.validate(),
            Operation::Ocr(opts) if opts.languages.iter().any(|l| l.trim().is_empty()) => Err(
                PdfOpsError::InvalidOptions("OCR language codes must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// One unit of work: inputs, page selection and the operation to apply.
#[derive(Debug, Clone)]
pub struct Job {
    pub inputs: Vec<InputFile>,
    /// Ignored by `Split`, `FormFields` and `ImagesToPdf`, which carry their
    /// own page targets.
    pub pages: PageSelection,
    pub operation: Operation,
}

impl Job {
    pub fn new(inputs: Vec<InputFile>, operation: Operation) -> Self {
        Self {
            inputs,
            pages: PageSelection::All,
            operation,
        }
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Validation that runs before any collaborator I/O.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        self.operation.validate()?;
        match self.operation {
            Operation::ImagesToPdf(_) => require_images(&self.inputs),
            _ => require_single_pdf(&self.inputs).map(|_| ()),
        }
    }
}

/// Runs jobs against a rasteriser and a recognition engine.
///
/// Tests plug in fakes; [`run_job`] uses pdfium and a vision LLM.
pub struct Pipeline<R, E> {
    rasterizer: R,
    recognizer: E,
}

impl<R: Rasterizer, E: RecognitionEngine> Pipeline<R, E> {
    pub fn new(rasterizer: R, recognizer: E) -> Self {
        Self {
            rasterizer,
            recognizer,
        }
    }

    pub fn recognizer(&self) -> &E {
        &self.recognizer
    }

    /// Run one job to completion.
    ///
    /// # Errors
    /// Validation errors come back before any document is opened.
    /// `Cancelled` is returned when the config's token is set between
    /// units of work; no partial output is returned with it.
    pub async fn run(&mut self, job: &Job, config: &JobConfig) -> Result<JobOutput, PdfOpsError> {
        let start = Instant::now();
        let name = job.operation.name();
        config.validate()?;
        job.validate()?;
        info!("Starting {} on {} input(s)", name, job.inputs.len());

        let ctx = OpContext::new(config, name);
        let result = self.dispatch(&ctx, job).await;

        match result {
            Ok(mut output) => {
                output.stats.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "{} finished: {} output(s) in {}ms",
                    name, output.stats.outputs, output.stats.duration_ms
                );
                if let Some(cb) = ctx.callback() {
                    cb.on_job_complete(output.files.len());
                }
                Ok(output)
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!("{} cancelled", name);
                } else {
                    warn!("{} failed: {}", name, e);
                }
                Err(e)
            }
        }
    }

    async fn dispatch(&mut self, ctx: &OpContext<'_>, job: &Job) -> Result<JobOutput, PdfOpsError> {
        let pdf = || require_single_pdf(&job.inputs);
        match &job.operation {
            Operation::Ocr(opts) => {
                ocr::run(
                    ctx,
                    pdf()?,
                    &job.pages,
                    opts,
                    &self.rasterizer,
                    &mut self.recognizer,
                )
                .await
            }
            Operation::StripAnnotations(opts) => annotations::run(ctx, pdf()?, &job.pages, opts).await,
            Operation::BackgroundTint(opts) => tint::run(ctx, pdf()?, &job.pages, opts).await,
            Operation::Recolor(opts) => {
                recolor::run(ctx, pdf()?, &job.pages, opts, &self.rasterizer).await
            }
            Operation::FormFields(opts) => forms::run(ctx, pdf()?, opts).await,
            Operation::ImagesToPdf(opts) => images::run(ctx, &job.inputs, opts).await,
            Operation::Split(opts) => split::run(ctx, pdf()?, opts).await,
        }
    }
}

/// The pipeline [`run_job`] uses: pdfium rendering and vision-LLM OCR.
pub fn default_pipeline(config: &JobConfig) -> Pipeline<PdfiumRasterizer, VisionRecognizer> {
    Pipeline::new(PdfiumRasterizer::new(), VisionRecognizer::from_config(config))
}

/// Run a job with the default collaborators.
///
/// pdfium is bound only when the operation rasterises; the LLM provider
/// is resolved only when an OCR session starts.
pub async fn run_job(job: &Job, config: &JobConfig) -> Result<JobOutput, PdfOpsError> {
    default_pipeline(config).run(job, config).await
}

/// Synchronous wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync(job: &Job, config: &JobConfig) -> Result<JobOutput, PdfOpsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfOpsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_job(job, config))
}

/// Run a job and write every output file into `dir`.
///
/// Each file is written to a temp file in `dir` and then persisted under
/// its final name, so readers never see a partial file.
pub async fn run_job_to_dir(
    job: &Job,
    config: &JobConfig,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, PdfOpsError> {
    let output = run_job(job, config).await?;
    write_outputs(&output, dir)
}

/// Write the files of `output` into `dir`, returning their paths.
pub fn write_outputs(output: &JobOutput, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PdfOpsError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| PdfOpsError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::with_capacity(output.files.len());
    for file in &output.files {
        let path = dir.join(&file.filename);
        let write_err = |e: std::io::Error| PdfOpsError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&file.bytes).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        written.push(path);
    }
    Ok(written)
}

/// Read document metadata without running an operation.
pub fn inspect(input: &InputFile, tolerant: bool) -> Result<DocumentMetadata, PdfOpsError> {
    let pdf = require_single_pdf(std::slice::from_ref(input))?;
    let doc = PdfDocument::load(&pdf.name, &pdf.bytes, tolerant)?;
    Ok(doc.metadata())
}
