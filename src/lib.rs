//! # pdfops
//!
//! Page-level PDF transformations over one shared pipeline core.
//!
//! Every operation (OCR, annotation stripping, background tint, text
//! recolouring, form fields, image import, splitting) needs the same few
//! pieces: turn a page selection into validated indices, report weighted
//! progress while polling for cancellation, place content on a page, and
//! name its outputs deterministically. Those live in [`pipeline`] and
//! [`progress`]; each operation in [`operations`] is a thin loop over them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Job (inputs, pages, operation)
//!  │
//!  ├─ 1. Validate  options, input types, config (no I/O)
//!  ├─ 2. Load      lopdf document model (tolerant recovery optional)
//!  ├─ 3. Resolve   page selection → 0-based indices
//!  ├─ 4. Work      per page/item, cancellation checked before each
//!  │               (rasterise via pdfium, recognise via vision LLM, …)
//!  └─ 5. Output    named byte blobs + metadata + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfops::{run_job, InputFile, Job, JobConfig, Operation};
//! use pdfops::operations::split::{SplitMode, SplitOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = InputFile::from_path("report.pdf")?;
//!     let job = Job::new(
//!         vec![input],
//!         Operation::Split(SplitOptions { mode: SplitMode::EveryN(10) }),
//!     );
//!     let output = run_job(&job, &JobConfig::default()).await?;
//!     for file in &output.files {
//!         println!("{} ({} bytes)", file.filename, file.size_bytes);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfops` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfops = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod operations;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{JobConfig, JobConfigBuilder, PageSeparator};
pub use document::PdfDocument;
pub use error::{ErrorKind, PageError, PageRangeError, PdfOpsError};
pub use job::{
    default_pipeline, inspect, run_job, run_job_sync, run_job_to_dir, write_outputs, Job,
    Operation, Pipeline,
};
pub use output::{DocumentMetadata, JobOutput, JobStats, OutputFile, PageText};
pub use pipeline::input::InputFile;
pub use pipeline::pages::{PageRange, PageSelection, SelectionPolicy};
pub use progress::{CancellationToken, JobProgressCallback, NoopProgressCallback, ProgressCallback};
