//! CLI binary for pdfops.
//!
//! A thin shim over the library crate: one subcommand per operation, flags
//! mapped onto `JobConfig` and the operation's options.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdfops::job::write_outputs;
use pdfops::operations::{
    annotations::StripOptions,
    forms::{FormFieldSpec, FormFieldsOptions},
    images::ImagesOptions,
    ocr::OcrOptions,
    recolor::RecolorOptions,
    split::{SplitMode, SplitOptions},
    tint::TintOptions,
};
use pdfops::pipeline::layout::{LayoutSpec, Orientation, PageSize, PageSizePreset};
use pdfops::pipeline::naming::parse_page_ranges;
use pdfops::pipeline::recolor::{RecolorMode, Rgb};
use pdfops::{
    inspect, run_job, CancellationToken, ErrorKind, InputFile, Job, JobConfig,
    JobProgressCallback, Operation, PageSelection, PageSeparator, PdfOpsError, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const EXIT_USAGE: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percentage bar driven by the pipeline's weighted progress.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_job_start(&self, operation: &str, total_units: usize) {
        self.bar.set_prefix(operation.to_string());
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{operation}: {total_units} unit(s)"))
        ));
    }

    fn on_progress(&self, percent: f32, stage: &str) {
        self.bar.set_position(percent.round() as u64);
        self.bar.set_message(stage.to_string());
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg)
        ));
    }

    fn on_job_complete(&self, outputs: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} output(s) written", green("✔"), bold(&outputs.to_string()));
        } else {
            eprintln!(
                "{} {} output(s), {} page(s) failed",
                cyan("⚠"),
                bold(&outputs.to_string()),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR pages 1-3 in English and German
  pdfops ocr scan.pdf --pages 1-3 --lang eng,deu

  # Remove comments and highlights, keep the form
  pdfops strip-annotations reviewed.pdf -o out/

  # Cream background on every page
  pdfops tint report.pdf --color "#FFF8E7"

  # Turn dark text blue
  pdfops recolor notes.pdf --target "#1E3A8A" --threshold 100

  # Add fields described in a JSON file
  pdfops form-fields contract.pdf --fields fields.json

  # Photos to A4 pages with a 36pt margin
  pdfops images-to-pdf a.jpg b.png --page-size a4 --margin 36

  # Split into chunks of 10 pages, or explicit ranges
  pdfops split book.pdf --every 10
  pdfops split book.pdf --ranges 1-5,6-12

  # Metadata only
  pdfops inspect report.pdf --json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (OCR)
  ANTHROPIC_API_KEY       Anthropic API key (OCR)
  GEMINI_API_KEY          Google Gemini API key (OCR)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium (ocr, recolor)
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Page-level PDF transformations.
#[derive(Parser, Debug)]
#[command(
    name = "pdfops",
    version,
    about = "Page-level PDF transformations: OCR, annotations, tint, recolor, forms, images, split",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Page selection: all, 5, 3-15, or 1,3,5-7.
    #[arg(long, global = true, env = "PDFOPS_PAGES", default_value = "all")]
    pages: String,

    /// Directory for output files.
    #[arg(short, long, global = true, env = "PDFOPS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Render scale for rasterising operations (0.5–6.0).
    #[arg(long, global = true, env = "PDFOPS_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Fail on damaged PDFs instead of attempting recovery.
    #[arg(long, global = true, env = "PDFOPS_STRICT")]
    strict: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, global = true, env = "PDFOPS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFOPS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFOPS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFOPS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognise page text into a .txt file.
    Ocr {
        input: PathBuf,
        /// Languages, comma-separated, in priority order (e.g. eng,deu).
        #[arg(long, env = "PDFOPS_LANG", value_delimiter = ',', default_value = "eng")]
        lang: Vec<String>,
        /// Vision model ID.
        #[arg(long, env = "EDGEQUAKE_MODEL")]
        model: Option<String>,
        /// LLM provider: openai, anthropic, gemini, ollama, azure.
        #[arg(long, env = "EDGEQUAKE_PROVIDER")]
        provider: Option<String>,
        /// Page separator: none, hr, page, or a custom string.
        #[arg(long, env = "PDFOPS_SEPARATOR", default_value = "none")]
        separator: String,
        /// Retries per page on recognition failure.
        #[arg(long, env = "PDFOPS_MAX_RETRIES", default_value_t = 3)]
        max_retries: u32,
        /// Path to a text file containing a custom system prompt.
        #[arg(long, env = "PDFOPS_SYSTEM_PROMPT")]
        system_prompt: Option<PathBuf>,
    },
    /// Remove annotations from pages.
    StripAnnotations {
        input: PathBuf,
        /// Also remove the interactive form.
        #[arg(long)]
        remove_form: bool,
    },
    /// Paint a background colour behind page content.
    Tint {
        input: PathBuf,
        #[arg(long, default_value = "#FFF8E7")]
        color: String,
    },
    /// Recolour text by brightness (rasterises the selected pages).
    Recolor {
        input: PathBuf,
        #[arg(long, value_enum, default_value = "dark")]
        mode: ModeArg,
        /// Brightness threshold 0–255.
        #[arg(long, default_value_t = 128)]
        threshold: u8,
        /// Colour for matching pixels.
        #[arg(long, default_value = "#000000")]
        target: String,
    },
    /// Add form fields described in a JSON file.
    FormFields {
        input: PathBuf,
        /// JSON array of field objects.
        #[arg(long)]
        fields: PathBuf,
    },
    /// Build a PDF with one page per image.
    ImagesToPdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, value_enum, default_value = "a4")]
        page_size: PageSizeArg,
        #[arg(long, value_enum, default_value = "auto")]
        orientation: OrientationArg,
        /// Margin in points.
        #[arg(long, default_value_t = 0.0)]
        margin: f32,
        /// Place content at the bottom-left margin instead of centring it.
        #[arg(long)]
        no_center: bool,
        /// Keep images at their natural size even when they overflow.
        #[arg(long)]
        no_fit: bool,
    },
    /// Split into several documents.
    Split {
        input: PathBuf,
        /// Comma-separated ranges, e.g. 1-5,6-12.
        #[arg(long, conflicts_with = "every", required_unless_present = "every")]
        ranges: Option<String>,
        /// Chunks of N pages.
        #[arg(long)]
        every: Option<usize>,
    },
    /// Print document metadata.
    Inspect { input: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Dark,
    Light,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Fit,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
    Auto,
}

impl From<ModeArg> for RecolorMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Dark => RecolorMode::Dark,
            ModeArg::Light => RecolorMode::Light,
        }
    }
}

impl From<PageSizeArg> for PageSizePreset {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A3 => PageSizePreset::A3,
            PageSizeArg::A4 => PageSizePreset::A4,
            PageSizeArg::A5 => PageSizePreset::A5,
            PageSizeArg::Letter => PageSizePreset::Letter,
            PageSizeArg::Legal => PageSizePreset::Legal,
            PageSizeArg::Fit => PageSizePreset::Fit,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Auto => Orientation::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the feedback; library INFO logs would tear it.
    let show_progress = !common.quiet && !common.no_progress && !common.json;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.downcast_ref::<PdfOpsError>().map(PdfOpsError::kind);
            match kind {
                Some(ErrorKind::ProcessingCancelled) => {
                    if !common.quiet {
                        eprintln!("{} Cancelled", cyan("⚠"));
                    }
                    ExitCode::from(EXIT_CANCELLED)
                }
                Some(
                    ErrorKind::InvalidOptions
                    | ErrorKind::InvalidFileType
                    | ErrorKind::InvalidPageRange,
                ) => {
                    eprintln!("{} {:#}", red("error:"), e);
                    ExitCode::from(EXIT_USAGE)
                }
                _ => {
                    eprintln!("{} {:#}", red("error:"), e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let common = &cli.common;

    // ── Inspect ──────────────────────────────────────────────────────────
    if let Command::Inspect { input } = &cli.command {
        let file = InputFile::from_path(input)?;
        let meta = inspect(&file, !common.strict).context("Failed to inspect PDF")?;
        if common.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some((w, h)) = meta.first_page_size {
                println!("Page size:    {:.1} x {:.1} pt", w, h);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build job + config ───────────────────────────────────────────────
    let token = CancellationToken::new();
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let job = build_job(cli).await?;
    let config = build_config(cli, progress_cb, token.clone()).await?;

    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run_job(&job, &config).await?;
    let written = write_outputs(&output, &common.output_dir)?;

    if common.json {
        let summary = serde_json::json!({
            "files": written,
            "stats": output.stats,
            "metadata": output.metadata,
            "pages": output.pages,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
        );
    } else if !common.quiet {
        for path in &written {
            eprintln!("   {}", bold(&path.display().to_string()));
        }
        eprintln!(
            "   {}",
            dim(&format!(
                "{} unit(s) in {}ms",
                output.stats.units_processed, output.stats.duration_ms
            ))
        );
    }
    Ok(())
}

/// Map the subcommand to a [`Job`].
async fn build_job(cli: &Cli) -> Result<Job> {
    let read = |path: &PathBuf| -> Result<InputFile> { Ok(InputFile::from_path(path)?) };

    let (inputs, operation) = match &cli.command {
        Command::Ocr { input, lang, .. } => (
            vec![read(input)?],
            Operation::Ocr(OcrOptions {
                languages: lang.clone(),
            }),
        ),
        Command::StripAnnotations { input, remove_form } => (
            vec![read(input)?],
            Operation::StripAnnotations(StripOptions {
                remove_form: *remove_form,
            }),
        ),
        Command::Tint { input, color } => (
            vec![read(input)?],
            Operation::BackgroundTint(TintOptions {
                color: color.parse::<Rgb>()?,
            }),
        ),
        Command::Recolor {
            input,
            mode,
            threshold,
            target,
        } => (
            vec![read(input)?],
            Operation::Recolor(RecolorOptions {
                mode: (*mode).into(),
                threshold: *threshold,
                target: target.parse::<Rgb>()?,
            }),
        ),
        Command::FormFields { input, fields } => {
            let json = tokio::fs::read_to_string(fields)
                .await
                .with_context(|| format!("Failed to read fields from {:?}", fields))?;
            let fields: Vec<FormFieldSpec> =
                serde_json::from_str(&json).context("Invalid form field JSON")?;
            (
                vec![read(input)?],
                Operation::FormFields(FormFieldsOptions { fields }),
            )
        }
        Command::ImagesToPdf {
            inputs,
            page_size,
            orientation,
            margin,
            no_center,
            no_fit,
        } => (
            inputs.iter().map(read).collect::<Result<Vec<_>>>()?,
            Operation::ImagesToPdf(ImagesOptions {
                layout: LayoutSpec {
                    page_size: PageSize::Preset((*page_size).into()),
                    orientation: (*orientation).into(),
                    margin: *margin,
                    center: !*no_center,
                    scale_to_fit: !*no_fit,
                },
            }),
        ),
        Command::Split {
            input,
            ranges,
            every,
        } => {
            let mode = match (ranges, every) {
                (Some(r), _) => SplitMode::Ranges(parse_page_ranges(r)),
                (None, Some(n)) => SplitMode::EveryN(*n),
                (None, None) => anyhow::bail!("split needs --ranges or --every"),
            };
            (
                vec![read(input)?],
                Operation::Split(SplitOptions { mode }),
            )
        }
        Command::Inspect { .. } => anyhow::bail!("inspect does not run a job"),
    };

    Ok(Job::new(inputs, operation).with_pages(PageSelection::parse(&cli.common.pages)))
}

/// Map CLI args to `JobConfig`.
async fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    token: CancellationToken,
) -> Result<JobConfig> {
    let common = &cli.common;
    let mut builder = JobConfig::builder()
        .render_scale(common.scale)
        .tolerant_load(!common.strict)
        .cancellation(token);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    if let Command::Ocr {
        lang,
        model,
        provider,
        separator,
        max_retries,
        system_prompt,
        ..
    } = &cli.command
    {
        builder = builder
            .languages(lang.iter().cloned())
            .page_separator(parse_separator(separator))
            .max_retries(*max_retries);
        if let Some(m) = model {
            builder = builder.model(m.clone());
        }
        if let Some(p) = provider {
            builder = builder.provider_name(p.clone());
        }
        if let Some(path) = system_prompt {
            let prompt = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
            builder = builder.system_prompt(prompt);
        }
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "page" => PageSeparator::PageNumber,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
