//! CLI binary for edgequake-synopsis.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and writes the synopsis as JSON and/or Markdown.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_synopsis::output::{synopsis_json, timestamped_stem, write_atomic};
use edgequake_synopsis::pipeline::{input, text};
use edgequake_synopsis::{
    extract, inspect, render_markdown, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF is read, then a bar over the chunks with one log
/// line per chunk.
struct CliProgressCallback {
    bar: ProgressBar,
    chunk_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading protocol…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn chunk_elapsed_secs(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Sending protocol in {total_chunks} chunk(s)…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, _total: usize) {
        if let Ok(mut t) = self.chunk_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk}"));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, fields_filled: usize) {
        let secs = self.chunk_elapsed_secs();
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            chunk,
            total,
            dim(&format!("{fields_filled:>2} fields")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk: usize, total: usize, error: String) {
        let secs = self.chunk_elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            chunk,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_chunks: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 && succeeded == total_chunks {
            eprintln!(
                "{} {} chunk(s) extracted",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} stopped after {}/{} chunk(s)",
                red("✘"),
                bold(&succeeded.to_string()),
                total_chunks
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Synopsis JSON on stdout
  pdf2synopsis protocol.pdf

  # JSON file plus a Markdown report
  pdf2synopsis protocol.pdf -o synopsis.json --report synopsis.md

  # Timestamped protocol_synopsis_YYYYMMDD_HHMMSS.{json,md} in a directory
  pdf2synopsis protocol.pdf --out-dir synopses/

  # Use a specific model
  pdf2synopsis --provider anthropic --model claude-sonnet-4-20250514 protocol.pdf

  # From a URL
  pdf2synopsis https://example.org/trials/protocol.pdf -o synopsis.json

  # Inspect PDF metadata / dump the text layer (no API key needed)
  pdf2synopsis --inspect-only protocol.pdf
  pdf2synopsis --text-only protocol.pdf > protocol.txt

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter, overrides -v / -q

  A .env file in the working directory is loaded before anything else.
"#;

/// Extract structured synopses from clinical-trial protocol PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2synopsis",
    version,
    about = "Extract structured synopses from clinical-trial protocol PDFs using LLMs",
    long_about = "Read the text of a clinical-trial protocol (local file or URL), ask an LLM to \
fill a fixed synopsis schema chunk by chunk, validate every reply and merge the results. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the synopsis JSON to this file instead of stdout.
    #[arg(short, long, env = "SYNOPSIS_OUTPUT")]
    output: Option<PathBuf>,

    /// Also write a Markdown report to this file.
    #[arg(long, env = "SYNOPSIS_REPORT")]
    report: Option<PathBuf>,

    /// Write protocol_synopsis_<timestamp>.json and .md into this directory.
    #[arg(long, env = "SYNOPSIS_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Characters of protocol text per request (min 1000).
    #[arg(long, env = "SYNOPSIS_CHUNK_SIZE", default_value_t = 100_000)]
    chunk_size: usize,

    /// Max LLM output tokens per chunk.
    #[arg(long, env = "SYNOPSIS_MAX_TOKENS", default_value_t = 16_384)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SYNOPSIS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SYNOPSIS_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SYNOPSIS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print PDF metadata only, no extraction.
    #[arg(long, conflicts_with = "text_only")]
    inspect_only: bool,

    /// Print the extracted PDF text only, no extraction.
    #[arg(long)]
    text_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "SYNOPSIS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SYNOPSIS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SYNOPSIS_QUIET", conflicts_with = "verbose")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SYNOPSIS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "SYNOPSIS_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let extracting = !cli.inspect_only && !cli.text_only;
    let show_progress = extracting && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        println!("File:          {}", cli.input);
        if let Some(ref t) = meta.title {
            println!("Title:         {t}");
        }
        if let Some(ref a) = meta.author {
            println!("Author:        {a}");
        }
        if let Some(ref s) = meta.subject {
            println!("Subject:       {s}");
        }
        println!("Pages:         {}", meta.page_count);
        println!("PDF Version:   {}", meta.pdf_version);
        if let Some(ref d) = meta.creation_date {
            println!("Created:       {d}");
        }
        if let Some(ref p) = meta.producer {
            println!("Producer:      {p}");
        }
        if let Some(ref c) = meta.creator {
            println!("Creator:       {c}");
        }
        return Ok(());
    }

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let resolved = input::resolve_input(&cli.input, cli.download_timeout)
            .await
            .context("Failed to open input")?;
        let document = text::extract_text(resolved.path(), cli.password.as_deref())
            .await
            .context("Failed to extract text")?;
        match cli.output {
            Some(ref path) => write_atomic(path, &document.text)
                .await
                .context("Failed to write text")?,
            None => write_stdout(&document.text)?,
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    let written = write_outputs(&cli, &output).await?;

    if !cli.quiet {
        let stats = &output.stats;
        for path in &written {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
        eprintln!(
            "   {} fields filled  ·  {} tokens in  /  {} tokens out  ·  {}ms total",
            output.synopsis.filled_fields(),
            dim(&stats.prompt_tokens.to_string()),
            dim(&stats.completion_tokens.to_string()),
            stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Write every requested output; JSON goes to stdout when no file or
/// directory was given. Returns the files written.
async fn write_outputs(cli: &Cli, output: &ExtractionOutput) -> Result<Vec<PathBuf>> {
    let json = synopsis_json(&output.synopsis).context("Failed to serialise synopsis")?;
    let mut written = Vec::new();
    let mut report: Option<String> = None;

    if let Some(ref path) = cli.output {
        write_file(path, &json).await?;
        written.push(path.clone());
    }

    if let Some(ref path) = cli.report {
        let md = report.get_or_insert_with(|| render_markdown(&output.synopsis));
        write_file(path, md).await?;
        written.push(path.clone());
    }

    if let Some(ref dir) = cli.out_dir {
        let stem = timestamped_stem(&chrono::Local::now());
        let json_path = dir.join(format!("{stem}.json"));
        let md_path = dir.join(format!("{stem}.md"));
        let md = report.get_or_insert_with(|| render_markdown(&output.synopsis));
        write_file(&json_path, &json).await?;
        write_file(&md_path, md).await?;
        written.push(json_path);
        written.push(md_path);
    }

    if cli.output.is_none() && cli.out_dir.is_none() {
        write_stdout(&json)?;
    }

    Ok(written)
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    write_atomic(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn write_stdout(contents: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(contents.as_bytes())
        .context("Failed to write to stdout")?;
    if !contents.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .max_chunk_chars(cli.chunk_size)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
