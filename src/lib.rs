//! # edgequake-synopsis
//!
//! Extract structured synopses from clinical-trial protocol PDFs with an LLM.
//!
//! A protocol runs to hundreds of pages; the synopsis a sponsor, reviewer or
//! registry actually needs (design, arms, endpoints, dosing, statistics) is
//! a few dozen fields. This crate reads the PDF text layer, asks a model to
//! fill a fixed JSON schema chunk by chunk, validates every reply against
//! that schema and merges the results into one [`ProtocolSynopsis`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Text      read the text layer via pdfium (spawn_blocking)
//!  ├─ 3. Chunk     sentence-aware split, 100k chars per request
//!  ├─ 4. LLM       one request per chunk, sequential, no retries
//!  ├─ 5. Validate  isolate the JSON object, check every schema field
//!  └─ 6. Merge     fold partial synopses into one record
//! ```
//!
//! Any failure (unreadable PDF, a reply missing a field, an upstream API
//! error) ends the run with a [`SynopsisError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_synopsis::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("protocol.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.synopsis)?);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.prompt_tokens,
//!         output.stats.completion_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Validating a reply without a model
//!
//! ```rust
//! use edgequake_synopsis::{parse_synopsis, SchemaError};
//!
//! let err = parse_synopsis(r#"{"protocol_title": "X"}"#).unwrap_err();
//! assert!(matches!(err, SchemaError::MissingField { .. }));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2synopsis` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-synopsis = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod schema;
pub mod synopsis;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{SchemaError, SynopsisError};
pub use extract::{
    extract, extract_from_bytes, extract_from_text, extract_sync, extract_to_file,
    extract_with_model, inspect,
};
pub use output::{DocumentMetadata, ExtractionOutput, ExtractionStats};
pub use pipeline::llm::{ChatModel, ModelReply, PromptRequest, ProviderModel};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::render_markdown;
pub use schema::parse_synopsis;
pub use synopsis::{DosageInfo, DurationValue, ProtocolSynopsis, StudyArm};
