//! Public extraction entry points.
//!
//! Every entry point funnels into [`extract_with_model`], which is generic
//! over [`ChatModel`] so the chunk loop can be exercised with a scripted
//! model in tests. The others only differ in where the protocol text comes
//! from and where the synopsis goes.
//!
//! Chunks are sent one at a time and the first failure ends the run.

use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::SynopsisError;
use crate::output::{synopsis_json, write_atomic, DocumentMetadata, ExtractionOutput, ExtractionStats};
use crate::pipeline::llm::{ChatModel, PromptRequest, ProviderModel};
use crate::pipeline::{chunk, input, merge, text};
use crate::prompts::chunk_user_prompt;
use crate::schema::parse_synopsis;
use crate::synopsis::ProtocolSynopsis;
use edgequake_llm::ProviderFactory;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extract a synopsis from a protocol PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Every failure is fatal and returned as-is: unreadable input, no text
/// layer, provider not configured, an upstream API error or timeout, or a
/// reply that fails validation (naming the chunk and field).
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SynopsisError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    // Fail on a missing API key before spending time in pdfium.
    let model = resolve_model(config)?;

    let text_start = Instant::now();
    let document = text::extract_text(resolved.path(), config.password.as_deref()).await?;
    let text_duration_ms = text_start.elapsed().as_millis() as u64;
    info!(
        "{}: {} pages, {} chars of text",
        resolved.display_name(),
        document.metadata.page_count,
        document.text.len()
    );

    let mut output = extract_with_model(&model, &document.text, config).await?;
    output.metadata = Some(document.metadata);
    output.stats.text_duration_ms = text_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Extract a synopsis from protocol text that is already in memory.
pub async fn extract_from_text(
    text: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SynopsisError> {
    let model = resolve_model(config)?;
    extract_with_model(&model, text, config).await
}

/// Run the chunk loop against any [`ChatModel`].
///
/// The text is split with [`chunk::split_text`], each chunk is sent once
/// under `config.api_timeout_secs`, each reply is validated with
/// [`parse_synopsis`], and the partial synopses are merged in chunk order.
pub async fn extract_with_model<M: ChatModel>(
    model: &M,
    text: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SynopsisError> {
    let start = Instant::now();
    let chunks = chunk::split_text(text, config.max_chunk_chars);
    if chunks.is_empty() {
        return Err(SynopsisError::NoExtractableText {
            source_name: "input text".to_string(),
        });
    }

    let total = chunks.len();
    info!("Processing {} chunk(s)", total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total);
    }

    let mut stats = ExtractionStats {
        chunks: total,
        input_chars: chunks.iter().map(|c| c.chars().count()).sum(),
        ..Default::default()
    };
    let mut parts = Vec::with_capacity(total);

    for (idx, chunk_text) in chunks.iter().enumerate() {
        let part = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(part, total);
        }

        match process_chunk(model, chunk_text, part, total, config).await {
            Ok((partial, prompt_tokens, completion_tokens)) => {
                let filled = partial.filled_fields();
                debug!("Chunk {}/{}: {} fields filled", part, total, filled);
                stats.prompt_tokens += prompt_tokens;
                stats.completion_tokens += completion_tokens;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_complete(part, total, filled);
                }
                parts.push(partial);
            }
            Err(e) => {
                warn!("Chunk {}/{} failed: {}", part, total, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_error(part, total, e.to_string());
                    cb.on_extraction_complete(total, idx);
                }
                return Err(e);
            }
        }
    }

    let synopsis = merge::merge_all(parts);
    stats.llm_duration_ms = start.elapsed().as_millis() as u64;
    stats.total_duration_ms = stats.llm_duration_ms;

    info!(
        "Extraction complete: {} chunk(s), {} fields filled, {}+{} tokens, {}ms",
        total,
        synopsis.filled_fields(),
        stats.prompt_tokens,
        stats.completion_tokens,
        stats.llm_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total, total);
    }

    Ok(ExtractionOutput {
        synopsis,
        metadata: None,
        stats,
    })
}

/// Extract a synopsis from PDF bytes in memory.
///
/// The bytes go to a managed [`tempfile`] that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use edgequake_synopsis::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("protocol.pdf")?;
/// let output = extract_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{}", output.synopsis.protocol_title);
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SynopsisError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| SynopsisError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| SynopsisError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    extract(&path, config).await
}

/// Extract and write the synopsis as pretty JSON to `output_path`.
///
/// The write is atomic, so a failed run never leaves a half-written file.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, SynopsisError> {
    let output = extract(input_str, config).await?;
    write_atomic(output_path.as_ref(), &synopsis_json(&output.synopsis)?).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SynopsisError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SynopsisError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(input_str, config))
}

/// Read PDF metadata without extracting a synopsis.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
) -> Result<DocumentMetadata, SynopsisError> {
    let timeout = ExtractionConfig::default().download_timeout_secs;
    let resolved = input::resolve_input(input_str.as_ref(), timeout).await?;
    text::extract_metadata(resolved.path(), password).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Send one chunk and validate the reply.
///
/// Returns the partial synopsis with the request's token counts.
async fn process_chunk<M: ChatModel>(
    model: &M,
    chunk_text: &str,
    part: usize,
    total: usize,
    config: &ExtractionConfig,
) -> Result<(ProtocolSynopsis, u64, u64), SynopsisError> {
    let request = PromptRequest {
        system: config.effective_system_prompt().to_string(),
        user: chunk_user_prompt(chunk_text, part, total),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let started = Instant::now();
    let reply = tokio::time::timeout(
        Duration::from_secs(config.api_timeout_secs),
        model.complete(&request),
    )
    .await
    .map_err(|_| SynopsisError::ApiTimeout {
        chunk: part,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })??;

    debug!(
        "Chunk {}/{} replied in {}ms ({} chars)",
        part,
        total,
        started.elapsed().as_millis(),
        reply.content.len()
    );

    let partial = parse_synopsis(&reply.content).map_err(|source| {
        debug!("Rejected reply for chunk {}: {}", part, reply.content);
        SynopsisError::InvalidResponse {
            chunk: part,
            source,
        }
    })?;

    Ok((partial, reply.prompt_tokens, reply.completion_tokens))
}

fn create_provider(provider_name: &str, model: &str) -> Result<ProviderModel, SynopsisError> {
    ProviderFactory::create_llm_provider(provider_name, model)
        .map(|p| ProviderModel::new(p, provider_name))
        .map_err(|e| SynopsisError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        })
}

/// Resolve the model, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`].
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
///    when both are set.
/// 4. **OpenAI** whenever `OPENAI_API_KEY` is present, so a machine with
///    several provider keys defaults to OpenAI.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
fn resolve_model(config: &ExtractionConfig) -> Result<ProviderModel, SynopsisError> {
    if let Some(ref provider) = config.provider {
        return Ok(ProviderModel::new(Arc::clone(provider), "configured"));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SynopsisError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(ProviderModel::new(llm_provider, "auto"))
}
