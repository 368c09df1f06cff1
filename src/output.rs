//! Result types and file output helpers.

use crate::error::SynopsisError;
use crate::synopsis::ProtocolSynopsis;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

/// Everything an extraction run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The merged, validated synopsis.
    pub synopsis: ProtocolSynopsis,
    /// PDF metadata; `None` when extraction started from plain text.
    pub metadata: Option<DocumentMetadata>,
    pub stats: ExtractionStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Model requests made (one per chunk).
    pub chunks: usize,
    /// Characters of protocol text sent, excluding prompts.
    pub input_chars: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Time spent opening the PDF and pulling its text layer.
    pub text_duration_ms: u64,
    /// Time spent waiting on the model.
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// PDF document information, readable without an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// File stem for timestamped outputs: `protocol_synopsis_20240312_142501`.
pub fn timestamped_stem<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("protocol_synopsis_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Serialise a synopsis as pretty-printed JSON with a trailing newline.
pub fn synopsis_json(synopsis: &ProtocolSynopsis) -> Result<String, SynopsisError> {
    let mut json = serde_json::to_string_pretty(synopsis)?;
    json.push('\n');
    Ok(json)
}

/// Write `contents` to `path` atomically: temp file in the same directory,
/// then rename. Parent directories are created as needed.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), SynopsisError> {
    let write_err = |source: std::io::Error| SynopsisError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "synopsis".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn stem_uses_compact_timestamp() {
        let t = Utc.with_ymd_and_hms(2024, 3, 12, 14, 25, 1).unwrap();
        assert_eq!(timestamped_stem(&t), "protocol_synopsis_20240312_142501");
    }

    #[test]
    fn synopsis_json_ends_with_newline() {
        let json = synopsis_json(&ProtocolSynopsis::default()).unwrap();
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\"protocol_title\": \"\""));
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/synopsis.json");
        write_atomic(&path, "{}\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
        assert!(!path.with_file_name("synopsis.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synopsis.md");
        write_atomic(&path, "old").await.unwrap();
        write_atomic(&path, "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
