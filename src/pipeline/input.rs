//! Input resolution: turn a user-supplied path or URL into a local PDF path.
//!
//! pdfium opens files by path, so URL inputs are downloaded into a `TempDir`
//! that lives as long as the returned [`ResolvedInput`]. The `%PDF` magic is
//! checked up front so a mistyped URL that returns an HTML error page fails
//! with [`SynopsisError::NotAPdf`] instead of an opaque pdfium error.

use crate::error::SynopsisError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A local PDF path, possibly backed by a temporary download.
#[derive(Debug)]
pub enum ResolvedInput {
    Local(PathBuf),
    /// The `TempDir` is held so the file outlives processing.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Name used in logs and error messages.
    pub fn display_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string())
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF, downloading it first when it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, SynopsisError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SynopsisError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(trimmed) {
        download_url(trimmed, timeout_secs).await
    } else if trimmed.contains("://") {
        Err(SynopsisError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        resolve_local(trimmed)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, SynopsisError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(SynopsisError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SynopsisError::PermissionDenied { path });
        }
        Err(_) => return Err(SynopsisError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    let read = read_prefix(&mut file, &mut magic);
    check_magic(&magic[..read], &path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn read_prefix(file: &mut std::fs::File, buf: &mut [u8; 4]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    filled
}

/// Files shorter than four bytes cannot be PDFs either.
fn check_magic(prefix: &[u8], path: &Path) -> Result<(), SynopsisError> {
    if prefix == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    magic[..prefix.len()].copy_from_slice(prefix);
    Err(SynopsisError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, SynopsisError> {
    info!("Downloading protocol from: {}", url);

    let failed = |reason: String| SynopsisError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SynopsisError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SynopsisError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    let temp_dir = TempDir::new().map_err(|e| SynopsisError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    check_magic(&bytes[..bytes.len().min(4)], &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| SynopsisError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of `url` when it looks like a file name, else
/// `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
