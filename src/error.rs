//! Error types for the edgequake-synopsis library.
//!
//! Two error types reflect two different questions a caller asks:
//!
//! * [`SynopsisError`]: **Fatal**. The extraction cannot produce a synopsis
//!   (bad input file, provider not configured, the model replied with
//!   something that is not a valid synopsis). Returned as
//!   `Err(SynopsisError)` from every `extract*` entry point.
//!
//! * [`SchemaError`]: **Where** a model reply is wrong. Produced by
//!   [`crate::schema::parse_synopsis`] and names the offending field
//!   (`arms[1].dosing_schedule`, `sample_size`, …). Wrapped in
//!   [`SynopsisError::InvalidResponse`] when it surfaces from an extraction
//!   run so the caller also learns which chunk produced it.
//!
//! Nothing here is retried automatically: every failure reaches the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-synopsis library.
#[derive(Debug, Error)]
pub enum SynopsisError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Protocol PDF not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened but carries no text layer (scanned images only).
    #[error("No extractable text in '{source_name}'\nThe protocol looks like a scan; run it through OCR first.")]
    NoExtractableText { source_name: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error that is neither a rate limit nor an
    /// authentication failure.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// LLM API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'\n{detail}")]
    RateLimitExceeded { provider: String, detail: String },

    /// LLM call did not answer within `api_timeout_secs`.
    #[error("API call timed out after {elapsed_ms}ms on chunk {chunk}")]
    ApiTimeout { chunk: usize, elapsed_ms: u64 },

    /// LLM API returned an authentication error (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    // ── Response errors ───────────────────────────────────────────────────
    /// The model answered, but the reply is not a valid synopsis.
    #[error("Model reply for chunk {chunk} is not a valid synopsis: {source}")]
    InvalidResponse {
        chunk: usize,
        #[source]
        source: SchemaError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise the synopsis.
    #[error("Failed to serialise synopsis: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the binary (current working directory).\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SynopsisError {
    /// `true` for the failures that originate at the model provider
    /// (network, quota, credentials, timeout) rather than in our input or
    /// in the model's output.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SynopsisError::LlmApiError { .. }
                | SynopsisError::RateLimitExceeded { .. }
                | SynopsisError::ApiTimeout { .. }
                | SynopsisError::AuthError { .. }
                | SynopsisError::ProviderNotConfigured { .. }
        )
    }
}

/// Why a model reply failed validation.
///
/// `field` values are JSON paths relative to the synopsis object, e.g.
/// `primary_endpoints`, `arms[0].arm_name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The reply contains no parsable JSON.
    #[error("reply is not valid JSON ({detail})")]
    NotJson { detail: String },

    /// The reply is JSON, but not an object.
    #[error("expected a JSON object at the top level, found {found}")]
    NotAnObject { found: String },

    /// A required key is absent.
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    /// A key is present with a value of the wrong type.
    #[error("field '{field}' should be {expected}, found {found}")]
    InvalidField {
        field: String,
        expected: &'static str,
        found: String,
    },
}

impl SchemaError {
    /// The offending field path, when the error is about a specific field.
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::MissingField { field } | SchemaError::InvalidField { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display_names_field() {
        let e = SchemaError::MissingField {
            field: "arms[1].dosing_schedule".into(),
        };
        assert!(e.to_string().contains("arms[1].dosing_schedule"));
        assert_eq!(e.field(), Some("arms[1].dosing_schedule"));
    }

    #[test]
    fn not_json_has_no_field() {
        let e = SchemaError::NotJson {
            detail: "expected value at line 1".into(),
        };
        assert_eq!(e.field(), None);
    }

    #[test]
    fn invalid_response_display_includes_chunk_and_field() {
        let e = SynopsisError::InvalidResponse {
            chunk: 2,
            source: SchemaError::InvalidField {
                field: "sample_size".into(),
                expected: "a non-negative integer",
                found: "\"many\"".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("chunk 2"), "got: {msg}");
        assert!(msg.contains("sample_size"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display() {
        let e = SynopsisError::RateLimitExceeded {
            provider: "openai".into(),
            detail: "429 Too Many Requests".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.is_upstream());
    }

    #[test]
    fn api_timeout_display() {
        let e = SynopsisError::ApiTimeout {
            chunk: 3,
            elapsed_ms: 5000,
        };
        assert!(e.to_string().contains("5000ms"));
        assert!(e.to_string().contains("chunk 3"));
    }

    #[test]
    fn input_errors_are_not_upstream() {
        let e = SynopsisError::NotAPdf {
            path: "protocol.docx".into(),
            magic: *b"PK\x03\x04",
        };
        assert!(!e.is_upstream());
    }
}
