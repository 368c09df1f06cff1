//! PDF text-layer extraction via pdfium.
//!
//! pdfium is a C++ library with global state, so every call runs inside
//! `tokio::task::spawn_blocking` and the library is bound once per process.
//!
//! Only the embedded text layer is read. Scanned protocols with no text
//! layer surface as [`SynopsisError::NoExtractableText`] from the extractor.

use crate::error::SynopsisError;
use crate::output::DocumentMetadata;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The text of a PDF, pages joined with `\n`, plus its metadata.
#[derive(Debug, Clone)]
pub struct DocumentText {
    pub text: String,
    pub metadata: DocumentMetadata,
}

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Bind pdfium, trying in order: `PDFIUM_LIB_PATH`, the current directory,
/// then the system loader path.
fn pdfium() -> Result<&'static Pdfium, SynopsisError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path)
                .map_err(|e| SynopsisError::PdfiumBindingFailed(format!("{path}: {e}")))?,
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| SynopsisError::PdfiumBindingFailed(e.to_string()))?,
        };
        debug!("pdfium bound");
        Ok(Pdfium::new(bindings))
    })
}

/// Read the text layer and metadata of the PDF at `pdf_path`.
pub async fn extract_text(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentText, SynopsisError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_text_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| SynopsisError::Internal(format!("Text extraction task panicked: {e}")))?
}

/// Read only the metadata; no model or API key involved.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, SynopsisError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = pdfium()?;
        let document = open(pdfium, &path, pwd.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| SynopsisError::Internal(format!("Metadata task panicked: {e}")))?
}

fn extract_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentText, SynopsisError> {
    let pdfium = pdfium()?;
    let document = open(pdfium, pdf_path, password)?;
    let metadata = read_metadata(&document);

    let mut pages = Vec::with_capacity(metadata.page_count);
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| SynopsisError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("page {}: {e:?}", idx + 1),
        })?;
        pages.push(text.all());
    }

    let text = pages.join("\n");
    if text.trim().is_empty() {
        return Err(SynopsisError::NoExtractableText {
            source_name: pdf_path.display().to_string(),
        });
    }
    info!(
        "Extracted {} chars from {} pages of {}",
        text.len(),
        metadata.page_count,
        pdf_path.display()
    );
    Ok(DocumentText { text, metadata })
}

fn open<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, SynopsisError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| map_load_error(pdf_path.to_path_buf(), password.is_some(), format!("{e:?}")))
}

/// pdfium reports encryption problems as a generic load failure whose debug
/// text mentions the password.
fn map_load_error(path: PathBuf, had_password: bool, detail: String) -> SynopsisError {
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            SynopsisError::WrongPassword { path }
        } else {
            SynopsisError::PasswordRequired { path }
        }
    } else {
        SynopsisError::CorruptPdf { path, detail }
    }
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_depend_on_whether_one_was_given() {
        let p = PathBuf::from("locked.pdf");
        assert!(matches!(
            map_load_error(p.clone(), false, "PdfiumLibraryInternalError(PasswordError)".into()),
            SynopsisError::PasswordRequired { .. }
        ));
        assert!(matches!(
            map_load_error(p, true, "PdfiumLibraryInternalError(PasswordError)".into()),
            SynopsisError::WrongPassword { .. }
        ));
    }

    #[test]
    fn other_load_errors_are_corruption() {
        let e = map_load_error(
            PathBuf::from("bad.pdf"),
            false,
            "PdfiumLibraryInternalError(FormatError)".into(),
        );
        match e {
            SynopsisError::CorruptPdf { detail, .. } => assert!(detail.contains("FormatError")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
