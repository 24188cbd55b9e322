//! Document text extraction for uploads and local files.

use std::path::Path;
use thiserror::Error;

/// MIME type accepted by the upload endpoint.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Errors raised while turning a document into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File type is not supported.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    /// PDF parser rejected the document.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// Document parsed but contained no text (for example a scanned PDF).
    #[error("Document contains no extractable text")]
    NoText,
    /// Reading the document failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the text layer of a PDF on a blocking thread.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&bytes))
        .await
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?
}

fn extract_pdf_text_blocking(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
    non_empty(text)
}

fn extract_plain_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    non_empty(String::from_utf8_lossy(bytes).into_owned())
}

fn non_empty(text: String) -> Result<String, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

/// Whether an upload looks like a PDF, judged by content type first and file name second.
pub fn is_pdf(filename: Option<&str>, content_type: Option<&str>) -> bool {
    match content_type {
        Some(kind) if kind.eq_ignore_ascii_case(PDF_CONTENT_TYPE) => true,
        Some(kind) if !kind.eq_ignore_ascii_case("application/octet-stream") => false,
        _ => filename.is_some_and(|name| extension_of(name) == "pdf"),
    }
}

/// Whether `path` has an extension [`load_document`] understands.
pub fn is_supported_path(path: &Path) -> bool {
    matches!(
        path.to_str().map(extension_of).as_deref(),
        Some("pdf" | "txt" | "text" | "md")
    )
}

/// Read a local `.pdf` or plain-text file and return its text.
pub async fn load_document(path: &Path) -> Result<String, ExtractionError> {
    let name = path.to_string_lossy();
    let extension = extension_of(&name);
    match extension.as_str() {
        "pdf" => extract_pdf_text(tokio::fs::read(path).await?).await,
        "txt" | "text" | "md" => extract_plain_text(&tokio::fs::read(path).await?),
        other => Err(ExtractionError::UnsupportedType(other.to_string())),
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}
