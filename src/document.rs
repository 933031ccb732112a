use std::path::Path;

use clap::ValueEnum;
use tracing::debug;

use crate::error::CaseError;

/// The three source document types of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    /// Property title extract (STARS / SSCT)
    Property,
    /// Registry and litigation extract (SCCB / ACRA)
    Registry,
    /// Consumer credit bureau report (CBS)
    Credit,
}

/// Read a document as text. PDFs go through the text extractor; anything else
/// is taken as (lossy) UTF-8.
pub fn read_document(path: &Path) -> Result<String, CaseError> {
    if !path.exists() {
        return Err(CaseError::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| CaseError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = if is_pdf(path, &bytes) {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| CaseError::Pdf {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    debug!(path = %path.display(), chars = text.len(), "document read");
    Ok(normalize(&text))
}

fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    let by_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    by_ext || bytes.starts_with(b"%PDF")
}

/// Pages are separated by form feeds; treat them and CRLF as plain newlines.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace(['\x0C', '\r'], "\n")
}

// ── Tests ──
