//! Text extraction for uploaded files.
//!
//! Dispatches on the lower-cased file extension: `.txt` is read as strict
//! UTF-8 and `.pdf` goes through `pdf-extract`. Extracted text is passed
//! through [`clean_text`] before it reaches the chunker.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Extraction failure. Never retried by the caller.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file format: {0:?} (expected .txt or .pdf)")]
    UnsupportedFormat(String),
    #[error("text file is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read `path` from disk and extract its text.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format_of(&filename)?;
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    extract_bytes(&bytes, &filename)
}

/// Extract raw text from in-memory file contents. `filename` selects the format.
pub fn extract_bytes(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    match format_of(filename)? {
        Format::Text => Ok(String::from_utf8(bytes.to_vec())?),
        Format::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
    }
}

enum Format {
    Text,
    Pdf,
}

fn format_of(filename: &str) -> Result<Format, ExtractError> {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => Ok(Format::Text),
        "pdf" => Ok(Format::Pdf),
        _ => Err(ExtractError::UnsupportedFormat(ext)),
    }
}

/// Collapse whitespace runs to one space, drop characters outside
/// word characters, whitespace and `.,!?-`, then trim.
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^\w\s.,!?\-]").unwrap());

    let collapsed = whitespace.replace_all(text, " ");
    disallowed.replace_all(&collapsed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_whitespace_and_strips_symbols() {
        let raw = "Hello,\n\n  world!\tIt's   50% (roughly) done - ok?";
        assert_eq!(clean_text(raw), "Hello, world! Its 50 roughly done - ok?");
    }

    #[test]
    fn clean_keeps_unicode_word_characters() {
        assert_eq!(clean_text("café  naïve 日本"), "café naïve 日本");
    }

    #[test]
    fn clean_empty_and_blank() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn txt_is_read_as_utf8() {
        let text = extract_bytes("plain text".as_bytes(), "notes.TXT").unwrap();
        assert_eq!(text, "plain text");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = extract_bytes(&[0xff, 0xfe, 0x00], "bad.txt").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidUtf8(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = extract_bytes(b"{}", "data.json").unwrap_err();
        match err {
            ExtractError::UnsupportedFormat(ext) => assert_eq!(ext, "json"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            extract_bytes(b"x", "README").unwrap_err(),
            ExtractError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn garbage_pdf_is_a_pdf_error() {
        let err = extract_bytes(b"not a pdf", "broken.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "on disk").unwrap();
        assert_eq!(extract_file(&path).unwrap(), "on disk");

        let missing = dir.path().join("missing.txt");
        assert!(matches!(extract_file(&missing).unwrap_err(), ExtractError::Io { .. }));
        assert!(matches!(
            extract_file(&dir.path().join("missing.doc")).unwrap_err(),
            ExtractError::UnsupportedFormat(_)
        ));
    }
}
