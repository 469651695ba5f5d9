// src/utils/document.rs

//! Text extraction for uploaded question documents.

use std::{
    fmt,
    io::{Cursor, Read},
    path::Path,
};

use quick_xml::{Reader, events::Event};

/// Upper bound on the inflated size of `word/document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

const BYTE_ORDER_MARK: char = '\u{feff}';

fn too_large(limit: u64) -> DocumentError {
    DocumentError::Unreadable(format!(
        "document.xml expands beyond {} bytes",
        limit
    ))
}

/// Upload formats accepted by the question import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Picks the format from the file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;

        match extension.as_str() {
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum DocumentError {
    UnsupportedType(String),
    Unreadable(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::UnsupportedType(name) => write!(
                f,
                "Invalid file type '{}'. Please upload a .docx or .txt file",
                name
            ),
            DocumentError::Unreadable(reason) => write!(f, "Could not read document: {}", reason),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<zip::result::ZipError> for DocumentError {
    fn from(err: zip::result::ZipError) -> Self {
        DocumentError::Unreadable(err.to_string())
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(err: quick_xml::Error) -> Self {
        DocumentError::Unreadable(err.to_string())
    }
}

impl From<std::io::Error> for DocumentError {
    fn from(err: std::io::Error) -> Self {
        DocumentError::Unreadable(err.to_string())
    }
}

/// Extracts the text lines of an uploaded file, one entry per paragraph.
pub fn extract_lines(file_name: &str, bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    match DocumentKind::from_file_name(file_name) {
        Some(DocumentKind::Docx) => docx_paragraphs(bytes),
        Some(DocumentKind::PlainText) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| DocumentError::Unreadable("text is not valid UTF-8".to_string()))?;
            let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
            Ok(text.lines().map(str::to_string).collect())
        }
        None => Err(DocumentError::UnsupportedType(file_name.to_string())),
    }
}

/// Reads `word/document.xml` out of a .docx container and returns the
/// text of every `w:p` paragraph.
pub fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    docx_paragraphs_within(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn docx_paragraphs_within(bytes: &[u8], limit: u64) -> Result<Vec<String>, DocumentError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let entry = archive.by_name("word/document.xml")?;
    if entry.size() > limit {
        return Err(too_large(limit));
    }

    // The declared size can lie; cap what is actually inflated.
    let mut raw = Vec::new();
    entry.take(limit + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > limit {
        return Err(too_large(limit));
    }
    let xml = String::from_utf8(raw)
        .map_err(|_| DocumentError::Unreadable("document.xml is not valid UTF-8".to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text_run = true,
                b"tab" => current.push('\t'),
                b"br" => current.push(' '),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push(' '),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(e) if in_text_run => {
                let text = e
                    .unescape()
                    .map_err(|err| DocumentError::Unreadable(err.to_string()))?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
