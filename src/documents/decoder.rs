//! Document decoding
//!
//! Turns the raw bytes of an uploaded file into plain text. The format is
//! chosen from the file extension; decoding failures come back as typed
//! errors and the chunker is never reached.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::Path;

use crate::errors::{RagError, Result};

/// Largest upload accepted (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Main body part inside a .docx archive
const DOCX_BODY: &str = "word/document.xml";

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Txt,
    Docx,
}

impl DocumentFormat {
    /// Detect the format from a filename's extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" => Ok(DocumentFormat::Txt),
            "docx" => Ok(DocumentFormat::Docx),
            _ => Err(RagError::UnsupportedFormat {
                filename: filename.to_string(),
                extension,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Txt => "txt",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// Check an upload before decoding: known format and within the size limit
pub fn validate_upload(filename: &str, size: u64) -> Result<DocumentFormat> {
    let format = DocumentFormat::from_filename(filename)?;
    if size > MAX_UPLOAD_BYTES {
        return Err(RagError::FileTooLarge {
            filename: filename.to_string(),
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(format)
}

/// Decode a file's bytes, detecting the format from its name
pub fn decode_document(bytes: &[u8], filename: &str) -> Result<String> {
    let format = DocumentFormat::from_filename(filename)?;
    decode(bytes, format, filename)
}

/// Decode bytes of a declared format
pub fn decode(bytes: &[u8], format: DocumentFormat, filename: &str) -> Result<String> {
    let decoded = match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Txt => extract_txt(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
    };

    decoded.map_err(|reason| RagError::Decode {
        filename: filename.to_string(),
        reason,
    })
}

fn extract_txt(bytes: &[u8]) -> std::result::Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("not valid UTF-8: {}", e))
}

fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    // pdf-extract panics on some malformed inputs
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("error processing PDF: {}", e)),
        Err(_) => Err("error processing PDF: parser aborted".to_string()),
    }
}

fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("error processing DOCX: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| format!("error processing DOCX: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("error processing DOCX: {}", e))?;

    docx_xml_to_text(&xml)
}

/// Extract paragraph text from a WordprocessingML body, one line per paragraph
pub fn docx_xml_to_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| format!("error processing DOCX: {}", e))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "error processing DOCX at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(DocumentFormat::from_filename("a.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("notes.txt").unwrap(), DocumentFormat::Txt);
        assert_eq!(DocumentFormat::from_filename("r.docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn test_unsupported_format() {
        let err = DocumentFormat::from_filename("slides.pptx").unwrap_err();
        match err {
            RagError::UnsupportedFormat { filename, extension } => {
                assert_eq!(filename, "slides.pptx");
                assert_eq!(extension, "pptx");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(DocumentFormat::from_filename("README").is_err());
    }

    #[test]
    fn test_validate_upload_size_limit() {
        assert!(validate_upload("a.txt", MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_upload("a.txt", MAX_UPLOAD_BYTES + 1),
            Err(RagError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_txt() {
        let text = decode_document("hello\nworld".as_bytes(), "a.txt").unwrap();
        assert_eq!(text, "hello\nworld");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_document(&[0xff, 0xfe, 0x00], "bad.txt").unwrap_err();
        assert!(matches!(err, RagError::Decode { ref filename, .. } if filename == "bad.txt"));
    }

    #[test]
    fn test_decode_corrupt_docx() {
        let err = decode_document(b"definitely not a zip", "broken.docx").unwrap_err();
        assert!(matches!(err, RagError::Decode { .. }));
    }

    #[test]
    fn test_decode_corrupt_pdf() {
        let err = decode_document(b"%PDF-1.4 garbage", "broken.pdf").unwrap_err();
        assert!(matches!(err, RagError::Decode { .. }));
    }

    #[test]
    fn test_docx_xml_to_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>First &amp; foremost</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t><w:tab/><w:t xml:space="preserve">line</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = docx_xml_to_text(xml).unwrap();
        assert_eq!(text, "First & foremost\nSecond\tline\n");
    }
}
