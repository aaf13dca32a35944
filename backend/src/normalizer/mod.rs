//! Format normalizer: uploaded file -> text or bounded table.
//!
//! Dispatch is by filename suffix, falling back to the declared media type
//! when the suffix is unknown. Content is never sniffed.
//!
//! | Kind            | Suffixes                         | Output                 |
//! |-----------------|----------------------------------|------------------------|
//! | Image           | png, jpg, jpeg, gif, webp        | routed to vision       |
//! | PDF             | pdf                              | page text              |
//! | Word document   | docx                             | paragraph text         |
//! | Delimited table | csv, tsv                         | header -> value rows   |
//! | Spreadsheet     | xlsx, xlsm, xlsb, xls, ods       | rows per sheet         |
//! | Plain text      | txt, md, log, json               | decoded text           |

pub mod document;
pub mod spreadsheet;
pub mod table;

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::config::Limits;
use crate::error::{NormalizeError, NormalizeResult};

pub use table::{decode_content, detect_delimiter, detect_encoding};

/// A table row: header -> cell value.
pub type Row = Map<String, Value>;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    /// Media type declared by the client, if any
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: None,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Lowercased filename suffix without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Media type with the same precedence as [`FileKind::detect`]: a known
    /// suffix wins over the declared type.
    pub fn resolved_media_type(&self) -> String {
        let guessed = mime_guess::from_path(&self.filename)
            .first()
            .map(|m| m.essence_str().to_string());
        let declared = self
            .media_type
            .as_deref()
            .map(media_essence)
            .filter(|m| !m.is_empty() && m != "application/octet-stream");

        let known_suffix = self
            .extension()
            .as_deref()
            .and_then(FileKind::from_extension)
            .is_some();
        let resolved = if known_suffix {
            guessed.or(declared)
        } else {
            declared.or(guessed)
        };
        resolved.unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// Handling category of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    WordDocument,
    /// Delimited table; `Some` when the suffix fixes the delimiter
    DelimitedTable(Option<char>),
    Spreadsheet,
    PlainText,
}

impl FileKind {
    /// Classify an upload by suffix, then by declared media type.
    pub fn detect(upload: &Upload) -> NormalizeResult<Self> {
        let ext = upload.extension();
        if let Some(kind) = ext.as_deref().and_then(Self::from_extension) {
            return Ok(kind);
        }

        if let Some(kind) = upload.media_type.as_deref().and_then(Self::from_media_type) {
            return Ok(kind);
        }

        Err(NormalizeError::UnsupportedFormat(
            ext.map(|e| format!(".{}", e))
                .or_else(|| upload.media_type.clone())
                .unwrap_or_else(|| upload.filename.clone()),
        ))
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" | "jpg" | "jpeg" | "gif" | "webp" => Some(FileKind::Image),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::WordDocument),
            "csv" => Some(FileKind::DelimitedTable(None)),
            "tsv" => Some(FileKind::DelimitedTable(Some('\t'))),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileKind::Spreadsheet),
            "txt" | "md" | "log" | "json" => Some(FileKind::PlainText),
            _ => None,
        }
    }

    fn from_media_type(media_type: &str) -> Option<Self> {
        match media_essence(media_type).as_str() {
            "image/png" | "image/jpeg" | "image/gif" | "image/webp" => Some(FileKind::Image),
            "application/pdf" => Some(FileKind::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileKind::WordDocument)
            }
            "text/csv" => Some(FileKind::DelimitedTable(None)),
            "text/tab-separated-values" => Some(FileKind::DelimitedTable(Some('\t'))),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(FileKind::Spreadsheet),
            "text/plain" | "text/markdown" | "application/json" => Some(FileKind::PlainText),
            _ => None,
        }
    }

    pub fn is_table(self) -> bool {
        matches!(self, FileKind::DelimitedTable(_) | FileKind::Spreadsheet)
    }
}

/// `type/subtype` without parameters, lowercased.
fn media_essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Shape of extracted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Table,
}

/// Analyzer-consumable content extracted from an upload.
///
/// `text` is always what the reasoner sees: the document text for text
/// content, a compact JSON rendering of `rows` for tables. Both are bounded.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedContent {
    pub kind: ContentKind,
    pub text: String,
    pub rows: Vec<Row>,
    /// Text or rows were cut to fit the configured caps
    pub truncated: bool,
    /// Soft error from an optional capability that is not available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ExtractedContent {
    pub fn text(text: String, budget: usize) -> Self {
        let (text, truncated) = truncate_chars(&text, budget);
        Self {
            kind: ContentKind::Text,
            text,
            rows: Vec::new(),
            truncated,
            notice: None,
        }
    }

    pub fn table(rows: Vec<Row>, rows_truncated: bool, budget: usize) -> Self {
        let rendered = serde_json::to_string(&rows).unwrap_or_default();
        let (text, text_truncated) = truncate_chars(&rendered, budget);
        Self {
            kind: ContentKind::Table,
            text,
            rows,
            truncated: rows_truncated || text_truncated,
            notice: None,
        }
    }

    /// Table placeholder carrying a soft error instead of data.
    pub fn unavailable(kind: ContentKind, notice: impl Into<String>) -> Self {
        Self {
            kind,
            text: String::new(),
            rows: Vec::new(),
            truncated: false,
            notice: Some(notice.into()),
        }
    }
}

/// Cut `text` to at most `budget` characters. Returns whether it was cut.
pub fn truncate_chars(text: &str, budget: usize) -> (String, bool) {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Converts uploads into [`ExtractedContent`] under the configured caps.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_rows: usize,
    text_budget: usize,
}

impl Normalizer {
    pub fn new(limits: &Limits) -> Self {
        Self {
            max_rows: limits.max_rows,
            text_budget: limits.text_budget,
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn text_budget(&self) -> usize {
        self.text_budget
    }

    /// Extract text or table content from an upload.
    ///
    /// Images have no text extraction and are rejected here; the
    /// orchestrator sends them to the reasoner's vision path instead.
    pub fn extract(&self, upload: &Upload) -> NormalizeResult<ExtractedContent> {
        match FileKind::detect(upload)? {
            FileKind::Image => Err(NormalizeError::UnsupportedFormat(
                "images have no text extraction".to_string(),
            )),
            FileKind::Pdf => {
                let text = document::pdf_text(&upload.bytes)?;
                Ok(ExtractedContent::text(text, self.text_budget))
            }
            FileKind::WordDocument => {
                let text = document::docx_text(&upload.bytes)?;
                Ok(ExtractedContent::text(text, self.text_budget))
            }
            FileKind::DelimitedTable(delimiter) => {
                let parsed = table::parse_table(&upload.bytes, delimiter, self.max_rows)?;
                Ok(ExtractedContent::table(
                    parsed.rows,
                    parsed.truncated,
                    self.text_budget,
                ))
            }
            FileKind::Spreadsheet => spreadsheet::extract(&upload.bytes, self.max_rows, self.text_budget),
            FileKind::PlainText => {
                let encoding = detect_encoding(&upload.bytes);
                let text = decode_content(&upload.bytes, &encoding);
                Ok(ExtractedContent::text(text, self.text_budget))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&Limits::default())
    }

    #[test]
    fn test_detect_by_suffix_case_insensitive() {
        let kind = FileKind::detect(&Upload::new("REPORT.PDF", vec![])).unwrap();
        assert_eq!(kind, FileKind::Pdf);
        assert_eq!(
            FileKind::detect(&Upload::new("photo.JPeG", vec![])).unwrap(),
            FileKind::Image
        );
        assert_eq!(
            FileKind::detect(&Upload::new("data.tsv", vec![])).unwrap(),
            FileKind::DelimitedTable(Some('\t'))
        );
    }

    #[test]
    fn test_suffix_wins_over_media_type() {
        let upload = Upload::new("table.csv", vec![]).with_media_type("image/png");
        assert_eq!(
            FileKind::detect(&upload).unwrap(),
            FileKind::DelimitedTable(None)
        );
    }

    #[test]
    fn test_media_type_fallback() {
        let upload = Upload::new("blob", vec![]).with_media_type("image/webp");
        assert_eq!(FileKind::detect(&upload).unwrap(), FileKind::Image);

        let upload = Upload::new("export", vec![]).with_media_type("text/csv; charset=utf-8");
        assert_eq!(
            FileKind::detect(&upload).unwrap(),
            FileKind::DelimitedTable(None)
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = FileKind::detect(&Upload::new("setup.exe", vec![])).unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(ref s) if s == ".exe"));

        let err = normalizer()
            .extract(&Upload::new("notes.doc", b"binary".to_vec()))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_csv_normalizes_to_rows() {
        let content = normalizer()
            .extract(&Upload::new("t.csv", b"a,b\n1,2\n".to_vec()))
            .unwrap();

        assert_eq!(content.kind, ContentKind::Table);
        assert_eq!(content.rows.len(), 1);
        assert_eq!(Value::Object(content.rows[0].clone()), serde_json::json!({"a": "1", "b": "2"}));
        assert_eq!(content.text, r#"[{"a":"1","b":"2"}]"#);
        assert!(!content.truncated);
    }

    #[test]
    fn test_plain_text_truncated_to_budget() {
        let limits = Limits {
            text_budget: 5,
            ..Limits::default()
        };
        let content = Normalizer::new(&limits)
            .extract(&Upload::new("notes.txt", "héllo world".as_bytes().to_vec()))
            .unwrap();

        assert_eq!(content.kind, ContentKind::Text);
        assert_eq!(content.text.chars().count(), 5);
        assert!(content.truncated);
    }

    #[test]
    fn test_image_not_extracted() {
        let err = normalizer()
            .extract(&Upload::new("x.png", vec![0x89, 0x50]))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("ééé", 2), ("éé".to_string(), true));
        assert_eq!(truncate_chars("abc", 3), ("abc".to_string(), false));
        assert_eq!(truncate_chars("", 0), (String::new(), false));
    }

    #[test]
    fn test_resolved_media_type() {
        assert_eq!(Upload::new("a.png", vec![]).resolved_media_type(), "image/png");
        assert_eq!(
            Upload::new("a.bin", vec![])
                .with_media_type("image/gif")
                .resolved_media_type(),
            "image/gif"
        );
        assert_eq!(
            Upload::new("photo.png", vec![])
                .with_media_type("text/plain")
                .resolved_media_type(),
            "image/png"
        );
        assert_eq!(
            Upload::new("blob", vec![])
                .with_media_type("image/webp; q=1")
                .resolved_media_type(),
            "image/webp"
        );
    }

    #[test]
    fn test_images_limited_to_vision_formats() {
        let err = FileKind::detect(&Upload::new("scan.bmp", vec![])).unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(ref s) if s == ".bmp"));

        let upload = Upload::new("blob", vec![]).with_media_type("image/tiff");
        assert!(matches!(
            FileKind::detect(&upload),
            Err(NormalizeError::UnsupportedFormat(_))
        ));
    }
}
