//! Text extraction from PDF and Word documents.

use crate::error::{NormalizeError, NormalizeResult};

/// Inserted between the text of consecutive PDF pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Concatenate the text of every PDF page that has any.
///
/// Pages without extractable text (scans, blank pages) are skipped. A PDF
/// that yields no text at all produces an empty string, not an error.
pub fn pdf_text(bytes: &[u8]) -> NormalizeResult<String> {
    // pdf-extract can panic on malformed fonts
    let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| NormalizeError::parse("pdf", "extractor panicked on malformed content"))?
    .map_err(|e| NormalizeError::parse("pdf", e))?;

    let total = pages.len();
    let text = join_pages(pages);

    tracing::debug!(pages = total, chars = text.len(), "extracted pdf text");
    Ok(text)
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Concatenate non-blank body paragraphs of a `.docx`, in document order.
pub fn docx_text(bytes: &[u8]) -> NormalizeResult<String> {
    let doc = docx_rs::read_docx(bytes).map_err(|e| NormalizeError::parse("docx", e))?;

    let paragraphs: Vec<String> = doc
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            docx_rs::DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    tracing::debug!(paragraphs = paragraphs.len(), "extracted docx text");
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut out = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run(run, &mut out),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        push_run(run, &mut out);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_run(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        if let docx_rs::RunChild::Text(text) = child {
            out.push_str(&text.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_skips_blank_pages() {
        let pages = vec![
            "First page\n".to_string(),
            "   \n".to_string(),
            String::new(),
            "Third page".to_string(),
        ];
        assert_eq!(join_pages(pages), "First page\n\nThird page");
    }

    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let err = pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, NormalizeError::Parse { ref format, .. } if format == "pdf"));
    }

    #[test]
    fn test_docx_paragraphs_in_order() {
        let mut buf = std::io::Cursor::new(Vec::new());
        docx_rs::Docx::new()
            .add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("Site survey")),
            )
            .add_paragraph(docx_rs::Paragraph::new())
            .add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("Two floors")),
            )
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = docx_text(buf.get_ref()).unwrap();
        assert_eq!(text, "Site survey\nTwo floors");
    }

    #[test]
    fn test_garbage_docx_is_parse_error() {
        assert!(docx_text(b"PK not really").is_err());
    }
}
