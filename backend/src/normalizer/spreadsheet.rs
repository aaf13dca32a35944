//! Spreadsheet workbooks (xlsx, xlsm, xlsb, xls, ods).
//!
//! Every sheet is read with its first row as header. Sheets are read in
//! workbook order and the data row cap applies to the whole workbook, so
//! later sheets may be cut short or skipped. When the workbook has more than
//! one sheet each row carries the sheet name under [`SHEET_KEY`].
//!
//! Workbook support is the optional `spreadsheet` feature. Without it the
//! extractor answers with a soft notice instead of failing the request.

#[cfg(not(feature = "spreadsheet"))]
use super::ContentKind;
use super::ExtractedContent;
use crate::error::NormalizeResult;

/// Row key holding the source sheet name in multi-sheet workbooks.
pub const SHEET_KEY: &str = "_sheet";

#[cfg(feature = "spreadsheet")]
pub fn extract(bytes: &[u8], max_rows: usize, text_budget: usize) -> NormalizeResult<ExtractedContent> {
    use calamine::{open_workbook_auto_from_rs, Reader};
    use serde_json::Value;
    use std::io::Cursor;

    use super::Row;
    use crate::error::NormalizeError;

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| NormalizeError::parse("spreadsheet", e))?;

    let sheet_names = workbook.sheet_names();
    let tag_sheet = sheet_names.len() > 1;
    let mut rows: Vec<Row> = Vec::new();
    let mut truncated = false;

    for name in &sheet_names {
        if truncated {
            break;
        }
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %name, "skipping unreadable sheet: {}", e);
                continue;
            }
        };

        let mut lines = range.rows();
        let Some(header_cells) = lines.next() else {
            continue;
        };
        let headers: Vec<String> = header_cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let h = cell.to_string().trim().to_string();
                if h.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    h
                }
            })
            .collect();

        for line in lines {
            if line.iter().all(|c| c.to_string().trim().is_empty()) {
                continue;
            }
            if rows.len() == max_rows {
                truncated = true;
                break;
            }

            let mut row: Row = headers
                .iter()
                .zip(line.iter())
                .map(|(h, cell)| (h.clone(), cell_value(cell)))
                .collect();
            if tag_sheet {
                row.insert(SHEET_KEY.to_string(), Value::String(name.clone()));
            }
            rows.push(row);
        }
    }

    tracing::debug!(sheets = sheet_names.len(), rows = rows.len(), "extracted workbook");
    Ok(ExtractedContent::table(rows, truncated, text_budget))
}

#[cfg(feature = "spreadsheet")]
fn cell_value(cell: &calamine::Data) -> serde_json::Value {
    use calamine::Data;
    use serde_json::Value;

    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(not(feature = "spreadsheet"))]
pub fn extract(_bytes: &[u8], _max_rows: usize, _text_budget: usize) -> NormalizeResult<ExtractedContent> {
    Ok(ExtractedContent::unavailable(
        ContentKind::Table,
        "spreadsheet support is not enabled in this build",
    ))
}

/// Whether workbook parsing is compiled in.
pub fn is_available() -> bool {
    cfg!(feature = "spreadsheet")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_matches_feature() {
        assert_eq!(is_available(), cfg!(feature = "spreadsheet"));
    }

    #[cfg(feature = "spreadsheet")]
    fn fixture(name: &str) -> Vec<u8> {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name);
        std::fs::read(path).unwrap()
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_first_row_is_header() {
        let content = extract(&fixture("inventory.xlsx"), 10, 8000).unwrap();

        assert_eq!(content.kind, crate::normalizer::ContentKind::Table);
        assert!(!content.truncated);
        // blank row 4 skipped
        assert_eq!(content.rows.len(), 3);

        let first = &content.rows[0];
        assert_eq!(first["item"], "bolt");
        assert_eq!(first["column_2"], "M8");
        assert_eq!(first["qty"].as_f64(), Some(120.0));
        assert!(!first.contains_key(SHEET_KEY));

        assert_eq!(content.rows[1]["qty"].as_f64(), Some(2.5));
        assert!(content.rows[2]["column_2"].is_null());
        assert!(content.text.contains(r#""item":"washer""#));
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_multi_sheet_rows_tagged_in_order() {
        let content = extract(&fixture("three_sheets.xlsx"), 100, 8000).unwrap();

        assert_eq!(content.rows.len(), 15);
        assert!(!content.truncated);
        assert_eq!(content.rows[0][SHEET_KEY], "North");
        assert_eq!(content.rows[5][SHEET_KEY], "South");
        assert_eq!(content.rows[14][SHEET_KEY], "West");
        assert_eq!(content.rows[14]["n"].as_f64(), Some(5.0));
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_row_cap_spans_the_workbook() {
        let content = extract(&fixture("three_sheets.xlsx"), 2, 8000).unwrap();
        assert_eq!(content.rows.len(), 2);
        assert!(content.truncated);
        assert!(content.rows.iter().all(|r| r[SHEET_KEY] == "North"));

        // cap reached exactly at a sheet boundary still reports the cut
        let content = extract(&fixture("three_sheets.xlsx"), 5, 8000).unwrap();
        assert_eq!(content.rows.len(), 5);
        assert!(content.truncated);

        let content = extract(&fixture("three_sheets.xlsx"), 7, 8000).unwrap();
        assert_eq!(content.rows.len(), 7);
        assert_eq!(content.rows[6][SHEET_KEY], "South");
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_garbage_workbook_is_parse_error() {
        let err = extract(b"not a workbook", 10, 100).unwrap_err();
        assert!(err.to_string().contains("spreadsheet"));
    }

    #[cfg(not(feature = "spreadsheet"))]
    #[test]
    fn test_missing_capability_is_soft() {
        let content = extract(b"anything", 10, 100).unwrap();
        assert_eq!(content.kind, ContentKind::Table);
        assert!(content.rows.is_empty());
        assert!(content.notice.is_some());
    }
}
