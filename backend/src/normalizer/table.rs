//! Delimited table parsing with encoding and delimiter auto-detection.
//!
//! Rows become header -> value mappings. Cell values are kept as strings.

use serde_json::Value;

use super::Row;
use crate::error::{NormalizeError, NormalizeResult};

const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub rows: Vec<Row>,
    pub headers: Vec<String>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or forced delimiter
    pub delimiter: char,
    /// More data rows existed than the cap allowed
    pub truncated: bool,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the given encoding, lossily.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match encoding.to_lowercase().as_str() {
        // WHATWG maps the latin1 labels onto windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" | "latin9" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Ties and header lines without any candidate resolve to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &CANDIDATE_DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a delimited table, keeping at most `max_rows` data rows.
///
/// Ragged rows (field count differs from the header) fail with a parse
/// error naming the offending line.
pub fn parse_table(
    bytes: &[u8],
    delimiter: Option<char>,
    max_rows: usize,
) -> NormalizeResult<ParsedTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| NormalizeError::parse("csv", e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(NormalizeError::parse("csv", "no header row"));
    }

    let mut rows = Vec::new();
    let mut truncated = false;

    for record in reader.records() {
        let record = record.map_err(|e| match e.position() {
            Some(pos) => NormalizeError::parse("csv", format!("line {}: {}", pos.line(), e)),
            None => NormalizeError::parse("csv", e),
        })?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        if rows.len() == max_rows {
            truncated = true;
            break;
        }

        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(ParsedTable {
        rows,
        headers,
        encoding,
        delimiter,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let parsed = parse_table(b"name;age\nAlice;30\nBob;25", None, 200).unwrap();

        assert_eq!(parsed.delimiter, ';');
        assert_eq!(parsed.headers, vec!["name", "age"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["name"], "Alice");
        assert_eq!(parsed.rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values() {
        let parsed = parse_table(b"name,value\n\"Alice\",\"Hello, World\"", None, 200).unwrap();
        assert_eq!(parsed.rows[0]["value"], "Hello, World");
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let err = parse_table(b"a,b\n1,2\n1,2,3\n", None, 200).unwrap_err();
        match err {
            NormalizeError::Parse { format, message } => {
                assert_eq!(format, "csv");
                assert!(message.contains("line 3"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        assert!(parse_table(b"", None, 200).is_err());
    }

    #[test]
    fn test_rows_capped() {
        let mut csv = String::from("n\n");
        for i in 0..10 {
            csv.push_str(&format!("{}\n", i));
        }
        let parsed = parse_table(csv.as_bytes(), None, 3).unwrap();

        assert_eq!(parsed.rows.len(), 3);
        assert!(parsed.truncated);
        assert_eq!(parsed.rows[2]["n"], "2");
    }

    #[test]
    fn test_exact_cap_not_truncated() {
        let parsed = parse_table(b"n\n1\n2\n", None, 2).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert!(!parsed.truncated);
    }

    #[test]
    fn test_forced_tab_delimiter() {
        let parsed = parse_table(b"a\tb\n1\t2", Some('\t'), 200).unwrap();
        assert_eq!(parsed.rows[0]["b"], "2");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_bom_stripped() {
        let parsed = parse_table(b"\xEF\xBB\xBFa,b\n1,2", None, 200).unwrap();
        assert_eq!(parsed.headers[0], "a");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_keeps_latin1_symbols() {
        let bytes: &[u8] = &[0xA4, 0xA6, 0xBD];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "¤¦½");
        assert_eq!(decode_content(bytes, "iso-8859-15"), "€Šœ");
    }
}
