//! Error and warning counts for raw log text.

use serde_json::{json, Value};

use super::{output, text};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

/// Characters of a line used to group repeated errors
const ERROR_KEY_CHARS: usize = 120;
const TOP_ERRORS: usize = 10;

pub struct LogParser;

impl Analyzer for LogParser {
    fn code(&self) -> &str {
        "devops_log_parser"
    }

    fn name(&self) -> &str {
        "Log parser"
    }

    fn description(&self) -> &str {
        "Count errors and warnings and rank repeated error lines"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let log = text(payload, "log_text")?;
        let lines: Vec<&str> = log.lines().collect();

        let errors: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| l.contains("ERROR") || l.contains("Error"))
            .collect();
        let warnings = lines
            .iter()
            .filter(|l| l.contains("WARN") || l.contains("Warning"))
            .count();

        // first-seen order breaks ties
        let mut counts: Vec<(String, usize)> = Vec::new();
        for line in &errors {
            let key: String = line.trim().chars().take(ERROR_KEY_CHARS).collect();
            match counts.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => counts.push((key, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        let top: Vec<Value> = counts
            .into_iter()
            .take(TOP_ERRORS)
            .map(|(line, count)| json!({ "line": line, "count": count }))
            .collect();

        Ok(output(json!({
            "domain": self.code(),
            "counts": {
                "lines": lines.len(),
                "errors": errors.len(),
                "warnings": warnings,
            },
            "top_errors": top,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_ranking() {
        let log = "INFO start\nERROR db timeout\nWARN slow\nError: disk full\nERROR db timeout\n";
        let result = LogParser.analyze(&output(json!({ "log_text": log }))).unwrap();

        assert_eq!(result["counts"], json!({ "lines": 5, "errors": 3, "warnings": 1 }));
        assert_eq!(result["top_errors"][0], json!({ "line": "ERROR db timeout", "count": 2 }));
        assert_eq!(result["top_errors"][1]["line"], "Error: disk full");
    }

    #[test]
    fn test_top_errors_capped() {
        let log: String = (0..15).map(|i| format!("ERROR e{}\n", i)).collect();
        let result = LogParser.analyze(&output(json!({ "log_text": log }))).unwrap();
        assert_eq!(result["top_errors"].as_array().unwrap().len(), 10);
        assert_eq!(result["top_errors"][0]["line"], "ERROR e0");
    }
}
