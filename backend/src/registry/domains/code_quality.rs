//! Marker-based code quality score.

use serde_json::{json, Value};

use super::{objects, output, round_to};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

pub struct CodeQuality;

impl Analyzer for CodeQuality {
    fn code(&self) -> &str {
        "programming_code_quality"
    }

    fn name(&self) -> &str {
        "Code quality"
    }

    fn description(&self) -> &str {
        "Lines of code, TODO and FIXME markers and an overall score"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let files = objects(payload, "files")?;
        let mut details = Vec::with_capacity(files.len());
        let (mut total_loc, mut todos, mut fixmes) = (0usize, 0usize, 0usize);

        for file in &files {
            let name = file.get("name").and_then(Value::as_str).unwrap_or("");
            let content = file.get("content").and_then(Value::as_str).unwrap_or("");
            let lines: Vec<&str> = content.lines().collect();
            let loc = lines.len();

            let file_todos = lines.iter().filter(|l| l.contains("TODO")).count();
            let file_fixmes = lines.iter().filter(|l| l.contains("FIXME")).count();
            let avg_line_len = if loc == 0 {
                0.0
            } else {
                let chars: usize = lines.iter().map(|l| l.chars().count()).sum();
                round_to(chars as f64 / loc as f64, 2)
            };

            total_loc += loc;
            todos += file_todos;
            fixmes += file_fixmes;
            details.push(json!({
                "file": name,
                "loc": loc,
                "avg_line_len": avg_line_len,
                "todos": file_todos,
                "fixmes": file_fixmes,
            }));
        }

        let score = 100usize.saturating_sub(todos * 2 + fixmes * 3);

        Ok(output(json!({
            "domain": self.code(),
            "summary": {
                "files": files.len(),
                "total_loc": total_loc,
                "todos": todos,
                "fixmes": fixmes,
                "score": score,
            },
            "details": details,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_details() {
        let input = output(json!({ "files": [
            { "name": "a.rs", "content": "fn a() {}\n// TODO x\n// FIXME y\n" },
            { "name": "b.rs", "content": "" }
        ]}));
        let result = CodeQuality.analyze(&input).unwrap();

        assert_eq!(
            result["summary"],
            json!({ "files": 2, "total_loc": 3, "todos": 1, "fixmes": 1, "score": 95 })
        );
        assert_eq!(result["details"][0]["avg_line_len"], 9.33);
        assert_eq!(result["details"][1]["loc"], 0);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let content = "TODO\n".repeat(60);
        let input = output(json!({ "files": [{ "name": "x", "content": content }] }));
        let result = CodeQuality.analyze(&input).unwrap();
        assert_eq!(result["summary"]["score"], 0);
    }
}
