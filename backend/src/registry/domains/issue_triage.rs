//! Keyword triage of issue reports.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;

use super::{output, text};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

/// (label, keywords, priority raised to)
const LABEL_RULES: &[(&str, &[&str], Option<&str>)] = &[
    ("security", &["security", "漏洞", "xss", "csrf", "sql injection"], Some("P0")),
    ("bug", &["crash", "panic", "fatal", "exception"], Some("P0")),
    ("performance", &["performance", "slow", "latency"], Some("P1")),
    ("feature", &["feature", "enhancement", "improvement"], None),
];

const DEFAULT_PRIORITY: &str = "P3";

static UI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:ui|ux)\b").expect("valid ui regex"));
static API: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bapi\b").expect("valid api regex"));
static DATABASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdb\b|database").expect("valid database regex"));

pub struct IssueTriage;

impl Analyzer for IssueTriage {
    fn code(&self) -> &str {
        "programming_issue_triage"
    }

    fn name(&self) -> &str {
        "Issue triage"
    }

    fn description(&self) -> &str {
        "Label, prioritize and route an issue from its title and body"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let haystack = format!(
            "{}\n{}",
            text(payload, "title")?.to_lowercase(),
            text(payload, "body")?.to_lowercase()
        );

        let mut labels = BTreeSet::new();
        let mut priority = DEFAULT_PRIORITY;
        for (label, keywords, raises) in LABEL_RULES {
            if !keywords.iter().any(|k| haystack.contains(k)) {
                continue;
            }
            labels.insert(*label);
            // "P0" < "P1" < ... so the smallest string is the most urgent
            if let Some(p) = raises {
                if *p < priority {
                    priority = *p;
                }
            }
        }

        let mut areas = Vec::new();
        if UI.is_match(&haystack) {
            areas.push("ui/ux");
        }
        if API.is_match(&haystack) {
            areas.push("api");
        }
        if DATABASE.is_match(&haystack) {
            areas.push("database");
        }
        if haystack.contains("mobile") {
            areas.push("mobile");
        }
        if areas.is_empty() {
            areas.push("general");
        }

        Ok(output(json!({
            "domain": self.code(),
            "labels": labels,
            "priority": priority,
            "areas": areas,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triage(title: &str, body: &str) -> Payload {
        IssueTriage
            .analyze(&output(json!({ "title": title, "body": body })))
            .unwrap()
    }

    #[test]
    fn test_highest_priority_wins() {
        let result = triage("App crash", "and it is slow on the API");
        assert_eq!(result["labels"], json!(["bug", "performance"]));
        assert_eq!(result["priority"], "P0");
        assert_eq!(result["areas"], json!(["api"]));
    }

    #[test]
    fn test_defaults() {
        let result = triage("Question", "how do I build it?");
        assert_eq!(result["labels"], json!([]));
        assert_eq!(result["priority"], "P3");
        assert_eq!(result["areas"], json!(["general"]));
    }

    #[test]
    fn test_short_area_tokens_match_whole_words() {
        // "build" and "guide" must not count as ui
        let result = triage("Build guide", "rapid iteration");
        assert_eq!(result["areas"], json!(["general"]));

        let result = triage("Dark mode UI", "mobile db migration");
        assert_eq!(result["areas"], json!(["ui/ux", "database", "mobile"]));
    }

    #[test]
    fn test_feature_keeps_default_priority() {
        let result = triage("Feature request", "");
        assert_eq!(result["labels"], json!(["feature"]));
        assert_eq!(result["priority"], "P3");
    }
}
