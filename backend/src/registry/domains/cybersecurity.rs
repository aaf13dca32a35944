//! Indicator-of-compromise extraction from free text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;

use super::{output, text};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("valid ipv4 regex"));
static DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:[a-z0-9-]+\.)+[a-z]{2,}\b").expect("valid domain regex"));
static SHA256: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[a-f0-9]{64}\b").expect("valid sha256 regex"));

fn unique_matches(re: &Regex, haystack: &str) -> Vec<String> {
    re.find_iter(haystack)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub struct IndicatorScan;

impl Analyzer for IndicatorScan {
    fn code(&self) -> &str {
        "cybersecurity_indicator_scan"
    }

    fn name(&self) -> &str {
        "Indicator scan"
    }

    fn description(&self) -> &str {
        "Extract IPv4 addresses, domains and SHA-256 hashes from text"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let haystack = text(payload, "text")?;

        Ok(output(json!({
            "domain": self.code(),
            "ioc": {
                "ipv4": unique_matches(&IPV4, haystack),
                "domains": unique_matches(&DOMAIN, haystack),
                "sha256": unique_matches(&SHA256, haystack),
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_sorted_unique_indicators() {
        let hash = "a".repeat(64);
        let input = output(json!({
            "text": format!(
                "beacon to 10.0.0.5 and evil.example.com, again 10.0.0.5; dropped {} via cdn.test.org",
                hash
            )
        }));
        let result = IndicatorScan.analyze(&input).unwrap();
        let ioc = &result["ioc"];

        assert_eq!(ioc["ipv4"], json!(["10.0.0.5"]));
        assert_eq!(ioc["domains"], json!(["cdn.test.org", "evil.example.com"]));
        assert_eq!(ioc["sha256"], json!([hash]));
    }

    #[test]
    fn test_empty_text() {
        let result = IndicatorScan.analyze(&Payload::new()).unwrap();
        assert_eq!(result["ioc"]["ipv4"], json!([]));
    }
}
