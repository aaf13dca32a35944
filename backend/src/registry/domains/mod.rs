//! Built-in domain analyzers.
//!
//! Adding a domain means writing an [`Analyzer`] and listing it in
//! [`builtin_analyzers`]; the dispatcher needs no change.

pub mod automotive_obd;
pub mod construction;
pub mod cybersecurity;
pub mod data_etl;
pub mod devops_logs;
pub mod medical_labs;
pub mod network_latency;
pub mod code_quality;
pub mod issue_triage;

use serde_json::Value;
use std::sync::Arc;

use super::{Analyzer, AnalyzerRegistry, Payload};
use crate::error::AnalyzerError;

/// Every built-in analyzer, in listing order.
pub fn builtin_analyzers() -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(automotive_obd::AutomotiveObd),
        Arc::new(construction::Construction),
        Arc::new(cybersecurity::IndicatorScan),
        Arc::new(data_etl::EtlValidator),
        Arc::new(devops_logs::LogParser),
        Arc::new(medical_labs::MedicalLabs),
        Arc::new(network_latency::LatencyAnalyzer),
        Arc::new(code_quality::CodeQuality),
        Arc::new(issue_triage::IssueTriage),
    ]
}

/// Register the built-in analyzers; returns how many were bound.
pub fn register_builtin(registry: &mut AnalyzerRegistry) -> usize {
    let count = registry.register_all(builtin_analyzers());
    tracing::info!(count, "registered built-in analyzers");
    count
}

// =============================================================================
// Payload access helpers
// =============================================================================

/// Optional number; numeric strings are accepted.
pub(crate) fn number(payload: &Payload, field: &str) -> Result<Option<f64>, AnalyzerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_number(value, field).map(Some),
    }
}

pub(crate) fn as_number(value: &Value, field: &str) -> Result<f64, AnalyzerError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AnalyzerError::invalid(field, "not a finite number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| AnalyzerError::invalid(field, format!("'{}' is not a number", s))),
        other => Err(AnalyzerError::invalid(field, format!("expected a number, got {}", other))),
    }
}

/// Optional string field; missing or null reads as empty.
pub(crate) fn text<'a>(payload: &'a Payload, field: &str) -> Result<&'a str, AnalyzerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(AnalyzerError::invalid(field, "expected a string")),
    }
}

/// Optional array field; missing or null reads as empty.
pub(crate) fn list<'a>(payload: &'a Payload, field: &str) -> Result<&'a [Value], AnalyzerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AnalyzerError::invalid(field, "expected an array")),
    }
}

/// Items of an array field that must be objects.
pub(crate) fn objects<'a>(payload: &'a Payload, field: &str) -> Result<Vec<&'a Payload>, AnalyzerError> {
    list(payload, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .ok_or_else(|| AnalyzerError::invalid(format!("{}[{}]", field, i), "expected an object"))
        })
        .collect()
}

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Build an output mapping from a `json!` object literal.
pub(crate) fn output(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        output(value)
    }

    #[test]
    fn test_builtin_codes_unique() {
        let mut registry = AnalyzerRegistry::new();
        assert_eq!(register_builtin(&mut registry), builtin_analyzers().len());
        assert!(registry.contains("construction"));
        assert!(registry.contains("medical_labs"));
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let p = payload(json!({"a": "12.5", "b": 3, "c": "x", "d": null}));
        assert_eq!(number(&p, "a").unwrap(), Some(12.5));
        assert_eq!(number(&p, "b").unwrap(), Some(3.0));
        assert!(number(&p, "c").is_err());
        assert_eq!(number(&p, "d").unwrap(), None);
        assert_eq!(number(&p, "zzz").unwrap(), None);
    }

    #[test]
    fn test_text_and_list_defaults() {
        let p = payload(json!({"s": "v", "n": 1, "l": [1]}));
        assert_eq!(text(&p, "s").unwrap(), "v");
        assert_eq!(text(&p, "missing").unwrap(), "");
        assert!(text(&p, "n").is_err());
        assert_eq!(list(&p, "l").unwrap().len(), 1);
        assert!(list(&p, "missing").unwrap().is_empty());
        assert!(list(&p, "s").is_err());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.005_1, 2), 1.01);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
