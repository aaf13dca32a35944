//! OBD-II diagnostic trouble code lookup.

use serde_json::{json, Value};

use super::{list, output};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

const KNOWN_CODES: &[(&str, &str)] = &[
    ("P0300", "Random/Multiple Cylinder Misfire"),
    ("P0171", "System Too Lean (Bank 1)"),
    ("P0420", "Catalyst Efficiency Below Threshold"),
    ("P0442", "EVAP small leak"),
];

pub struct AutomotiveObd;

impl Analyzer for AutomotiveObd {
    fn code(&self) -> &str {
        "automotive_obd"
    }

    fn name(&self) -> &str {
        "Automotive OBD-II"
    }

    fn description(&self) -> &str {
        "Describe OBD-II trouble codes and suggest checks"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let codes: Vec<String> = list(payload, "codes")?
            .iter()
            .map(|c| match c {
                Value::String(s) => s.trim().to_uppercase(),
                other => other.to_string(),
            })
            .collect();

        let mapped: Vec<Value> = codes
            .iter()
            .map(|code| {
                let description = KNOWN_CODES
                    .iter()
                    .find(|(c, _)| *c == code.as_str())
                    .map(|(_, d)| *d)
                    .unwrap_or("Unknown");
                json!({ "code": code, "description": description })
            })
            .collect();

        let mut suggestions = Vec::new();
        if codes.iter().any(|c| c == "P0171") {
            suggestions.push("Check for vacuum leaks, the MAF sensor and fuel pressure");
        }
        if codes.iter().any(|c| c == "P0420") {
            suggestions.push("Inspect the catalytic converter and its oxygen sensors");
        }

        Ok(output(json!({
            "domain": self.code(),
            "inputs": payload,
            "codes": mapped,
            "suggestions": suggestions,
        })))
    }
}
