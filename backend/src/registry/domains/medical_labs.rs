//! Lab results checked against their reference ranges.

use serde_json::{json, Value};

use super::{as_number, objects, output};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

const DISCLAIMER: &str = "Educational only, not a diagnosis";

pub struct MedicalLabs;

fn required(lab: &Payload, index: usize, field: &str) -> Result<f64, AnalyzerError> {
    let label = format!("labs[{}].{}", index, field);
    match lab.get(field) {
        None | Some(Value::Null) => Err(AnalyzerError::MissingField(label)),
        Some(value) => as_number(value, &label),
    }
}

impl Analyzer for MedicalLabs {
    fn code(&self) -> &str {
        "medical_labs"
    }

    fn name(&self) -> &str {
        "Medical labs"
    }

    fn description(&self) -> &str {
        "Flag lab values outside their reference range"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let labs = objects(payload, "labs")?;
        let mut results = Vec::with_capacity(labs.len());
        let mut alerts = 0;

        for (i, lab) in labs.iter().enumerate() {
            let value = required(lab, i, "value")?;
            let low = required(lab, i, "ref_low")?;
            let high = required(lab, i, "ref_high")?;

            let status = if value < low {
                "low"
            } else if value > high {
                "high"
            } else {
                "normal"
            };
            if status != "normal" {
                alerts += 1;
            }

            results.push(json!({
                "name": lab.get("name").cloned().unwrap_or(Value::Null),
                "value": value,
                "unit": lab.get("unit").and_then(Value::as_str).unwrap_or(""),
                "range": [low, high],
                "status": status,
            }));
        }

        Ok(output(json!({
            "domain": self.code(),
            "summary": { "total": labs.len(), "alerts": alerts },
            "results": results,
            "disclaimer": DISCLAIMER,
        })))
    }
}
