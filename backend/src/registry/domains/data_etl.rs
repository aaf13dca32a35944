//! Required-field validation of records against a simple schema.

use serde_json::{json, Value};

use super::{objects, output};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

pub struct EtlValidator;

impl Analyzer for EtlValidator {
    fn code(&self) -> &str {
        "data_etl_validator"
    }

    fn name(&self) -> &str {
        "ETL record validator"
    }

    fn description(&self) -> &str {
        "Check records for missing required schema fields"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let schema = match payload.get("schema") {
            None | Some(Value::Null) => Payload::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(AnalyzerError::invalid("schema", "expected an object")),
        };
        let fields = objects(&schema, "fields")?;

        let names: Vec<Value> = fields
            .iter()
            .map(|f| f.get("name").cloned().unwrap_or(Value::Null))
            .collect();
        let required: Vec<&str> = fields
            .iter()
            .filter(|f| f.get("required").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|f| f.get("name").and_then(Value::as_str))
            .collect();

        let records = objects(payload, "records")?;
        let errors: Vec<Value> = records
            .iter()
            .enumerate()
            .filter_map(|(row, record)| {
                let missing: Vec<&str> = required
                    .iter()
                    .copied()
                    .filter(|name| match record.get(*name) {
                        None | Some(Value::Null) => true,
                        Some(Value::String(s)) => s.is_empty(),
                        Some(_) => false,
                    })
                    .collect();
                (!missing.is_empty()).then(|| json!({ "row": row, "missing": missing }))
            })
            .collect();

        Ok(output(json!({
            "domain": self.code(),
            "summary": { "records": records.len(), "errors": errors.len() },
            "errors": errors,
            "fields": names,
        })))
    }
}
