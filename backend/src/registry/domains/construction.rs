//! Building cost, material and duration estimates.

use serde_json::json;

use super::{number, output, round_to, text};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

/// Cost per m2 by structure type
fn unit_cost(structure: &str) -> f64 {
    match structure {
        "steel" => 300.0,
        _ => 350.0,
    }
}

/// Finishing surcharge per m2
fn finish_addon(finish: &str) -> f64 {
    match finish {
        "basic" => 0.0,
        "premium" => 160.0,
        _ => 80.0,
    }
}

pub struct Construction;

impl Analyzer for Construction {
    fn code(&self) -> &str {
        "construction"
    }

    fn name(&self) -> &str {
        "Construction estimate"
    }

    fn description(&self) -> &str {
        "Estimate cost, materials and duration from site area and floors"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let area = number(payload, "site_area_m2")?.unwrap_or(0.0);
        let floors = number(payload, "floors")?.unwrap_or(1.0).trunc();
        let structure = text(payload, "structure")?.trim().to_lowercase();
        let finish = text(payload, "finish_level")?.trim().to_lowercase();
        let structure = if structure.is_empty() { "rc".to_string() } else { structure };
        let finish = if finish.is_empty() { "standard".to_string() } else { finish };

        let total = area * floors;
        if total <= 0.0 {
            return Err(AnalyzerError::invalid("site_area_m2", "total area must be > 0"));
        }

        let cost = (unit_cost(&structure) + finish_addon(&finish)) * total;

        Ok(output(json!({
            "domain": self.code(),
            "inputs": payload,
            "estimates": {
                "total_area_m2": total,
                "materials": {
                    "cement_tons": round_to(0.08 * total, 2),
                    "steel_tons": round_to(0.05 * total, 2),
                    "blocks_units": (12.0 * total) as i64,
                },
                "duration_days": (45.0 + total / 20.0) as i64,
                "cost_estimate": round_to(cost, 2),
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rc_estimate() {
        let input = output(json!({"site_area_m2": 100, "floors": 2}));
        let result = Construction.analyze(&input).unwrap();
        let estimates = &result["estimates"];

        assert_eq!(estimates["total_area_m2"], 200.0);
        assert_eq!(estimates["cost_estimate"], 86000.0);
        assert_eq!(estimates["materials"]["cement_tons"], 16.0);
        assert_eq!(estimates["materials"]["steel_tons"], 10.0);
        assert_eq!(estimates["materials"]["blocks_units"], 2400);
        assert_eq!(estimates["duration_days"], 55);
        assert_eq!(result["inputs"]["floors"], 2);
    }

    #[test]
    fn test_steel_premium() {
        let input = output(json!({
            "site_area_m2": "50",
            "structure": "STEEL",
            "finish_level": "premium"
        }));
        let result = Construction.analyze(&input).unwrap();
        assert_eq!(result["estimates"]["cost_estimate"], 23000.0);
    }

    #[test]
    fn test_zero_area_rejected() {
        let err = Construction.analyze(&Payload::new()).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidValue { ref field, .. } if field == "site_area_m2"));
    }

    #[test]
    fn test_non_numeric_area_rejected() {
        let input = output(json!({"site_area_m2": "big"}));
        assert!(Construction.analyze(&input).is_err());
    }
}
