//! Latency sample statistics.

use serde_json::json;

use super::{as_number, list, output, round_to};
use crate::error::AnalyzerError;
use crate::registry::{Analyzer, Payload};

/// Linear interpolation between closest ranks of a sorted sample.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let k = (sorted.len() - 1) as f64 * p;
    let f = k.floor() as usize;
    let c = (f + 1).min(sorted.len() - 1);
    if f == c {
        return sorted[f];
    }
    sorted[f] + (sorted[c] - sorted[f]) * (k - f as f64)
}

pub struct LatencyAnalyzer;

impl Analyzer for LatencyAnalyzer {
    fn code(&self) -> &str {
        "networking_latency_analyzer"
    }

    fn name(&self) -> &str {
        "Latency analyzer"
    }

    fn description(&self) -> &str {
        "Mean, p95 and p99 of latency samples in milliseconds"
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        let mut samples = list(payload, "latencies_ms")?
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| as_number(v, "latencies_ms"))
            .collect::<Result<Vec<f64>, _>>()?;

        if samples.is_empty() {
            return Ok(output(json!({ "domain": self.code(), "stats": {} })));
        }

        samples.sort_by(f64::total_cmp);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;

        Ok(output(json!({
            "domain": self.code(),
            "stats": {
                "count": samples.len(),
                "mean_ms": round_to(mean, 2),
                "p95_ms": round_to(percentile(&samples, 0.95), 2),
                "p99_ms": round_to(percentile(&samples, 0.99), 2),
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((percentile(&sorted, 0.95) - 9.55).abs() < 1e-9);
        assert_eq!(percentile(&[7.0], 0.99), 7.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_stats() {
        let input = output(json!({ "latencies_ms": [10, null, 20, 30, "40"] }));
        let result = LatencyAnalyzer.analyze(&input).unwrap();

        assert_eq!(
            result["stats"],
            json!({ "count": 4, "mean_ms": 25.0, "p95_ms": 38.5, "p99_ms": 39.7 })
        );
    }

    #[test]
    fn test_empty_samples() {
        let result = LatencyAnalyzer.analyze(&output(json!({ "latencies_ms": [] }))).unwrap();
        assert_eq!(result["stats"], json!({}));
    }
}
