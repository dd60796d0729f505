// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Criterion adapter.
//!
//! Consumes the line-delimited JSON emitted by
//! `cargo criterion --message-format=json`. Each `benchmark-complete` message
//! becomes one result; its `measured_values` are already nanoseconds and are
//! stored unchanged.
//!
//! ```text
//! {"reason":"benchmark-complete","id":"take/lance/1","unit":"ns","measured_values":[...],...}
//! {"reason":"group-complete","group_name":"take",...}
//! ```

use crate::{AdapterError, IngestContext, ReportAdapter, ReportFormat, Result};
use lance_bench_benchmarks::{BenchResult, Throughput, UNITS_NANOSECONDS};
use serde::Deserialize;
use tracing::{debug, trace};

const BENCHMARK_COMPLETE: &str = "benchmark-complete";
const CRITERION_UNIT: &str = "ns";

#[derive(Debug, Deserialize)]
struct Message {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct BenchmarkComplete {
    id: String,
    unit: String,
    measured_values: Vec<f64>,
    #[serde(default)]
    throughput: Vec<CriterionThroughput>,
}

#[derive(Debug, Deserialize)]
struct CriterionThroughput {
    per_iteration: f64,
    unit: String,
}

/// Adapter for Criterion JSON messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct CriterionAdapter;

impl ReportAdapter for CriterionAdapter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Criterion
    }

    fn parse(&self, input: &str, ctx: &IngestContext) -> Result<Vec<BenchResult>> {
        let dut = ctx.dut.resolve(None)?;
        let mut results = Vec::new();

        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: Message = serde_json::from_str(line)
                .map_err(|source| AdapterError::MalformedLine { line: line_no, source })?;
            if message.reason != BENCHMARK_COMPLETE {
                trace!(line = line_no, reason = %message.reason, "skipping criterion message");
                continue;
            }

            let bench: BenchmarkComplete = serde_json::from_str(line)
                .map_err(|source| AdapterError::MalformedLine { line: line_no, source })?;
            if bench.unit != CRITERION_UNIT {
                return Err(AdapterError::UnsupportedUnit {
                    benchmark: bench.id,
                    unit: bench.unit,
                });
            }

            let throughput = bench.throughput.first().map(|t| Throughput {
                per_iteration: t.per_iteration,
                unit: t.unit.clone(),
            });

            debug!(benchmark = %bench.id, samples = bench.measured_values.len(), "parsed criterion benchmark");
            results.push(BenchResult::new(
                dut.clone(),
                ctx.test_bed.clone(),
                bench.id,
                bench.measured_values,
                UNITS_NANOSECONDS,
                throughput,
                line,
            )?);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, SHA};
    use crate::DutSpec;

    fn line(id: &str, values: &[f64]) -> String {
        serde_json::json!({
            "reason": "benchmark-complete",
            "id": id,
            "report_directory": format!("target/criterion/reports/{id}"),
            "iteration_count": vec![1; values.len()],
            "measured_values": values,
            "unit": "ns",
            "throughput": [],
            "typical": {"estimate": 10.0, "lower_bound": 9.0, "upper_bound": 11.0, "unit": "ns"},
        })
        .to_string()
    }

    fn explicit_dut() -> DutSpec {
        DutSpec {
            version: Some("0.21.1+a1b2c3d".into()),
            timestamp: Some(1_735_689_600),
            ..DutSpec::new("lance")
        }
    }

    #[test]
    fn values_are_copied_unchanged() {
        let input = [
            line("take/lance/random", &[1523.5, 1498.25, 1611.0]),
            r#"{"reason":"group-complete","group_name":"take","benchmarks":["take/lance/random"],"report_directory":"x"}"#.to_string(),
            String::new(),
            line("scan/lance/full", &[88_000_000.0]),
        ]
        .join("\n");

        let results = CriterionAdapter.parse(&input, &context(explicit_dut())).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].benchmark_name, "take/lance/random");
        assert_eq!(results[0].values(), &[1523.5, 1498.25, 1611.0]);
        assert_eq!(results[0].units, UNITS_NANOSECONDS);
        assert_eq!(results[0].dut.version.as_str(), "0.21.1+a1b2c3d");
        assert_eq!(results[1].values(), &[88_000_000.0]);
        assert!(results[0].throughput.is_none());

        let metadata: serde_json::Value = serde_json::from_str(&results[0].metadata).unwrap();
        assert_eq!(metadata["id"], "take/lance/random");
    }

    #[test]
    fn throughput_is_carried_when_reported() {
        let input = serde_json::json!({
            "reason": "benchmark-complete",
            "id": "decode/bitpacked",
            "measured_values": [10.0, 11.0],
            "unit": "ns",
            "throughput": [{"per_iteration": 4096, "unit": "bytes"}],
        })
        .to_string();
        let results = CriterionAdapter.parse(&input, &context(explicit_dut())).unwrap();
        assert_eq!(
            results[0].throughput,
            Some(Throughput {
                per_iteration: 4096.0,
                unit: "bytes".into()
            })
        );
    }

    #[test]
    fn malformed_line_fails_whole_batch() {
        let input = format!("{}\n{{not json\n{}", line("a", &[1.0]), line("b", &[2.0]));
        let err = CriterionAdapter.parse(&input, &context(explicit_dut())).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn non_nanosecond_unit_is_rejected() {
        let input = line("a", &[1.0]).replace("\"unit\":\"ns\"", "\"unit\":\"cycles\"");
        let err = CriterionAdapter.parse(&input, &context(explicit_dut())).unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedUnit { unit, .. } if unit == "cycles"));
    }

    #[test]
    fn dut_must_be_explicit() {
        let spec = DutSpec {
            timestamp: Some(1),
            ..DutSpec::new("lance")
        };
        let err = CriterionAdapter.parse(&line("a", &[1.0]), &context(spec)).unwrap_err();
        assert!(matches!(err, AdapterError::DutVersionUndetermined));

        let spec = DutSpec {
            semver: Some("0.21.1".into()),
            commit: Some(SHA.into()),
            timestamp: Some(1),
            ..DutSpec::new("lance")
        };
        let results = CriterionAdapter.parse(&line("a", &[1.0]), &context(spec)).unwrap();
        assert_eq!(results[0].dut.version.as_str(), "0.21.1+a1b2c3d");
    }

    #[test]
    fn empty_measurements_fail() {
        let err = CriterionAdapter
            .parse(&line("a", &[]), &context(explicit_dut()))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Schema(_)));
    }
}
