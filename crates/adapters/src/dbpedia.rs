// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! DBpedia vector-search recall adapter.
//!
//! The DBpedia benchmark prints one line per index configuration:
//!
//! ```text
//! IVF256,PQ32: refine=None, recall@100=0.85
//! IVF256,PQ32: refine=10, recall@100=0.93
//! ```
//!
//! Each matching line becomes a single-value result measured in recall.
//! Other output lines are ignored.

use crate::{AdapterError, IngestContext, ReportAdapter, ReportFormat, Result};
use lance_bench_benchmarks::{BenchResult, UNITS_RECALL};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::json;
use tracing::debug;

static QUERY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^IVF(\d+),PQ(\d+):\s+refine=(\w+),\s+recall@(\d+)=([\d.]+)")
        .expect("valid dbpedia regex")
});

/// Adapter for DBpedia recall logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DbpediaAdapter;

impl ReportAdapter for DbpediaAdapter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Dbpedia
    }

    fn parse(&self, input: &str, ctx: &IngestContext) -> Result<Vec<BenchResult>> {
        let dut = ctx.dut.resolve(None)?;
        let mut results = Vec::new();

        for (index, line) in input.lines().enumerate() {
            let Some(caps) = QUERY_LINE.captures(line.trim()) else {
                continue;
            };
            let line_no = index + 1;
            let ivf: u32 = capture(&caps, 1, line_no)?;
            let pq: u32 = capture(&caps, 2, line_no)?;
            let refine = match &caps[3] {
                "None" => None,
                _ => Some(capture::<u32>(&caps, 3, line_no)?),
            };
            let k: u32 = capture(&caps, 4, line_no)?;
            let recall: f64 = capture(&caps, 5, line_no)?;

            let refine_suffix = refine.map_or_else(|| "None".to_string(), |r| r.to_string());
            let name = format!("dbpedia_query_IVF{ivf}_PQ{pq}_refine_{refine_suffix}");
            let metadata = json!({
                "ivf": ivf,
                "pq": pq,
                "refine": refine,
                "k": k,
                "metric": "cosine",
            });

            debug!(benchmark = %name, recall, "parsed dbpedia query result");
            results.push(BenchResult::new(
                dut.clone(),
                ctx.test_bed.clone(),
                name,
                vec![recall],
                UNITS_RECALL,
                None,
                metadata.to_string(),
            )?);
        }

        Ok(results)
    }
}

fn capture<T: std::str::FromStr>(caps: &Captures<'_>, group: usize, line: usize) -> Result<T> {
    let raw = &caps[group];
    raw.parse().map_err(|_| AdapterError::InvalidValue {
        line,
        value: raw.to_string(),
    })
}
