//! Markdown output generation for benchmark results.
//!
//! This module renders the publish summary written to the CI job summary and
//! the comparison report posted on pull requests.

use crate::compare::{Comparison, Status};
use crate::result::{BenchResult, UNITS_NANOSECONDS, UNITS_RECALL};
use crate::version::SHORT_SHA_LEN;

/// Format a value for display according to its unit label.
pub fn format_value(value: f64, units: &str) -> String {
    match units {
        UNITS_NANOSECONDS => {
            if value < 1_000.0 {
                format!("{value:.2} ns")
            } else if value < 1_000_000.0 {
                format!("{:.2} µs", value / 1_000.0)
            } else if value < 1_000_000_000.0 {
                format!("{:.2} ms", value / 1_000_000.0)
            } else {
                format!("{:.2} s", value / 1_000_000_000.0)
            }
        }
        UNITS_RECALL => format!("{value:.4}"),
        other => format!("{value:.2} {other}"),
    }
}

/// Generate a markdown summary of freshly published results.
pub fn generate_summary(results: &[BenchResult]) -> String {
    let mut lines = vec![
        "# Published Benchmark Results".to_string(),
        String::new(),
    ];

    if let Some(first) = results.first() {
        lines.push(format!(
            "**Build:** {} `{}` on **{}**",
            first.dut.name, first.dut.version, first.test_bed.name
        ));
        lines.push(String::new());
    }

    lines.push("| Benchmark | Samples | Mean | Median | Std Dev |".to_string());
    lines.push("|-----------|---------|------|--------|---------|".to_string());
    for result in results {
        let summary = result.summary();
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            result.benchmark_name,
            result.values().len(),
            format_value(summary.mean, &result.units),
            format_value(summary.median, &result.units),
            format_value(summary.standard_deviation, &result.units),
        ));
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(format!("Total benchmarks: {}", results.len()));
    lines.join("\n")
}

/// Generate the comparison report for a pull-request run.
pub fn generate_comparison_report(
    pr_sha: &str,
    pr_number: u64,
    comparisons: &[Comparison],
    baseline_limit: usize,
    threshold: f64,
) -> String {
    let short_sha: String = pr_sha.chars().take(SHORT_SHA_LEN).collect();
    let count = |status: Status| {
        comparisons
            .iter()
            .filter(|c| c.status(threshold) == status)
            .count()
    };

    let mut lines = vec![
        format!("## Benchmark Results for PR #{pr_number}"),
        String::new(),
        format!("**Commit:** `{short_sha}`"),
        format!("**Baseline:** Up to {baseline_limit} most recent historical results per benchmark"),
        String::new(),
        "### Summary".to_string(),
        format!("- **Total benchmarks:** {}", comparisons.len()),
        format!("- 🚀 **Improvements:** {}", count(Status::Improved)),
        format!("- ⚠️ **Regressions:** {}", count(Status::Regressed)),
        format!("- ✅ **Stable:** {}", count(Status::Stable)),
        format!("- ❓ **Insufficient data:** {}", count(Status::InsufficientData)),
        String::new(),
    ];

    let mut flagged: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| matches!(c.status(threshold), Status::Improved | Status::Regressed))
        .collect();

    if flagged.is_empty() {
        lines.push("### ✅ All Benchmarks Within Normal Range".to_string());
        lines.push(String::new());
        lines.push(format!("No benchmarks had |z-score| > {threshold}"));
        lines.push(String::new());
    } else {
        flagged.sort_by(|a, b| {
            let za = a.z_score.unwrap_or_default().abs();
            let zb = b.z_score.unwrap_or_default().abs();
            zb.total_cmp(&za)
        });
        lines.push(format!("### Flagged Benchmarks (|z-score| > {threshold})"));
        lines.push(String::new());
        lines.push(
            "| Benchmark | PR Result | Baseline Mean | Baseline Std Dev | Z-Score | Status |"
                .to_string(),
        );
        lines.push(
            "|-----------|-----------|---------------|------------------|---------|--------|"
                .to_string(),
        );
        for comparison in flagged {
            let status = comparison.status(threshold);
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} {} |",
                comparison.benchmark_name,
                format_value(comparison.pr_value, &comparison.units),
                optional_value(comparison.baseline_mean, &comparison.units),
                optional_value(comparison.baseline_std, &comparison.units),
                z_score_cell(comparison.z_score),
                status.emoji(),
                status.label(),
            ));
        }
        lines.push(String::new());
    }

    let mut sorted: Vec<&Comparison> = comparisons.iter().collect();
    sorted.sort_by(|a, b| a.benchmark_name.cmp(&b.benchmark_name));

    lines.push("### All Results".to_string());
    lines.push("<details>".to_string());
    lines.push(format!(
        "<summary>View all {} benchmark results</summary>",
        comparisons.len()
    ));
    lines.push(String::new());
    lines.push("| Benchmark | PR Result | Baseline Mean | Baseline N | Z-Score | Status |".to_string());
    lines.push("|-----------|-----------|---------------|------------|---------|--------|".to_string());
    for comparison in sorted {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            comparison.benchmark_name,
            format_value(comparison.pr_value, &comparison.units),
            optional_value(comparison.baseline_mean, &comparison.units),
            comparison.baseline_count,
            z_score_cell(comparison.z_score),
            comparison.status(threshold).emoji(),
        ));
    }
    lines.push(String::new());
    lines.push("</details>".to_string());
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push("*Generated by bench-bot* 🤖".to_string());

    lines.join("\n")
}

fn optional_value(value: Option<f64>, units: &str) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format_value(v, units))
}

fn z_score_cell(z_score: Option<f64>) -> String {
    z_score.map_or_else(|| "N/A".to_string(), |z| format!("{z:+.2}"))
}
