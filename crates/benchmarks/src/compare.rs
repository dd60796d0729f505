//! Comparison of a pull-request run against historical results.
//!
//! Lower values are better for timings, so a negative z-score means the PR
//! got faster and a positive one means it got slower.

use crate::result::BenchResult;
use crate::summary::{mean, sample_std};
use serde::Serialize;

/// Default number of historical results used as a baseline.
pub const DEFAULT_BASELINE_LIMIT: usize = 20;

/// Default minimum number of historical results needed for a z-score.
pub const DEFAULT_MIN_BASELINE: usize = 5;

/// Default |z| above which a benchmark is flagged.
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Classification of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Faster (lower) than the baseline by more than the threshold.
    Improved,
    /// Slower (higher) than the baseline by more than the threshold.
    Regressed,
    /// Within the threshold of the baseline.
    Stable,
    /// Too little history for a z-score.
    InsufficientData,
}

impl Status {
    /// Marker shown in report rows.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Improved => "🚀",
            Self::Regressed => "⚠️",
            Self::Stable => "✅",
            Self::InsufficientData => "❓",
        }
    }

    /// Short wording shown next to the marker.
    pub fn label(self) -> &'static str {
        match self {
            Self::Improved => "Likely Improved",
            Self::Regressed => "Likely Regressed",
            Self::Stable => "Within Normal Range",
            Self::InsufficientData => "Insufficient Data",
        }
    }
}

/// One PR benchmark compared against its baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Benchmark being compared.
    pub benchmark_name: String,
    /// Mean of the PR run's raw values.
    pub pr_value: f64,
    /// Unit label of `pr_value`.
    pub units: String,
    /// Mean of the historical means, when enough history exists.
    pub baseline_mean: Option<f64>,
    /// Sample deviation of the historical means.
    pub baseline_std: Option<f64>,
    /// Historical results found, even when too few to use.
    pub baseline_count: usize,
    /// Distance of `pr_value` from the baseline in deviations.
    pub z_score: Option<f64>,
}

impl Comparison {
    /// Compare the PR result's mean against the means of `history`.
    ///
    /// With fewer than `min_baseline` historical results no baseline is
    /// reported at all.
    pub fn new(pr: &BenchResult, history: &[BenchResult], min_baseline: usize) -> Self {
        let pr_value = pr.summary().mean;
        let mut comparison = Self {
            benchmark_name: pr.benchmark_name.clone(),
            pr_value,
            units: pr.units.clone(),
            baseline_mean: None,
            baseline_std: None,
            baseline_count: history.len(),
            z_score: None,
        };
        if history.len() < min_baseline {
            return comparison;
        }

        let means: Vec<f64> = history.iter().map(|r| r.summary().mean).collect();
        comparison.baseline_mean = mean(&means);
        comparison.baseline_std = sample_std(&means);
        comparison.z_score = z_score(pr_value, &means);
        comparison
    }

    /// Classify this comparison against a |z| threshold.
    pub fn status(&self, threshold: f64) -> Status {
        match self.z_score {
            None => Status::InsufficientData,
            Some(z) if z < -threshold => Status::Improved,
            Some(z) if z > threshold => Status::Regressed,
            Some(_) => Status::Stable,
        }
    }
}

/// z-score of `value` against `history`, `None` below two values or with
/// zero spread.
pub fn z_score(value: f64, history: &[f64]) -> Option<f64> {
    let std = sample_std(history)?;
    if std == 0.0 {
        return None;
    }
    Some((value - mean(history)?) / std)
}
