//! Go/no-go decision made from the shape of the score distribution alone.

use serde::Serialize;

use localqa_core::config::GateConfig;

/// Which rule let the evidence through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    AbsoluteFloor,
    AboveMedian,
    ClearGap,
    /// None of the rules held.
    Rejected,
    NoScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateDecision {
    pub best: f32,
    pub median: f32,
    pub second: f32,
    pub reason: GateReason,
}

impl GateDecision {
    pub fn passed(&self) -> bool {
        matches!(
            self.reason,
            GateReason::AbsoluteFloor | GateReason::AboveMedian | GateReason::ClearGap
        )
    }
}

/// `scores` must be sorted descending. A single score is compared against
/// a second score of zero.
pub fn evaluate(scores: &[f32], config: &GateConfig) -> GateDecision {
    let Some(&best) = scores.first() else {
        return GateDecision { best: 0.0, median: 0.0, second: 0.0, reason: GateReason::NoScores };
    };
    let second = scores.get(1).copied().unwrap_or(0.0);
    let median = median_of_sorted(scores);

    let reason = if best >= config.absolute_floor {
        GateReason::AbsoluteFloor
    } else if best >= median + config.median_margin {
        GateReason::AboveMedian
    } else if best - second >= config.gap_threshold {
        GateReason::ClearGap
    } else {
        GateReason::Rejected
    };
    GateDecision { best, median, second, reason }
}

fn median_of_sorted(scores: &[f32]) -> f32 {
    let n = scores.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        scores[n / 2]
    } else {
        (scores[n / 2 - 1] + scores[n / 2]) / 2.0
    }
}
