/// PM Simulator Kernel v1: Final Score and Rank

use std::fmt;

use serde::Serialize;

use crate::arithmetic::{clamp_score, round_half_up};
use crate::domain::ProjectState;
use crate::metrics::{self, ProjectMetrics};

/// Category weights. Sum to 1.0.
pub const WEIGHT_BUDGET: f64 = 0.20;
pub const WEIGHT_SCHEDULE: f64 = 0.20;
pub const WEIGHT_QUALITY: f64 = 0.20;
pub const WEIGHT_STAKEHOLDER: f64 = 0.15;
pub const WEIGHT_RISK: f64 = 0.15;
pub const WEIGHT_DOCUMENT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
}

impl Rank {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Rank::S
        } else if score >= 80 {
            Rank::A
        } else if score >= 65 {
            Rank::B
        } else if score >= 50 {
            Rank::C
        } else {
            Rank::D
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rank::S => "Legendary PM",
            Rank::A => "Excellent PM",
            Rank::B => "Capable PM",
            Rank::C => "Developing PM",
            Rank::D => "Needs Training",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

pub fn rank(score: u32) -> Rank {
    Rank::from_score(score)
}

/// Letter grade for a category score. Same thresholds as the overall rank.
pub fn grade(score: u32) -> &'static str {
    Rank::from_score(score).letter()
}

/// Every category score plus the weighted final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    #[serde(flatten)]
    pub metrics: ProjectMetrics,
    pub document_score: u32,
    pub final_score: u32,
    pub rank: Rank,
}

/// Weighted composite of the six category scores.
pub fn weighted_score(m: &ProjectMetrics, document_score: u32) -> u32 {
    let total = m.budget_score as f64 * WEIGHT_BUDGET
        + m.schedule_score as f64 * WEIGHT_SCHEDULE
        + m.quality_score as f64 * WEIGHT_QUALITY
        + m.stakeholder_score as f64 * WEIGHT_STAKEHOLDER
        + m.risk_score as f64 * WEIGHT_RISK
        + document_score as f64 * WEIGHT_DOCUMENT;
    clamp_score(round_half_up(total))
}

pub fn score_breakdown(state: &ProjectState, documents_completed: u32) -> ScoreBreakdown {
    let m = metrics::metrics(state);
    let document_score =
        metrics::document_score(documents_completed, state.constants.document_types_total);
    let final_score = weighted_score(&m, document_score);
    ScoreBreakdown {
        metrics: m,
        document_score,
        final_score,
        rank: rank(final_score),
    }
}

pub fn final_score(state: &ProjectState, documents_completed: u32) -> u32 {
    score_breakdown(state, documents_completed).final_score
}
