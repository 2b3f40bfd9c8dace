/// PM Simulator Kernel v1: Effect Model
///
/// A choice effect is pure data: a delta payload authored by the event
/// content. It carries no transition logic.
///
/// Absent vs. zero: every optional field that is `None` means "no change".
/// A present zero is an explicit zero delta (or, for test coverage, an
/// explicit overwrite).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arithmetic::Months;
use crate::domain::{RiskLevel, TestCoverage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderImpact {
    pub stakeholder_id: String,
    pub satisfaction_delta: i32,
}

/// One risk-register action. Processed in order by the reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RiskImpact {
    Add {
        #[serde(rename = "riskId")]
        risk_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        probability: Option<RiskLevel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        impact: Option<RiskLevel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    Mitigate {
        #[serde(rename = "riskId")]
        risk_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    Occur {
        #[serde(rename = "riskId")]
        risk_id: String,
    },
    Close {
        #[serde(rename = "riskId")]
        risk_id: String,
    },
}

impl RiskImpact {
    pub fn risk_id(&self) -> &str {
        match self {
            RiskImpact::Add { risk_id, .. }
            | RiskImpact::Mitigate { risk_id, .. }
            | RiskImpact::Occur { risk_id }
            | RiskImpact::Close { risk_id } => risk_id,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            RiskImpact::Add { .. } => "add",
            RiskImpact::Mitigate { .. } => "mitigate",
            RiskImpact::Occur { .. } => "occur",
            RiskImpact::Close { .. } => "close",
        }
    }

    /// `add` with only an id and description; probability and impact default
    /// to medium when applied.
    pub fn add(risk_id: &str, description: &str) -> Self {
        RiskImpact::Add {
            risk_id: risk_id.to_string(),
            description: Some(description.to_string()),
            probability: None,
            impact: None,
            response: None,
        }
    }

    pub fn mitigate(risk_id: &str, response: Option<&str>) -> Self {
        RiskImpact::Mitigate {
            risk_id: risk_id.to_string(),
            response: response.map(str::to_string),
        }
    }

    pub fn occur(risk_id: &str) -> Self {
        RiskImpact::Occur {
            risk_id: risk_id.to_string(),
        }
    }

    pub fn close(risk_id: &str) -> Self {
        RiskImpact::Close {
            risk_id: risk_id.to_string(),
        }
    }
}

/// Partial update to the quality record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityImpact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defects_found: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defects_resolved: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_skipped: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_coverage: Option<TestCoverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceEffects {
    #[serde(default)]
    pub cost_impact: i64,
    #[serde(default)]
    pub schedule_impact: Months,
    #[serde(default)]
    pub earned_value_delta: i64,
    #[serde(default)]
    pub stakeholder_impacts: Vec<StakeholderImpact>,
    #[serde(default)]
    pub risk_impacts: Vec<RiskImpact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_impact: Option<QualityImpact>,
}

impl ChoiceEffects {
    pub fn with_earned_value(mut self, delta: i64) -> Self {
        self.earned_value_delta = delta;
        self
    }

    pub fn with_stakeholder(mut self, stakeholder_id: &str, satisfaction_delta: i32) -> Self {
        self.stakeholder_impacts.push(StakeholderImpact {
            stakeholder_id: stakeholder_id.to_string(),
            satisfaction_delta,
        });
        self
    }

    pub fn with_quality(mut self, quality: QualityImpact) -> Self {
        self.quality_impact = Some(quality);
        self
    }
}

// ── Document completion bonus ──────────────────────────────────────

/// The seven project documents tracked by the document collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Charter,
    Requirements,
    Wbs,
    Schedule,
    RiskRegister,
    ChangeLog,
    LessonsLearned,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Charter,
        DocumentType::Requirements,
        DocumentType::Wbs,
        DocumentType::Schedule,
        DocumentType::RiskRegister,
        DocumentType::ChangeLog,
        DocumentType::LessonsLearned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Charter => "charter",
            DocumentType::Requirements => "requirements",
            DocumentType::Wbs => "wbs",
            DocumentType::Schedule => "schedule",
            DocumentType::RiskRegister => "risk-register",
            DocumentType::ChangeLog => "change-log",
            DocumentType::LessonsLearned => "lessons-learned",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect granted when a project document is completed.
pub fn document_completion_bonus(document: DocumentType) -> ChoiceEffects {
    let base = ChoiceEffects::default();
    match document {
        DocumentType::Charter => base.with_earned_value(50).with_stakeholder("takayama", 1),
        DocumentType::Requirements => base
            .with_earned_value(50)
            .with_stakeholder("tanaka", 1)
            .with_stakeholder("sasaki", 1),
        DocumentType::Wbs => base.with_earned_value(50).with_stakeholder("nakamura", 1),
        DocumentType::Schedule => base.with_earned_value(80).with_stakeholder("tanaka", 1),
        DocumentType::RiskRegister => base.with_earned_value(50).with_stakeholder("sasaki", 1),
        DocumentType::ChangeLog => base.with_earned_value(30).with_stakeholder("tanaka", 1),
        DocumentType::LessonsLearned => base.with_earned_value(50).with_quality(QualityImpact {
            defects_resolved: Some(2),
            ..Default::default()
        }),
    }
}

// ── Phase completion bonus ─────────────────────────────────────────

/// Effect granted for finishing most or all events of a phase.
///
/// ratio >= 1.0  → EV +50, sponsor +1
/// ratio >= 0.75 → EV +20
pub fn phase_completion_bonus(completed: u32, total: u32, sponsor_id: &str) -> ChoiceEffects {
    if total == 0 {
        return ChoiceEffects::default();
    }
    let ratio = completed as f64 / total as f64;
    if ratio >= 1.0 {
        ChoiceEffects::default()
            .with_earned_value(50)
            .with_stakeholder(sponsor_id, 1)
    } else if ratio >= 0.75 {
        ChoiceEffects::default().with_earned_value(20)
    } else {
        ChoiceEffects::default()
    }
}

// ── Choice assessment ──────────────────────────────────────────────

/// How a choice compares against the other options of the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceRating {
    Best,
    Acceptable,
    Risky,
}

impl ChoiceRating {
    pub fn label(self) -> &'static str {
        match self {
            ChoiceRating::Best => "Optimal decision",
            ChoiceRating::Acceptable => "Acceptable decision",
            ChoiceRating::Risky => "High-risk decision",
        }
    }
}

/// Heuristic desirability of an effect, used only to rate choices.
pub fn effect_desirability(effects: &ChoiceEffects) -> f64 {
    let satisfaction: i32 = effects
        .stakeholder_impacts
        .iter()
        .map(|i| i.satisfaction_delta)
        .sum();
    let added = effects
        .risk_impacts
        .iter()
        .filter(|r| matches!(r, RiskImpact::Add { .. }))
        .count();
    let resolved = effects
        .risk_impacts
        .iter()
        .filter(|r| matches!(r, RiskImpact::Mitigate { .. } | RiskImpact::Close { .. }))
        .count();

    effects.earned_value_delta as f64 - effects.cost_impact as f64 * 0.5
        - effects.schedule_impact.as_f64() * 100.0
        + satisfaction as f64 * 50.0
        - added as f64 * 80.0
        + resolved as f64 * 60.0
}

/// Rate `chosen` against every option offered (including itself).
pub fn assess_choice(chosen: &ChoiceEffects, options: &[&ChoiceEffects]) -> ChoiceRating {
    let score = effect_desirability(chosen);
    let scores: Vec<f64> = options.iter().map(|e| effect_desirability(e)).collect();
    let Some(first) = scores.first().copied() else {
        return ChoiceRating::Acceptable;
    };
    if scores.iter().all(|s| *s == first) {
        return ChoiceRating::Acceptable;
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    if score == max {
        ChoiceRating::Best
    } else if score == min {
        ChoiceRating::Risky
    } else {
        ChoiceRating::Acceptable
    }
}
