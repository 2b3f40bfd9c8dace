/// PM Simulator Kernel v1: Core Domain Types
///
/// Pure data. No transition logic lives here.
/// Currency: i64 units. Months: fixed-point `Months`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arithmetic::{saturating_add, Months};

// ── Phases ─────────────────────────────────────────────────────────

/// The eight project phases, in their fixed narrative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseId {
    Initiation,
    PreRequirements,
    RomPlanning,
    Requirements,
    Estimation,
    DesignDev,
    Testing,
    Closing,
}

impl PhaseId {
    pub const ALL: [PhaseId; 8] = [
        PhaseId::Initiation,
        PhaseId::PreRequirements,
        PhaseId::RomPlanning,
        PhaseId::Requirements,
        PhaseId::Estimation,
        PhaseId::DesignDev,
        PhaseId::Testing,
        PhaseId::Closing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseId::Initiation => "initiation",
            PhaseId::PreRequirements => "pre-requirements",
            PhaseId::RomPlanning => "rom-planning",
            PhaseId::Requirements => "requirements",
            PhaseId::Estimation => "estimation",
            PhaseId::DesignDev => "design-dev",
            PhaseId::Testing => "testing",
            PhaseId::Closing => "closing",
        }
    }

    /// Position in the phase order (0-based).
    pub fn index(self) -> usize {
        PhaseId::ALL
            .iter()
            .position(|p| *p == self)
            .unwrap_or_default()
    }

    /// The phase after this one; `None` for closing.
    pub fn next(self) -> Option<PhaseId> {
        PhaseId::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Quality ────────────────────────────────────────────────────────

/// Ordinal test coverage: none < minimal < partial < full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCoverage {
    None,
    Minimal,
    Partial,
    Full,
}

impl TestCoverage {
    pub fn as_str(self) -> &'static str {
        match self {
            TestCoverage::None => "none",
            TestCoverage::Minimal => "minimal",
            TestCoverage::Partial => "partial",
            TestCoverage::Full => "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QualityRecord {
    pub defects_found: i64,
    pub defects_resolved: i64,
    pub reviews_skipped: i64,
    pub test_coverage: TestCoverage,
}

impl QualityRecord {
    /// `defects_found - defects_resolved`. May go negative: the kernel does
    /// not enforce `resolved <= found` unless strict validation is requested.
    pub fn unresolved_defects(&self) -> i64 {
        self.defects_found - self.defects_resolved
    }
}

impl Default for QualityRecord {
    fn default() -> Self {
        Self {
            defects_found: 0,
            defects_resolved: 0,
            reviews_skipped: 0,
            test_coverage: TestCoverage::None,
        }
    }
}

// ── Stakeholders ───────────────────────────────────────────────────

/// Descriptive engagement label. Not consumed by scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engagement {
    Unaware,
    Resistant,
    Neutral,
    Supportive,
    Leading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakeholderState {
    pub id: String,
    pub name: String,
    pub satisfaction: i32, // clamped to [1, 5]
    pub engagement: Engagement,
}

// ── Risks ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// identified → mitigated | occurred → closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Identified,
    Mitigated,
    Occurred,
    Closed,
}

impl RiskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskStatus::Identified => "identified",
            RiskStatus::Mitigated => "mitigated",
            RiskStatus::Occurred => "occurred",
            RiskStatus::Closed => "closed",
        }
    }
}

/// Risk source tag used when a risk is raised outside any phase.
pub const DOCUMENT_SOURCE: &str = "document";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectRisk {
    pub id: String,
    pub description: String,
    pub probability: RiskLevel,
    pub impact: RiskLevel,
    pub status: RiskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub source: String, // phase tag | "document"
}

// ── Scenario constants ─────────────────────────────────────────────

/// Planned-value accrual for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PhaseSpec {
    pub phase: PhaseId,
    pub pv_per_event: i64,
    pub event_count: u32,
    /// Counted in the baseline catch-up.
    pub pre_baseline: bool,
}

/// Immutable per-session constants. Fixed at state creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioConstants {
    pub phases: Vec<PhaseSpec>,
    /// Elapsed time assumed for all pre-baseline phases.
    pub baseline_elapsed_months: Months,
    pub document_types_total: u32,
    /// Stakeholder credited by the phase-completion bonus.
    pub sponsor_id: String,
}

impl ScenarioConstants {
    pub fn phase(&self, phase: PhaseId) -> Option<&PhaseSpec> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Planned value accrued by one completed event in `phase` (0 if unlisted).
    pub fn pv_per_event(&self, phase: PhaseId) -> i64 {
        self.phase(phase).map(|p| p.pv_per_event).unwrap_or(0)
    }

    /// Σ pv_per_event × event_count over the pre-baseline phases.
    pub fn baseline_planned_value(&self) -> i64 {
        self.phases
            .iter()
            .filter(|p| p.pre_baseline)
            .fold(0, |acc, p| {
                saturating_add(acc, p.pv_per_event.saturating_mul(p.event_count as i64))
            })
    }
}

impl Default for ScenarioConstants {
    fn default() -> Self {
        let spec = |phase, pv_per_event, event_count, pre_baseline| PhaseSpec {
            phase,
            pv_per_event,
            event_count,
            pre_baseline,
        };
        Self {
            phases: vec![
                spec(PhaseId::Initiation, 75, 2, true),
                spec(PhaseId::PreRequirements, 125, 2, true),
                spec(PhaseId::RomPlanning, 117, 3, true),
                spec(PhaseId::Requirements, 250, 3, true),
                spec(PhaseId::Estimation, 167, 3, true),
                spec(PhaseId::DesignDev, 583, 3, false),
                spec(PhaseId::Testing, 333, 3, false),
                spec(PhaseId::Closing, 125, 2, false),
            ],
            baseline_elapsed_months: Months::whole(5),
            document_types_total: 7,
            sponsor_id: "takayama".to_string(),
        }
    }
}

// ── Transition outcome ─────────────────────────────────────────────

/// Structured, immutable record of what one transition did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub transition: String,
    pub evm_tracked: bool,
    pub planned_value_increment: i64,
    pub baseline_confirmed: bool,
    pub baseline_planned_value: i64,
    pub risks_added: Vec<String>,
    pub risk_actions_ignored: Vec<String>,
    pub unmatched_stakeholders: Vec<String>,
}

// ── Project state ──────────────────────────────────────────────────

/// Complete project state for one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectState {
    pub planned_budget: i64, // BAC
    pub actual_cost: i64,    // AC
    pub earned_value: i64,   // EV
    pub planned_value: i64,  // PV
    pub total_months: Months,
    pub elapsed_months: Months,
    pub quality: QualityRecord,
    pub stakeholders: Vec<StakeholderState>,
    pub risks: Vec<ProjectRisk>,
    pub constants: ScenarioConstants,
}

impl ProjectState {
    /// `max(0, elapsed - total)`. Always derived, never stored.
    pub fn delay_months(&self) -> Months {
        self.elapsed_months.excess_over(self.total_months)
    }

    pub fn stakeholder(&self, id: &str) -> Option<&StakeholderState> {
        self.stakeholders.iter().find(|s| s.id == id)
    }

    pub fn risk(&self, id: &str) -> Option<&ProjectRisk> {
        self.risks.iter().find(|r| r.id == id)
    }
}
