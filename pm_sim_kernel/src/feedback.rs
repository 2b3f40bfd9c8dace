/// PM Simulator Kernel v1: Feedback and Final Report
///
/// Category feedback and the end-of-game report.
///
/// Every message is chosen by a threshold on the underlying metric; there
/// are exactly three bands per category and five for the overall verdict.

use serde::Serialize;

use crate::arithmetic::round_half_up;
use crate::domain::ProjectState;
use crate::metrics::{
    self, risk_summary, stakeholder_summary, CpiStatus, RiskSummary, SpiStatus, StakeholderSummary,
};
use crate::scoring::{grade, score_breakdown, ScoreBreakdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackCategory {
    Cost,
    Schedule,
    Quality,
    Stakeholder,
    Risk,
    Documents,
}

impl FeedbackCategory {
    pub fn title(self) -> &'static str {
        match self {
            FeedbackCategory::Cost => "Cost management (EVM)",
            FeedbackCategory::Schedule => "Schedule (EVM)",
            FeedbackCategory::Quality => "Quality",
            FeedbackCategory::Stakeholder => "Stakeholders",
            FeedbackCategory::Risk => "Risk management",
            FeedbackCategory::Documents => "Documentation",
        }
    }

    /// Knowledge area the category maps to.
    pub fn reference(self) -> &'static str {
        match self {
            FeedbackCategory::Cost => "Project Cost Management (EVM)",
            FeedbackCategory::Schedule => "Project Schedule Management",
            FeedbackCategory::Quality => "Project Quality Management",
            FeedbackCategory::Stakeholder => "Project Stakeholder Management",
            FeedbackCategory::Risk => "Project Risk Management",
            FeedbackCategory::Documents => "Project Integration Management",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFeedback {
    pub category: FeedbackCategory,
    pub score: u32,
    pub grade: &'static str,
    pub message: String,
    pub reference: &'static str,
}

impl CategoryFeedback {
    fn new(category: FeedbackCategory, score: u32, message: String) -> Self {
        Self {
            category,
            score,
            grade: grade(score),
            message,
            reference: category.reference(),
        }
    }
}

/// Render a currency amount (in units of 10k yen).
///
/// `>= 10000` is shown in whole hundred-million-yen units, anything else
/// with thousands separators.
pub fn format_budget(amount: i64) -> String {
    if amount >= 10_000 {
        let oku = round_half_up(amount as f64 / 10_000.0);
        return format!("{} oku yen", oku);
    }
    format!("{} man yen", group_thousands(amount))
}

fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// The six category feedback records, in fixed order.
pub fn generate_feedback(state: &ProjectState, documents_completed: u32) -> Vec<CategoryFeedback> {
    let breakdown = score_breakdown(state, documents_completed);
    let m = &breakdown.metrics;
    let ac = format_budget(state.actual_cost);
    let ev = format_budget(state.earned_value);
    let pv = format_budget(state.planned_value);

    let cost = if m.cpi >= 1.0 {
        format!("CPI {:.2}: excellent cost efficiency. Earned {ev} against an actual cost of {ac}.", m.cpi)
    } else if m.cpi >= 0.9 {
        format!(
            "CPI {:.2}: slight cost overrun trend. AC {ac}, EV {ev}. Consider revising the estimate at completion.",
            m.cpi
        )
    } else {
        format!("CPI {:.2}: the project is over budget. Spent {ac} to earn {ev}.", m.cpi)
    };

    let schedule = if m.spi >= 1.0 {
        format!("SPI {:.2}: schedule efficiency is good. Earned {ev} against a planned value of {pv}.", m.spi)
    } else if m.spi >= 0.9 {
        format!("SPI {:.2}: minor slippage. Tighten control of the critical path.", m.spi)
    } else {
        format!(
            "SPI {:.2}: the schedule is slipping. Corrective action such as crashing or fast tracking is needed.",
            m.spi
        )
    };

    let q = &state.quality;
    let unresolved = q.unresolved_defects();
    let quality = if unresolved == 0 && q.reviews_skipped == 0 {
        format!(
            "All {} defects resolved and no reviews skipped. Quality control was thorough.",
            q.defects_found
        )
    } else if unresolved <= 3 {
        format!(
            "{unresolved} defects remain unresolved and {} reviews were skipped. Revisit the quality assurance process.",
            q.reviews_skipped
        )
    } else {
        format!(
            "{unresolved} unresolved defects is too many, with {} reviews skipped. Invest in prevention over inspection.",
            q.reviews_skipped
        )
    };

    let mean = metrics::mean_satisfaction(&state.stakeholders);
    let mean_text = mean.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
    let stakeholder = match mean {
        Some(v) if v >= 4.0 => format!(
            "Average satisfaction {mean_text}/5. Stakeholder relationships were handled very well."
        ),
        Some(v) if v >= 3.0 => format!(
            "Average satisfaction {mean_text}/5. Some stakeholders still need closer alignment."
        ),
        _ => format!(
            "Average satisfaction {mean_text}/5. Dissatisfaction has built up; use an engagement assessment matrix."
        ),
    };

    let risks = risk_summary(&state.risks);
    let risk = if risks.unmitigated == 0 && risks.occurred == 0 {
        format!(
            "All {} risks were handled. Early identification and planned responses paid off.",
            risks.total
        )
    } else if risks.occurred == 0 {
        format!(
            "{} risks are still unaddressed. Hold regular risk reviews.",
            risks.unmitigated
        )
    } else {
        format!(
            "{} risks materialized. Make fuller use of the risk register and quantitative analysis.",
            risks.occurred
        )
    };

    let total_docs = state.constants.document_types_total;
    let documents = if documents_completed >= 6 {
        format!("{documents_completed}/{total_docs} documents completed. Project documentation is thorough.")
    } else if documents_completed >= 4 {
        format!(
            "{documents_completed}/{total_docs} documents completed. The basics are recorded, but more detail is expected."
        )
    } else {
        format!(
            "Only {documents_completed}/{total_docs} documents completed. Documentation is the foundation of knowledge management."
        )
    };

    vec![
        CategoryFeedback::new(FeedbackCategory::Cost, m.budget_score, cost),
        CategoryFeedback::new(FeedbackCategory::Schedule, m.schedule_score, schedule),
        CategoryFeedback::new(FeedbackCategory::Quality, m.quality_score, quality),
        CategoryFeedback::new(FeedbackCategory::Stakeholder, m.stakeholder_score, stakeholder),
        CategoryFeedback::new(FeedbackCategory::Risk, m.risk_score, risk),
        CategoryFeedback::new(FeedbackCategory::Documents, breakdown.document_score, documents),
    ]
}

/// One narrative paragraph keyed by the final score band.
pub fn generate_overall_feedback(state: &ProjectState, documents_completed: u32) -> String {
    let breakdown = score_breakdown(state, documents_completed);
    overall_message(&breakdown)
}

fn overall_message(breakdown: &ScoreBreakdown) -> String {
    let label = breakdown.rank.label();
    let cpi = breakdown.metrics.cpi;
    let spi = breakdown.metrics.spi;
    let score = breakdown.final_score;

    if score >= 90 {
        format!(
            "Outstanding result. As a \"{label}\" you led the project to success with CPI {cpi:.2} and SPI {spi:.2}, \
             earning stakeholder trust through balanced management."
        )
    } else if score >= 80 {
        format!(
            "Very good result. As an \"{label}\" you made sound calls in most situations, finishing at CPI {cpi:.2} \
             and SPI {spi:.2}. A few areas can still improve."
        )
    } else if score >= 65 {
        format!(
            "Project completed. As a \"{label}\" you showed solid fundamentals at CPI {cpi:.2} and SPI {spi:.2}. \
             Sharpen trade-off judgement and stakeholder alignment to grow further."
        )
    } else if score >= 50 {
        format!(
            "The project finished with open issues. \"{label}\", CPI {cpi:.2}, SPI {spi:.2}. \
             Deepen your grasp of the knowledge areas and invest more in planning."
        )
    } else {
        format!(
            "The project faced serious difficulties. \"{label}\", CPI {cpi:.2}, SPI {spi:.2}. \
             Study the process groups and knowledge areas systematically and apply them next time."
        )
    }
}

/// Everything the result screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub breakdown: ScoreBreakdown,
    pub cpi_status: CpiStatus,
    pub spi_status: SpiStatus,
    pub risks: RiskSummary,
    pub stakeholders: StakeholderSummary,
    pub categories: Vec<CategoryFeedback>,
    pub overall: String,
}

pub fn final_report(state: &ProjectState, documents_completed: u32) -> FinalReport {
    let breakdown = score_breakdown(state, documents_completed);
    FinalReport {
        cpi_status: CpiStatus::from_cpi(breakdown.metrics.cpi),
        spi_status: SpiStatus::from_spi(breakdown.metrics.spi),
        risks: risk_summary(&state.risks),
        stakeholders: stakeholder_summary(&state.stakeholders),
        categories: generate_feedback(state, documents_completed),
        overall: overall_message(&breakdown),
        breakdown,
    }
}
