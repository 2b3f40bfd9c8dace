/// PM Simulator Kernel v1: Scenario Configuration
///
/// The static plan a session starts from.
///
/// `Scenario::default()` is the built-in sales-management-system project:
/// BAC 5000, 12 months, seven stakeholders. Alternative scenarios load from
/// JSON and are validated before use.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arithmetic::{is_valid_id, Months};
use crate::domain::{Engagement, PhaseId, ScenarioConstants};

/// A stakeholder as listed in the scenario roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StakeholderProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub planned_budget: i64,
    pub total_months: Months,
    pub stakeholders: Vec<StakeholderProfile>,
    #[serde(default)]
    pub constants: ScenarioConstants,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("plannedBudget must be positive, got {0}")]
    NonPositiveBudget(i64),
    #[error("totalMonths must be positive, got {0}")]
    NonPositiveDuration(Months),
    #[error("phase table is missing phase {0}")]
    MissingPhase(PhaseId),
    #[error("phase {0} is listed more than once")]
    DuplicatePhase(PhaseId),
    #[error("stakeholder id {0:?} must match [a-zA-Z0-9_-]+")]
    InvalidStakeholderId(String),
    #[error("stakeholder id {0:?} is listed more than once")]
    DuplicateStakeholder(String),
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Replace the stakeholder roster, keeping everything else.
    pub fn with_stakeholders(mut self, stakeholders: Vec<StakeholderProfile>) -> Self {
        self.stakeholders = stakeholders;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.planned_budget <= 0 {
            return Err(ConfigError::NonPositiveBudget(self.planned_budget));
        }
        if self.total_months <= Months::ZERO {
            return Err(ConfigError::NonPositiveDuration(self.total_months));
        }

        let mut seen_phases = BTreeSet::new();
        for spec in &self.constants.phases {
            if !seen_phases.insert(spec.phase) {
                return Err(ConfigError::DuplicatePhase(spec.phase));
            }
        }
        if let Some(missing) = PhaseId::ALL.iter().find(|p| !seen_phases.contains(*p)) {
            return Err(ConfigError::MissingPhase(*missing));
        }

        let mut seen_ids = BTreeSet::new();
        for profile in &self.stakeholders {
            if !is_valid_id(&profile.id) {
                return Err(ConfigError::InvalidStakeholderId(profile.id.clone()));
            }
            if !seen_ids.insert(profile.id.as_str()) {
                return Err(ConfigError::DuplicateStakeholder(profile.id.clone()));
            }
        }
        Ok(())
    }
}

impl Default for Scenario {
    fn default() -> Self {
        let profile = |id: &str, name: &str, role: &str, engagement| StakeholderProfile {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            engagement,
        };
        Self {
            id: "sales-management-system".to_string(),
            title: "Customer & Deal Management System".to_string(),
            planned_budget: 5000,
            total_months: Months::whole(12),
            stakeholders: vec![
                profile("takayama", "Seiichi Takayama", "Sales director (sponsor)", Engagement::Supportive),
                profile("tanaka", "Misaki Tanaka", "Sales planning manager (business owner)", Engagement::Supportive),
                profile("sasaki", "Kenta Sasaki", "IT department head", Engagement::Neutral),
                profile("nakamura", "Yuko Nakamura", "Development team lead", Engagement::Supportive),
                profile("yamamoto", "Mari Yamamoto", "End-user representative", Engagement::Resistant),
                profile("omori", "Masayoshi Omori", "President", Engagement::Supportive),
                profile("suzuki", "Daisuke Suzuki", "Vendor PM", Engagement::Neutral),
            ],
            constants: ScenarioConstants::default(),
        }
    }
}
