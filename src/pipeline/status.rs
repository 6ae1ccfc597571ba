use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::steps::StepDefinition;

const IN_PROGRESS: &str = "In Progress";
const COMPLETED: &str = "Completed";
const FAIL: &str = "Fail";

/// Progress of one report run.
///
/// Persisted twice on the report row: as the structured `status_detail`
/// value and as the display string in `status`, which older clients
/// substring-match on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportStatus {
    NotStarted,
    StepInProgress { step: u32, label: String },
    StepCompleted { step: u32, label: String },
    StepFailed { step: u32, label: String, reason: String },
    Completed,
}

impl ReportStatus {
    pub fn in_progress(step: &StepDefinition) -> Self {
        Self::StepInProgress {
            step: step.id,
            label: step.label.clone(),
        }
    }

    pub fn completed_step(step: &StepDefinition) -> Self {
        Self::StepCompleted {
            step: step.id,
            label: step.label.clone(),
        }
    }

    pub fn failed(step: &StepDefinition, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.id,
            label: step.label.clone(),
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::StepFailed { .. })
    }

    pub fn step(&self) -> Option<u32> {
        match self {
            Self::StepInProgress { step, .. }
            | Self::StepCompleted { step, .. }
            | Self::StepFailed { step, .. } => Some(*step),
            Self::NotStarted | Self::Completed => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not started"),
            Self::StepInProgress { step, label } => write!(f, "Step {step} {label} - {IN_PROGRESS}"),
            Self::StepCompleted { step, label } => write!(f, "Step {step} {label} - {COMPLETED}"),
            Self::StepFailed { step, label, .. } => write!(f, "Step {step} {label} - {FAIL}"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized report status: {0:?}")]
pub struct StatusParseError(pub String);

/// Parses the legacy display string. A failure read this way carries an
/// empty reason since the string never stored one.
impl FromStr for ReportStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "" | "not started" => return Ok(Self::NotStarted),
            "completed" => return Ok(Self::Completed),
            _ => {}
        }

        let err = || StatusParseError(s.to_string());

        let rest = trimmed.strip_prefix("Step ").ok_or_else(err)?;
        let (number, rest) = rest.split_once(' ').ok_or_else(err)?;
        let step: u32 = number.parse().map_err(|_| err())?;
        let (label, phase) = rest.rsplit_once(" - ").ok_or_else(err)?;
        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(err());
        }

        match phase.trim() {
            IN_PROGRESS => Ok(Self::StepInProgress { step, label }),
            COMPLETED => Ok(Self::StepCompleted { step, label }),
            FAIL => Ok(Self::StepFailed {
                step,
                label,
                reason: String::new(),
            }),
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity() -> StepDefinition {
        StepDefinition {
            id: 5,
            tool_name: "Call_Get_Opportunity_Tool_".to_string(),
            label: "Market Opportunity".to_string(),
        }
    }

    #[test]
    fn test_display_matches_legacy_strings() {
        let step = opportunity();
        assert_eq!(
            ReportStatus::in_progress(&step).to_string(),
            "Step 5 Market Opportunity - In Progress"
        );
        assert_eq!(
            ReportStatus::completed_step(&step).to_string(),
            "Step 5 Market Opportunity - Completed"
        );
        assert_eq!(
            ReportStatus::failed(&step, "webhook returned 500").to_string(),
            "Step 5 Market Opportunity - Fail"
        );
        assert_eq!(ReportStatus::Completed.to_string(), "completed");
        assert_eq!(ReportStatus::NotStarted.to_string(), "not started");
    }

    #[test]
    fn test_parse_legacy_strings() {
        assert_eq!(
            "Step 5 Market Opportunity - Fail".parse::<ReportStatus>(),
            Ok(ReportStatus::StepFailed {
                step: 5,
                label: "Market Opportunity".to_string(),
                reason: String::new(),
            })
        );
        assert_eq!(
            "Step 11 Validation Score - In Progress".parse::<ReportStatus>(),
            Ok(ReportStatus::StepInProgress {
                step: 11,
                label: "Validation Score".to_string(),
            })
        );
        assert_eq!("completed".parse::<ReportStatus>(), Ok(ReportStatus::Completed));
        assert_eq!("".parse::<ReportStatus>(), Ok(ReportStatus::NotStarted));
    }

    #[test]
    fn test_parse_label_containing_dash() {
        let parsed: ReportStatus = "Step 8 Go-To-Market - Completed".parse().unwrap();
        assert_eq!(
            parsed,
            ReportStatus::StepCompleted {
                step: 8,
                label: "Go-To-Market".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in [
            "Step five Market - Fail",
            "Step 5 - Fail",
            "Step 5 Market Opportunity - Paused",
            "done",
        ] {
            tokio_test::assert_err!(input.parse::<ReportStatus>(), "{input}");
        }
    }

    #[test]
    fn test_terminal_states() {
        let step = opportunity();
        assert!(ReportStatus::Completed.is_terminal());
        assert!(ReportStatus::failed(&step, "x").is_terminal());
        assert!(!ReportStatus::in_progress(&step).is_terminal());
        assert!(!ReportStatus::completed_step(&step).is_terminal());
        assert!(!ReportStatus::NotStarted.is_terminal());
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let value = serde_json::to_value(ReportStatus::failed(&opportunity(), "boom")).unwrap();
        assert_eq!(value["state"], "step_failed");
        assert_eq!(value["step"], 5);
        assert_eq!(value["label"], "Market Opportunity");
        assert_eq!(value["reason"], "boom");

        let value = serde_json::to_value(ReportStatus::NotStarted).unwrap();
        assert_eq!(value, serde_json::json!({"state": "not_started"}));
    }
}
