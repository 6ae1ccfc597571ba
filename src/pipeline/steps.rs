use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: u32,
    pub tool_name: String,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("step registry is empty")]
    Empty,

    #[error("step ids must be strictly ascending: {previous} followed by {current}")]
    OutOfOrder { previous: u32, current: u32 },

    #[error("step {0} has a blank tool_name")]
    BlankToolName(u32),

    #[error("step {0} has a blank label")]
    BlankLabel(u32),

    #[error("failed to read step registry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse step registry: {0}")]
    Parse(#[from] serde_json::Error),
}

const DEFAULT_STEPS: [(u32, &str, &str); 11] = [
    (1, "Call_Get_Market_Research_Tool_", "Market Research"),
    (2, "Call_Get_Competitors_Tool_", "Competitor Analysis"),
    (3, "Call_Get_Audience_Tool_", "Target Audience"),
    (4, "Call_Get_Pain_Points_Tool_", "Pain Points"),
    (5, "Call_Get_Opportunity_Tool_", "Market Opportunity"),
    (6, "Call_Get_Pricing_Tool_", "Pricing Strategy"),
    (7, "Call_Get_Features_Tool_", "Feature Prioritization"),
    (8, "Call_Get_Go_To_Market_Tool_", "Go To Market"),
    (9, "Call_Get_Financials_Tool_", "Financial Projections"),
    (10, "Call_Get_Risks_Tool_", "Risk Assessment"),
    (11, "Call_Get_Validation_Score_Tool_", "Validation Score"),
];

/// Ordered list of the external calls that make up one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, RegistryError> {
        if steps.is_empty() {
            return Err(RegistryError::Empty);
        }

        for step in &steps {
            if step.tool_name.trim().is_empty() {
                return Err(RegistryError::BlankToolName(step.id));
            }
            if step.label.trim().is_empty() {
                return Err(RegistryError::BlankLabel(step.id));
            }
        }

        for pair in steps.windows(2) {
            if pair[1].id <= pair[0].id {
                return Err(RegistryError::OutOfOrder {
                    previous: pair[0].id,
                    current: pair[1].id,
                });
            }
        }

        Ok(Self { steps })
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let steps: Vec<StepDefinition> = serde_json::from_str(json)?;
        Self::new(steps)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Uses the file at `path` when given, the built-in sequence otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, RegistryError> {
        match path {
            Some(path) => {
                let registry = Self::from_json_file(path)?;
                tracing::info!(path, steps = registry.len(), "Loaded step registry from file");
                Ok(registry)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS
                .iter()
                .map(|(id, tool_name, label)| StepDefinition {
                    id: *id,
                    tool_name: (*tool_name).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: u32, tool: &str, label: &str) -> StepDefinition {
        StepDefinition {
            id,
            tool_name: tool.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_default_registry_has_eleven_ascending_steps() {
        let registry = StepRegistry::default();
        assert_eq!(registry.len(), 11);

        let ids: Vec<u32> = registry.steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());

        // Default must also pass the validation applied to file registries.
        tokio_test::assert_ok!(StepRegistry::new(registry.steps().to_vec()));
    }

    #[test]
    fn test_default_step_five_is_market_opportunity() {
        let registry = StepRegistry::default();
        let five = registry.get(5).unwrap();
        assert_eq!(five.label, "Market Opportunity");
        assert_eq!(five.tool_name, "Call_Get_Opportunity_Tool_");
    }

    #[test]
    fn test_from_json() {
        let registry = StepRegistry::from_json(
            r#"[
                {"id": 1, "tool_name": "Call_A_", "label": "Alpha"},
                {"id": 3, "tool_name": "Call_B_", "label": "Beta"}
            ]"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(3).unwrap().label, "Beta");
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(StepRegistry::from_json("[]"), Err(RegistryError::Empty)));
    }

    #[test]
    fn test_rejects_out_of_order_and_duplicates() {
        let err = StepRegistry::new(vec![step(2, "A", "a"), step(1, "B", "b")]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::OutOfOrder {
                previous: 2,
                current: 1
            }
        ));

        let err = StepRegistry::new(vec![step(1, "A", "a"), step(1, "B", "b")]).unwrap_err();
        assert!(matches!(err, RegistryError::OutOfOrder { .. }));
    }

    #[test]
    fn test_rejects_blank_fields() {
        let err = StepRegistry::new(vec![step(1, "  ", "a")]).unwrap_err();
        assert!(matches!(err, RegistryError::BlankToolName(1)));

        let err = StepRegistry::new(vec![step(4, "A", "")]).unwrap_err();
        assert!(matches!(err, RegistryError::BlankLabel(4)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            StepRegistry::from_json(r#"{"id": 1}"#),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_load_without_path_uses_default() {
        assert_eq!(StepRegistry::load(None).unwrap(), StepRegistry::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = StepRegistry::load(Some("/nonexistent/steps.json")).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
