use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::StepDefinition;

#[derive(Debug, Deserialize)]
pub struct OrchestrateBody {
    pub correlation_id: Option<String>,
}

/// Runs the whole step sequence for one report.
///
/// A failed step is still a 200: the body carries `success: false` and the
/// step that stopped the run.
pub async fn orchestrate_report(
    State(state): State<AppState>,
    Json(body): Json<OrchestrateBody>,
) -> AppResult<Json<Value>> {
    let correlation_id = body.correlation_id.unwrap_or_default();

    let outcome = state.orchestrator.run(&correlation_id).await?;

    Ok(Json(outcome.to_json()))
}

pub async fn list_steps(State(state): State<AppState>) -> Json<Vec<StepDefinition>> {
    Json(state.orchestrator.registry().steps().to_vec())
}
