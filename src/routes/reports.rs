use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::db::ReportRow;
use crate::error::{AppError, AppResult};
use crate::telemetry::metrics::{REPORTS_CREATED, REPORTS_DELETED};

#[derive(Debug, Deserialize)]
pub struct CreateReportBody {
    pub correlation_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub row: ReportRow,
    pub terminal: bool,
}

impl From<ReportRow> for ReportView {
    fn from(row: ReportRow) -> Self {
        let terminal = row.status_detail.0.is_terminal();
        Self { row, terminal }
    }
}

impl CreateReportBody {
    /// Validated id and payload for a new row. Generates an id when none is given.
    pub fn into_parts(self) -> AppResult<(String, serde_json::Value)> {
        let id = match self.correlation_id {
            Some(id) if id.trim().is_empty() => {
                return Err(AppError::Validation(
                    "correlation_id must not be blank".into(),
                ));
            }
            Some(id) => id.trim().to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let data = match self.data {
            None => serde_json::Value::Object(Default::default()),
            Some(data @ serde_json::Value::Object(_)) => data,
            Some(_) => {
                return Err(AppError::Validation("data must be a JSON object".into()));
            }
        };

        Ok((id, data))
    }
}

pub async fn create_report(
    State(state): State<AppState>,
    Json(body): Json<CreateReportBody>,
) -> AppResult<(StatusCode, Json<ReportView>)> {
    let (id, data) = body.into_parts()?;

    let row = state
        .reports
        .create(&id, &data)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Report {id} already exists")))?;

    REPORTS_CREATED.add(1, &[]);
    tracing::info!(report.id = %row.id, "Report created");

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReportView>> {
    let row = state
        .reports
        .find(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {id} not found")))?;

    Ok(Json(row.into()))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.reports.delete(&id).await? {
        return Err(AppError::NotFound(format!("Report {id} not found")));
    }

    REPORTS_DELETED.add(1, &[]);
    tracing::info!(report.id = %id, "Report deleted");

    Ok(StatusCode::NO_CONTENT)
}
