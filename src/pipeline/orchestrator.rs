use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use reqwest::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use super::status::ReportStatus;
use super::steps::{StepDefinition, StepRegistry};
use super::webhook::WebhookError;
use crate::telemetry::metrics::{ORCHESTRATION_RUNS, STEP_DURATION, STEP_FAILURES};

/// Where status transitions of a report row are written.
#[async_trait::async_trait]
pub trait StatusStore: Send + Sync {
    async fn write_status(
        &self,
        correlation_id: &str,
        status: &ReportStatus,
    ) -> Result<(), sqlx::Error>;
}

/// Performs the external work behind one step.
#[async_trait::async_trait]
pub trait StepInvoker: Send + Sync {
    /// Checked once per run, before anything is written.
    fn ensure_configured(&self) -> Result<(), WebhookError> {
        Ok(())
    }

    async fn invoke(
        &self,
        step: &StepDefinition,
        correlation_id: &str,
    ) -> Result<StepResponse, WebhookError>;
}

#[derive(Debug, Clone)]
pub struct StepResponse {
    pub status: StatusCode,
    pub detail: Option<String>,
}

impl StepResponse {
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            detail: None,
        }
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        correlation_id: String,
    },
    Failed {
        step: u32,
        tool_name: String,
        error: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Body returned by the trigger endpoint. Both outcomes are sent with 200.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Completed { correlation_id } => json!({
                "success": true,
                "correlation_id": correlation_id,
            }),
            Self::Failed {
                step,
                tool_name,
                error,
            } => json!({
                "success": false,
                "failedAt": step,
                "tool_name": tool_name,
                "error": error,
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("correlation_id is required")]
    MissingCorrelationId,

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("status write failed: {0}")]
    Store(#[from] sqlx::Error),
}

pub struct Orchestrator {
    registry: Arc<StepRegistry>,
    store: Arc<dyn StatusStore>,
    invoker: Arc<dyn StepInvoker>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<StepRegistry>,
        store: Arc<dyn StatusStore>,
        invoker: Arc<dyn StepInvoker>,
    ) -> Self {
        Self {
            registry,
            store,
            invoker,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Runs every step in order, stopping at the first non-2xx response.
    ///
    /// Always starts from the first step. Transport and store errors are
    /// returned as `Err` and leave the row at its last written status.
    #[tracing::instrument(
        name = "pipeline orchestrate",
        skip(self),
        fields(
            report.steps_total = self.registry.len(),
            report.steps_completed,
            report.failed_step,
            report.duration_ms,
        )
    )]
    pub async fn run(&self, correlation_id: &str) -> Result<RunOutcome, OrchestrationError> {
        let correlation_id = correlation_id.trim();
        if correlation_id.is_empty() {
            return Err(OrchestrationError::MissingCorrelationId);
        }

        self.invoker.ensure_configured()?;

        let start = Instant::now();
        let span = tracing::Span::current();

        let result = self.run_steps(correlation_id, &span).await;

        let outcome_label = match &result {
            Ok(RunOutcome::Completed { .. }) => "completed",
            Ok(RunOutcome::Failed { .. }) => "failed",
            Err(_) => "error",
        };
        ORCHESTRATION_RUNS.add(1, &[KeyValue::new("outcome", outcome_label)]);
        span.record("report.duration_ms", start.elapsed().as_millis() as i64);

        result
    }

    async fn run_steps(
        &self,
        correlation_id: &str,
        span: &tracing::Span,
    ) -> Result<RunOutcome, OrchestrationError> {
        for (completed, step) in self.registry.steps().iter().enumerate() {
            span.record("report.steps_completed", completed as i64);

            self.store
                .write_status(correlation_id, &ReportStatus::in_progress(step))
                .await?;

            tracing::info!(
                step.id = step.id,
                step.tool_name = %step.tool_name,
                "Step started"
            );

            let step_start = Instant::now();
            let response = self.invoker.invoke(step, correlation_id).await?;

            let step_kv = [
                KeyValue::new("step.id", step.id as i64),
                KeyValue::new("step.tool_name", step.tool_name.clone()),
            ];
            STEP_DURATION.record(step_start.elapsed().as_secs_f64(), &step_kv);

            if !response.status.is_success() {
                let error = failure_message(step, &response);

                self.store
                    .write_status(correlation_id, &ReportStatus::failed(step, error.as_str()))
                    .await?;

                STEP_FAILURES.add(1, &step_kv);
                span.record("report.failed_step", step.id as i64);
                tracing::warn!(
                    step.id = step.id,
                    step.tool_name = %step.tool_name,
                    http.response.status_code = response.status.as_u16(),
                    error = %error,
                    "Step failed, aborting run"
                );

                return Ok(RunOutcome::Failed {
                    step: step.id,
                    tool_name: step.tool_name.clone(),
                    error,
                });
            }

            self.store
                .write_status(correlation_id, &ReportStatus::completed_step(step))
                .await?;
        }

        span.record("report.steps_completed", self.registry.len() as i64);
        self.store
            .write_status(correlation_id, &ReportStatus::Completed)
            .await?;

        tracing::info!("Report run completed");

        Ok(RunOutcome::Completed {
            correlation_id: correlation_id.to_string(),
        })
    }
}

fn failure_message(step: &StepDefinition, response: &StepResponse) -> String {
    match &response.detail {
        Some(detail) => format!(
            "{} returned {}: {}",
            step.tool_name, response.status, detail
        ),
        None => format!("{} returned {}", step.tool_name, response.status),
    }
}
