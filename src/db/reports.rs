use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use crate::pipeline::{ReportStatus, StatusStore};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: String,
    pub status: String,
    pub status_detail: Json<ReportStatus>,
    pub report_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a fresh row. Returns `None` when the id is already taken.
    #[instrument(name = "db.reports.create", skip(self, report_data))]
    pub async fn create(
        &self,
        id: &str,
        report_data: &serde_json::Value,
    ) -> Result<Option<ReportRow>, sqlx::Error> {
        let status = ReportStatus::NotStarted;

        sqlx::query_as::<_, ReportRow>(
            r#"
            INSERT INTO reports (id, status, status_detail, report_data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, status, status_detail, report_data, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(Json(&status))
        .bind(report_data)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.reports.find", skip(self))]
    pub async fn find(&self, id: &str) -> Result<Option<ReportRow>, sqlx::Error> {
        sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, status, status_detail, report_data, created_at, updated_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(name = "db.reports.delete", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.reports.update_status", skip(self, status), fields(report.status = %status))]
    pub async fn update_status(&self, id: &str, status: &ReportStatus) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2, status_detail = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(Json(status))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl StatusStore for ReportRepository {
    async fn write_status(
        &self,
        correlation_id: &str,
        status: &ReportStatus,
    ) -> Result<(), sqlx::Error> {
        let updated = self.update_status(correlation_id, status).await?;
        if updated == 0 {
            tracing::warn!(
                report.id = %correlation_id,
                report.status = %status,
                "Status write matched no report row"
            );
        }
        Ok(())
    }
}
