pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;

use db::ReportRepository;
use pipeline::Orchestrator;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub reports: ReportRepository,
    pub orchestrator: Arc<Orchestrator>,
}
