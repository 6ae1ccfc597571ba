pub mod pool;
pub mod reports;

pub use pool::{create_pool, run_migrations};
pub use reports::{ReportRepository, ReportRow};
