pub mod orchestrator;
pub mod status;
pub mod steps;
pub mod webhook;

pub use orchestrator::{
    OrchestrationError, Orchestrator, RunOutcome, StatusStore, StepInvoker, StepResponse,
};
pub use status::ReportStatus;
pub use steps::{StepDefinition, StepRegistry};
pub use webhook::{WebhookCaller, WebhookError};
