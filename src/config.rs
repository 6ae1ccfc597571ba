use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub webhook: WebhookConfig,
    pub step_registry_path: Option<String>,
    pub request_timeout_secs: u64,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Full URL or a bare hook identifier. Unset means every run fails with a
    /// configuration error.
    pub endpoint: Option<String>,
    pub base_url: String,
    pub correlation_field: String,
    pub timeout_secs: Option<u64>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            base_url: "https://hook.us1.make.com".to_string(),
            correlation_field: "correlation_id".to_string(),
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let webhook_defaults = WebhookConfig::default();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DATABASE_MAX_CONNECTIONS must be a number"),
            run_migrations: env::var("RUN_MIGRATIONS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            webhook: WebhookConfig {
                endpoint: env::var("PMS_WEBHOOK")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
                base_url: env::var("PMS_WEBHOOK_BASE_URL").unwrap_or(webhook_defaults.base_url),
                correlation_field: env::var("PMS_WEBHOOK_CORRELATION_FIELD")
                    .unwrap_or(webhook_defaults.correlation_field),
                timeout_secs: env::var("PMS_WEBHOOK_TIMEOUT_SECS").ok().map(|v| {
                    v.parse()
                        .expect("PMS_WEBHOOK_TIMEOUT_SECS must be a number")
                }),
            },
            step_registry_path: env::var("PMS_STEP_REGISTRY_PATH").ok(),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a number"),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "pms-report-orchestrator".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
