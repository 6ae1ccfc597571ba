use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use serde_json::{Map, Value};
use thiserror::Error;

use super::orchestrator::{StepInvoker, StepResponse};
use super::steps::StepDefinition;
use crate::config::WebhookConfig;
use crate::telemetry::metrics::{WEBHOOK_CALLS, WEBHOOK_DURATION};

const BODY_EXCERPT_LEN: usize = 500;
// Enough bytes for BODY_EXCERPT_LEN chars of any UTF-8 width.
const BODY_READ_LIMIT: usize = BODY_EXCERPT_LEN * 4;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook endpoint is not configured (set PMS_WEBHOOK)")]
    NotConfigured,

    /// `source` never carries the request URL, which embeds the hook secret.
    #[error("webhook request for {tool_name} failed: {source}")]
    Transport {
        tool_name: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Turns the configured endpoint into a URL. Full `http(s)://` URLs are used
/// as given, anything else is treated as a hook id under `base_url`.
pub fn resolve_webhook_url(endpoint: &str, base_url: &str) -> Option<String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return None;
    }

    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Some(endpoint.to_string());
    }

    Some(format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        endpoint.trim_matches('/')
    ))
}

pub struct WebhookCaller {
    client: reqwest::Client,
    url: Option<String>,
    correlation_field: String,
}

impl WebhookCaller {
    pub fn new(config: &WebhookConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let url = config
            .endpoint
            .as_deref()
            .and_then(|endpoint| resolve_webhook_url(endpoint, &config.base_url));

        Ok(Self {
            client: builder.build()?,
            url,
            correlation_field: config.correlation_field.clone(),
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn payload(&self, step: &StepDefinition, correlation_id: &str) -> Value {
        let mut body = Map::new();
        body.insert("tool_name".to_string(), Value::from(step.tool_name.as_str()));
        body.insert(
            self.correlation_field.clone(),
            Value::from(correlation_id),
        );
        Value::Object(body)
    }
}

#[async_trait::async_trait]
impl StepInvoker for WebhookCaller {
    fn ensure_configured(&self) -> Result<(), WebhookError> {
        self.url.as_ref().map(|_| ()).ok_or(WebhookError::NotConfigured)
    }

    #[tracing::instrument(
        name = "webhook.call",
        skip(self, step),
        fields(
            step.id = step.id,
            step.tool_name = %step.tool_name,
            http.response.status_code = tracing::field::Empty,
        )
    )]
    async fn invoke(
        &self,
        step: &StepDefinition,
        correlation_id: &str,
    ) -> Result<StepResponse, WebhookError> {
        let url = self.url.as_deref().ok_or(WebhookError::NotConfigured)?;
        let start = Instant::now();

        let result = self
            .client
            .post(url)
            .json(&self.payload(step, correlation_id))
            .send()
            .await;

        let tool_kv = KeyValue::new("step.tool_name", step.tool_name.clone());
        WEBHOOK_DURATION.record(start.elapsed().as_secs_f64(), &[tool_kv.clone()]);

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                WEBHOOK_CALLS.add(1, &[tool_kv, KeyValue::new("outcome", "transport_error")]);
                return Err(WebhookError::Transport {
                    tool_name: step.tool_name.clone(),
                    source: source.without_url(),
                });
            }
        };

        let status = response.status();
        tracing::Span::current().record("http.response.status_code", status.as_u16() as i64);
        WEBHOOK_CALLS.add(
            1,
            &[
                tool_kv,
                KeyValue::new("outcome", format!("{}xx", status.as_u16() / 100)),
            ],
        );

        // Success bodies are never inspected, failures keep an excerpt for the error text.
        let detail = if status.is_success() {
            None
        } else {
            read_excerpt(response).await
        };

        Ok(StepResponse { status, detail })
    }
}

/// Reads at most `BODY_READ_LIMIT` bytes of an error body.
async fn read_excerpt(mut response: reqwest::Response) -> Option<String> {
    let mut buf = Vec::new();
    while buf.len() < BODY_READ_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e.without_url(), "Failed to read webhook error body");
                break;
            }
        }
    }
    buf.truncate(BODY_READ_LIMIT);

    Some(excerpt(&String::from_utf8_lossy(&buf))).filter(|s| !s.is_empty())
}

fn excerpt(s: &str) -> String {
    s.trim().chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode as AxumStatus, routing::post};
    use reqwest::StatusCode;
    use tokio::net::TcpListener;

    use super::*;

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn spawn_hook(reply: AxumStatus) -> (String, Captured) {
        spawn_hook_with_body(reply, "hook says no".to_string()).await
    }

    async fn spawn_hook_with_body(reply: AxumStatus, body: String) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(captured): State<Captured>, Json(payload): Json<Value>| {
                        let body = body.clone();
                        async move {
                            captured.lock().unwrap().push(payload);
                            (reply, body)
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/hook"), captured)
    }

    fn opportunity() -> StepDefinition {
        StepDefinition {
            id: 5,
            tool_name: "Call_Get_Opportunity_Tool_".to_string(),
            label: "Market Opportunity".to_string(),
        }
    }

    fn caller_for(endpoint: Option<String>) -> WebhookCaller {
        WebhookCaller::new(&WebhookConfig {
            endpoint,
            ..WebhookConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_full_url() {
        assert_eq!(
            resolve_webhook_url("https://example.com/hooks/abc", "https://hook.us1.make.com"),
            Some("https://example.com/hooks/abc".to_string())
        );
        assert_eq!(
            resolve_webhook_url(" http://localhost:9000/x ", "ignored"),
            Some("http://localhost:9000/x".to_string())
        );
    }

    #[test]
    fn test_resolve_bare_identifier() {
        assert_eq!(
            resolve_webhook_url("abc123xyz", "https://hook.us1.make.com/"),
            Some("https://hook.us1.make.com/abc123xyz".to_string())
        );
        assert_eq!(
            resolve_webhook_url("/abc123xyz", "https://hook.us1.make.com"),
            Some("https://hook.us1.make.com/abc123xyz".to_string())
        );
    }

    #[test]
    fn test_resolve_blank() {
        assert_eq!(resolve_webhook_url("   ", "https://hook.us1.make.com"), None);
    }

    #[test]
    fn test_unconfigured_caller() {
        let caller = caller_for(None);
        assert!(caller.url().is_none());
        assert!(matches!(
            caller.ensure_configured(),
            Err(WebhookError::NotConfigured)
        ));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(2000);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_LEN);
        assert_eq!(excerpt("  short  "), "short");
    }

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let long = "é".repeat(600);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), BODY_EXCERPT_LEN);
        assert_eq!(cut.len(), BODY_EXCERPT_LEN * 2);

        let emoji = "🚀".repeat(10);
        assert_eq!(excerpt(&emoji), emoji);
    }

    #[tokio::test]
    async fn test_invoke_posts_tool_and_correlation_id() {
        let (url, captured) = spawn_hook(AxumStatus::OK).await;
        let caller = caller_for(Some(url));

        let response = caller.invoke(&opportunity(), "abc123").await.unwrap();
        assert!(response.status.is_success());
        assert!(response.detail.is_none());

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0],
            serde_json::json!({
                "tool_name": "Call_Get_Opportunity_Tool_",
                "correlation_id": "abc123",
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_uses_configured_correlation_field() {
        let (url, captured) = spawn_hook(AxumStatus::OK).await;
        let caller = WebhookCaller::new(&WebhookConfig {
            endpoint: Some(url),
            correlation_field: "wizard_id".to_string(),
            ..WebhookConfig::default()
        })
        .unwrap();

        caller.invoke(&opportunity(), "w-1").await.unwrap();

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies[0]["wizard_id"], "w-1");
        assert!(bodies[0].get("correlation_id").is_none());
    }

    #[tokio::test]
    async fn test_invoke_reports_non_success_status() {
        let (url, _captured) = spawn_hook(AxumStatus::INTERNAL_SERVER_ERROR).await;
        let caller = caller_for(Some(url));

        let response = caller.invoke(&opportunity(), "abc123").await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.detail.as_deref(), Some("hook says no"));
    }

    #[tokio::test]
    async fn test_invoke_large_error_body_is_cut_to_excerpt() {
        let (url, _captured) =
            spawn_hook_with_body(AxumStatus::BAD_GATEWAY, "ü".repeat(1_000_000)).await;
        let caller = caller_for(Some(url));

        let response = caller.invoke(&opportunity(), "abc123").await.unwrap();
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);

        let detail = response.detail.unwrap();
        assert_eq!(detail.chars().count(), BODY_EXCERPT_LEN);
        assert!(detail.chars().all(|c| c == 'ü'));
    }

    #[tokio::test]
    async fn test_invoke_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let caller = caller_for(Some(format!("http://{addr}/hook/SECRET_HOOK_ID")));
        let err = caller.invoke(&opportunity(), "abc123").await.unwrap_err();
        assert!(matches!(err, WebhookError::Transport { .. }));

        let message = err.to_string();
        assert!(message.contains("Call_Get_Opportunity_Tool_"), "{message}");
        assert!(!message.contains("SECRET_HOOK_ID"), "{message}");
        assert!(!message.contains(&addr.to_string()), "{message}");
    }
}
