use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("pms-report-orchestrator"));

// --- Orchestration Metrics ---

pub static ORCHESTRATION_RUNS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.orchestration.runs")
        .with_description("Report runs by outcome (completed, failed, error)")
        .with_unit("{run}")
        .build()
});

pub static STEP_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.step.duration")
        .with_description("Duration of a single report step in seconds")
        .with_unit("s")
        .build()
});

pub static STEP_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.step.failures")
        .with_description("Steps that ended the run with a non-2xx webhook response")
        .with_unit("{step}")
        .build()
});

// --- Webhook Metrics ---

pub static WEBHOOK_CALLS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("webhook.calls")
        .with_description("Outbound webhook calls by response class")
        .with_unit("{call}")
        .build()
});

pub static WEBHOOK_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("webhook.duration")
        .with_description("Outbound webhook call duration in seconds")
        .with_unit("s")
        .build()
});

// --- Report Row Metrics ---

pub static REPORTS_CREATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reports.created")
        .with_description("Total report rows created")
        .build()
});

pub static REPORTS_DELETED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reports.deleted")
        .with_description("Total report rows deleted")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            30000.0, 60000.0, 300000.0,
        ])
        .build()
});
