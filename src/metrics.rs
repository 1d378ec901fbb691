//! Prometheus metrics for claimgate.
//!
//! Initialize one [`Metrics`] handle at startup and clone the `Arc` into
//! the services that record on it. The optional HTTP server exposes the
//! registry at `/metrics` and shuts down on the broadcast signal.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Histogram buckets for claim execution latency (seconds)
const CLAIM_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    admission_checks: CounterVec,
    verdict_lookups: CounterVec,
    claims: CounterVec,
    claim_duration: Histogram,
    submissions: CounterVec,
    jobs: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let admission_checks = CounterVec::new(
            Opts::new(
                "claimgate_admission_checks_total",
                "Rate limit checks by action class and outcome",
            ),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(admission_checks.clone()))?;

        let verdict_lookups = CounterVec::new(
            Opts::new(
                "claimgate_verdict_lookups_total",
                "Availability verdict lookups by cache outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(verdict_lookups.clone()))?;

        let claims = CounterVec::new(
            Opts::new("claimgate_claims_total", "Claim executions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(claims.clone()))?;

        let claim_duration = Histogram::with_opts(
            HistogramOpts::new(
                "claimgate_claim_duration_seconds",
                "Wall time of claim executions",
            )
            .buckets(CLAIM_LATENCY_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(claim_duration.clone()))?;

        let submissions = CounterVec::new(
            Opts::new(
                "claimgate_submissions_total",
                "Coordinator submissions by path (sync or deferred)",
            ),
            &["path"],
        )?;
        registry.register(Box::new(submissions.clone()))?;

        let jobs = CounterVec::new(
            Opts::new("claimgate_jobs_total", "Queued jobs by terminal status"),
            &["status"],
        )?;
        registry.register(Box::new(jobs.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            admission_checks,
            verdict_lookups,
            claims,
            claim_duration,
            submissions,
            jobs,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_admission(&self, action: &str, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "denied" };
        self.admission_checks
            .with_label_values(&[action, outcome])
            .inc();
    }

    pub fn record_verdict_lookup(&self, outcome: &str) {
        self.verdict_lookups.with_label_values(&[outcome]).inc();
    }

    pub fn record_claim(&self, outcome: &str, seconds: f64) {
        self.claims.with_label_values(&[outcome]).inc();
        self.claim_duration.observe(seconds);
    }

    pub fn record_submission(&self, path: &str) {
        self.submissions.with_label_values(&[path]).inc();
    }

    pub fn record_job(&self, status: &str) {
        self.jobs.with_label_values(&[status]).inc();
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    let families = metrics.registry.gather();
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    match encoder.encode(&families, &mut buf) {
        Ok(()) => (StatusCode::OK, buf).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()).into_response()
        }
    }
}

/// Serve `/metrics` on `addr` until the shutdown channel fires.
pub async fn run_metrics_server(
    addr: SocketAddr,
    metrics: Arc<Metrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    debug!(%addr, "metrics server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
