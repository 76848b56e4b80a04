use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Render every registered metric in the Prometheus text format.
pub async fn encode_metrics() -> anyhow::Result<String> {
    let metrics = get_metrics().await;
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Outbound token metrics
    pub token_requests: IntCounterVec,
    pub token_acquire_duration: Histogram,

    // Key set metrics
    pub key_set_fetches: IntCounterVec,

    // Inbound validation metrics
    pub inbound_tokens: IntCounterVec,
    pub rule_failures: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("dapsclient".into()), None).expect("valid registry prefix");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Outbound
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests by outcome (cache_hit, acquired, failed)"),&["outcome"],).expect("metric definition"),
            token_acquire_duration: Histogram::with_opts(HistogramOpts::new("token_acquire_duration_seconds", "DAPS token acquisition duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),).expect("metric definition"),

            // Key set
            key_set_fetches: IntCounterVec::new(Opts::new("key_set_fetches_total", "Key set fetches by outcome (ok, not_found, error)"),&["outcome"],).expect("metric definition"),

            // Inbound
            inbound_tokens: IntCounterVec::new(Opts::new("inbound_tokens_total", "Inbound tokens by verdict"),&["verdict"],).expect("metric definition"),
            rule_failures: IntCounterVec::new(Opts::new("validation_rule_failures_total", "Failed validation rules"),&["rule"],).expect("metric definition"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).expect("unique metric");
        reg.register(Box::new(metrics.token_acquire_duration.clone())).expect("unique metric");
        reg.register(Box::new(metrics.key_set_fetches.clone())).expect("unique metric");
        reg.register(Box::new(metrics.inbound_tokens.clone())).expect("unique metric");
        reg.register(Box::new(metrics.rule_failures.clone())).expect("unique metric");

        metrics
    }
}
