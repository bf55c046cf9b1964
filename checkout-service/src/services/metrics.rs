use anyhow::{anyhow, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static CHECKOUT_ORDERS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_VERIFICATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CHECKOUT_AMOUNT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Install the Prometheus recorder and register the checkout counters.
///
/// Call once per process; recording before this is a no-op.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow!("failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow!("metrics handle already initialized"))?;

    let registry = Registry::new();

    let orders_counter = IntCounterVec::new(
        Opts::new(
            "checkout_orders_total",
            "Checkout order attempts by outcome",
        ),
        &["outcome"],
    )?;

    let verifications_counter = IntCounterVec::new(
        Opts::new(
            "payment_verifications_total",
            "Payment signature verifications by outcome",
        ),
        &["outcome"],
    )?;

    // In smallest currency unit
    let amount_counter = IntCounterVec::new(
        Opts::new(
            "checkout_amount_minor_total",
            "Total amount of created orders by currency (in smallest unit)",
        ),
        &["currency"],
    )?;

    registry.register(Box::new(orders_counter.clone()))?;
    registry.register(Box::new(verifications_counter.clone()))?;
    registry.register(Box::new(amount_counter.clone()))?;

    PROMETHEUS_REGISTRY
        .set(registry)
        .map_err(|_| anyhow!("prometheus registry already initialized"))?;
    CHECKOUT_ORDERS_TOTAL
        .set(orders_counter)
        .map_err(|_| anyhow!("checkout_orders_total already initialized"))?;
    PAYMENT_VERIFICATIONS_TOTAL
        .set(verifications_counter)
        .map_err(|_| anyhow!("payment_verifications_total already initialized"))?;
    CHECKOUT_AMOUNT_TOTAL
        .set(amount_counter)
        .map_err(|_| anyhow!("checkout_amount_minor_total already initialized"))?;

    Ok(())
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_order(outcome: &str) {
    if let Some(counter) = CHECKOUT_ORDERS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_verification(outcome: &str) {
    if let Some(counter) = PAYMENT_VERIFICATIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_amount(currency: &str, amount_minor: u64) {
    if let Some(counter) = CHECKOUT_AMOUNT_TOTAL.get() {
        counter.with_label_values(&[currency]).inc_by(amount_minor);
    }
}
