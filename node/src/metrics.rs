//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use bank_token::{BankToken, ErrorKind};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Total number of committed ledger operations.
    pub operations_committed_total: IntCounter,
    /// Rejected operations, labelled by error kind.
    pub operations_rejected_total: IntCounterVec,
    /// Current total supply.
    pub total_supply: IntGauge,
    /// Withdrawals currently in the Pending state.
    pub pending_withdrawals: IntGauge,
    /// Number of registered holders.
    pub holder_count: IntGauge,
    /// Time spent executing one operation, including lock wait.
    pub operation_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("bank_token".into()), None)?;

        let operations_committed_total = IntCounter::new(
            "operations_committed_total",
            "Total number of committed ledger operations",
        )?;
        registry.register(Box::new(operations_committed_total.clone()))?;

        let operations_rejected_total = IntCounterVec::new(
            Opts::new(
                "operations_rejected_total",
                "Total number of rejected ledger operations by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(operations_rejected_total.clone()))?;

        let total_supply = IntGauge::new("total_supply", "Tokens currently in circulation")?;
        registry.register(Box::new(total_supply.clone()))?;

        let pending_withdrawals = IntGauge::new(
            "pending_withdrawals",
            "Withdrawals awaiting confirmation or rejection",
        )?;
        registry.register(Box::new(pending_withdrawals.clone()))?;

        let holder_count = IntGauge::new("holder_count", "Number of registered holders")?;
        registry.register(Box::new(holder_count.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Ledger operation processing latency in seconds",
            )
            .buckets(vec![
                0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_committed_total,
            operations_rejected_total,
            total_supply,
            pending_withdrawals,
            holder_count,
            operation_latency_seconds,
        })
    }

    /// Counts one rejected operation under its error kind.
    pub fn record_rejection(&self, kind: ErrorKind) {
        self.operations_rejected_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Refreshes the state gauges from a committed snapshot.
    pub fn observe(&self, token: &BankToken) {
        self.total_supply.set(clamp(token.total_supply()));
        self.pending_withdrawals
            .set(clamp(token.pending_withdrawals().count() as u64));
        self.holder_count
            .set(clamp(token.state().holder_count() as u64));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn clamp(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_token::TokenConfig;

    #[test]
    fn gauges_follow_ledger_state() {
        let metrics = LedgerMetrics::new().unwrap();
        let (mut token, _) = BankToken::deploy(TokenConfig::new("owner"));
        token.deposit("owner", "alice", 300, "e", "b1").unwrap();
        token.deposit("owner", "bob", 200, "e", "b2").unwrap();
        token.request_withdrawal("owner", "alice", 50).unwrap();

        metrics.observe(&token);
        assert_eq!(metrics.total_supply.get(), 450);
        assert_eq!(metrics.pending_withdrawals.get(), 1);
        assert_eq!(metrics.holder_count.get(), 2);
    }

    #[test]
    fn rejections_are_labelled_by_kind() {
        let metrics = LedgerMetrics::new().unwrap();
        metrics.record_rejection(ErrorKind::CapExceeded);
        metrics.record_rejection(ErrorKind::CapExceeded);
        metrics.record_rejection(ErrorKind::Unauthorized);

        let text = metrics.encode().unwrap();
        assert!(text.contains("bank_token_operations_rejected_total{kind=\"CapExceeded\"} 2"));
        assert!(text.contains("bank_token_operations_rejected_total{kind=\"Unauthorized\"} 1"));
    }
}
