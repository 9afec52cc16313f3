use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct StationTelemetry {
    inner: Arc<Inner>,
}

struct Inner {
    preparations_total: Counter<u64>,
    preparation_errors_total: Counter<u64>,
    activations_total: Counter<u64>,
    delegations_total: Counter<u64>,
    broadcasts_total: Counter<u64>,
    broadcast_errors_total: Counter<u64>,
    verification_timeouts_total: Counter<u64>,
    simulation_fallbacks_total: Counter<u64>,

    preparation_ms: Histogram<u64>,
    node_http_ms: Histogram<u64>,
    broadcast_ms: Histogram<u64>,
}

impl StationTelemetry {
    pub fn new() -> Self {
        let meter = global::meter("station");

        let preparations_total = meter
            .u64_counter("station.preparations_total")
            .with_description("Total preparation runs, partitioned by strategy")
            .build();
        let preparation_errors_total = meter
            .u64_counter("station.preparation_errors_total")
            .with_description("Total structured errors recorded by preparations")
            .build();
        let activations_total = meter
            .u64_counter("station.activations_total")
            .with_description("Total account activations attempted")
            .build();
        let delegations_total = meter
            .u64_counter("station.delegations_total")
            .with_description("Total resource delegations attempted")
            .build();
        let broadcasts_total = meter
            .u64_counter("station.broadcasts_total")
            .with_description("Total Tron transactions broadcast")
            .build();
        let broadcast_errors_total = meter
            .u64_counter("station.broadcast_errors_total")
            .with_description("Total Tron broadcast rejections")
            .build();
        let verification_timeouts_total = meter
            .u64_counter("station.verification_timeouts_total")
            .with_description("Total verification windows that elapsed without an observation")
            .build();
        let simulation_fallbacks_total = meter
            .u64_counter("station.simulation_fallbacks_total")
            .with_description("Total simulations replaced by category estimates")
            .build();

        let preparation_ms = meter
            .u64_histogram("station.preparation_ms")
            .with_description("Per-preparation runtime")
            .with_unit("ms")
            .build();
        let node_http_ms = meter
            .u64_histogram("station.node_http_ms")
            .with_description("Tron node HTTP call runtime")
            .with_unit("ms")
            .build();
        let broadcast_ms = meter
            .u64_histogram("station.broadcast_ms")
            .with_description("Tron transaction broadcast runtime")
            .with_unit("ms")
            .build();

        Self {
            inner: Arc::new(Inner {
                preparations_total,
                preparation_errors_total,
                activations_total,
                delegations_total,
                broadcasts_total,
                broadcast_errors_total,
                verification_timeouts_total,
                simulation_fallbacks_total,
                preparation_ms,
                node_http_ms,
                broadcast_ms,
            }),
        }
    }

    pub fn preparation(&self, strategy: &'static str, success: bool, ms: u64) {
        let attrs = [
            KeyValue::new("strategy", strategy),
            KeyValue::new("status", if success { "ok" } else { "err" }),
        ];
        self.inner.preparations_total.add(1, &attrs);
        self.inner.preparation_ms.record(ms, &attrs);
    }

    pub fn preparation_error(&self, kind: &'static str, at: &'static str) {
        let attrs = [KeyValue::new("kind", kind), KeyValue::new("where", at)];
        self.inner.preparation_errors_total.add(1, &attrs);
    }

    pub fn activation(&self, mode: &'static str, ok: bool) {
        let attrs = [
            KeyValue::new("mode", mode),
            KeyValue::new("status", if ok { "ok" } else { "err" }),
        ];
        self.inner.activations_total.add(1, &attrs);
    }

    pub fn delegation(&self, resource: &'static str, ok: bool) {
        let attrs = [
            KeyValue::new("resource", resource),
            KeyValue::new("status", if ok { "ok" } else { "err" }),
        ];
        self.inner.delegations_total.add(1, &attrs);
    }

    pub fn broadcast_ms(&self, ok: bool, ms: u64) {
        let attrs = [KeyValue::new("status", if ok { "ok" } else { "err" })];
        self.inner.broadcasts_total.add(1, &attrs);
        if !ok {
            self.inner.broadcast_errors_total.add(1, &attrs);
        }
        self.inner.broadcast_ms.record(ms, &attrs);
    }

    pub fn verification_timeout(&self, resource: &'static str) {
        let attrs = [KeyValue::new("resource", resource)];
        self.inner.verification_timeouts_total.add(1, &attrs);
    }

    pub fn simulation_fallback(&self, reason: &'static str) {
        let attrs = [KeyValue::new("reason", reason)];
        self.inner.simulation_fallbacks_total.add(1, &attrs);
    }

    pub fn node_http_ms(&self, op: &'static str, ok: bool, ms: u64) {
        let attrs = [
            KeyValue::new("op", op),
            KeyValue::new("status", if ok { "ok" } else { "err" }),
        ];
        self.inner.node_http_ms.record(ms, &attrs);
    }
}

impl Default for StationTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
