//! Observability Hooks (C15).
//!
//! Per-handler call/failure/degraded counters and latency quantiles,
//! exposed via the `health` tool action together with store liveness and
//! breaker states (§4.15).

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct HandlerStats {
    calls: AtomicU64,
    failures: AtomicU64,
    degraded: AtomicU64,
    /// Bounded ring of recent latencies (ms), used to approximate quantiles.
    samples: Mutex<Vec<f64>>,
}

impl Default for HandlerStats {
    fn default() -> Self {
        Self {
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }
}

const MAX_SAMPLES: usize = 500;

#[derive(Debug, Serialize)]
pub struct HandlerSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub degraded: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub store_liveness: StoreLiveness,
    pub breaker_states: BreakerStates,
    pub handlers: std::collections::HashMap<String, HandlerSnapshot>,
    pub sla_compliant: bool,
}

#[derive(Debug, Serialize)]
pub struct StoreLiveness {
    pub relational: bool,
    pub vector: bool,
    pub graph: Option<bool>,
    pub cache: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BreakerStates {
    pub vector: String,
    pub graph: String,
    pub cache: String,
}

pub struct Observability {
    handlers: DashMap<String, Arc<HandlerStats>>,
}

impl Observability {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    fn stats_for(&self, handler: &str) -> Arc<HandlerStats> {
        self.handlers
            .entry(handler.to_string())
            .or_insert_with(|| Arc::new(HandlerStats::default()))
            .clone()
    }

    pub fn record(&self, handler: &str, duration: Duration, failed: bool, degraded: bool) {
        let stats = self.stats_for(handler);
        stats.calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            stats.failures.fetch_add(1, Ordering::Relaxed);
        }
        if degraded {
            stats.degraded.fetch_add(1, Ordering::Relaxed);
        }
        let mut samples = stats.samples.lock().unwrap();
        samples.push(duration.as_secs_f64() * 1000.0);
        if samples.len() > MAX_SAMPLES {
            samples.remove(0);
        }
    }

    pub fn health_snapshot(&self, store_liveness: StoreLiveness, breaker_states: BreakerStates) -> HealthSnapshot {
        let handlers = self.snapshot_handlers();
        let sla_compliant = handlers.values().all(|h| h.p95_ms <= 2000.0);
        HealthSnapshot {
            store_liveness,
            breaker_states,
            handlers,
            sla_compliant,
        }
    }

    pub fn snapshot_handlers(&self) -> std::collections::HashMap<String, HandlerSnapshot> {
        let mut out = std::collections::HashMap::new();
        for entry in self.handlers.iter() {
            let stats = entry.value();
            let mut samples = stats.samples.lock().unwrap().clone();
            samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
            out.insert(
                entry.key().clone(),
                HandlerSnapshot {
                    calls: stats.calls.load(Ordering::Relaxed),
                    failures: stats.failures.load(Ordering::Relaxed),
                    degraded: stats.degraded.load(Ordering::Relaxed),
                    p50_ms: percentile(&samples, 0.50),
                    p95_ms: percentile(&samples, 0.95),
                    p99_ms: percentile(&samples, 0.99),
                },
            );
        }
        out
    }
}

impl Default for Observability {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_failures() {
        let obs = Observability::new();
        obs.record("memory.store", Duration::from_millis(10), false, false);
        obs.record("memory.store", Duration::from_millis(20), true, false);
        let snap = obs.snapshot_handlers();
        let h = &snap["memory.store"];
        assert_eq!(h.calls, 2);
        assert_eq!(h.failures, 1);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 0.95), 0.0);
    }
}
