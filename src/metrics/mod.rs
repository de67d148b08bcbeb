// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
};
use std::sync::LazyLock;
use std::time::Instant;

static DEFAULT_REGISTRY: LazyLock<RwLock<prometheus_client::registry::Registry>> =
    LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, prometheus_client::registry::Registry> {
    DEFAULT_REGISTRY.write()
}

/// Renders the default registry in the Prometheus text exposition format.
pub fn encode_default_registry() -> anyhow::Result<String> {
    let mut metrics = String::new();
    prometheus_client::encoding::text::encode(&mut metrics, &DEFAULT_REGISTRY.read())?;
    Ok(metrics)
}

pub static SECTOR_TRANSITIONS: LazyLock<Family<KindLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    DEFAULT_REGISTRY.write().register(
        "sector_transitions",
        "Number of sector state transitions by kind",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet, derive_more::Constructor)]
pub struct KindLabel {
    kind: &'static str,
}

pub mod values {
    use super::KindLabel;

    pub const SECTOR_COMMITTED: KindLabel = KindLabel::new("committed");
    pub const SECTOR_ACTIVATED: KindLabel = KindLabel::new("activated");
    pub const SECTOR_RECOVERING: KindLabel = KindLabel::new("recovering");
    pub const SECTOR_FAILED: KindLabel = KindLabel::new("failed");
    /// Cleared after too many consecutive faults.
    pub const SECTOR_TERMINATED: KindLabel = KindLabel::new("terminated");
    pub const SECTOR_EXPIRED: KindLabel = KindLabel::new("expired");
}

pub fn default_histogram() -> Histogram {
    // Default values from go client(https://github.com/prometheus/client_golang/blob/5d584e2717ef525673736d72cd1d12e304f243d7/prometheus/histogram.go#L68)
    Histogram::new([
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ])
}

pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        let duration = Instant::now() - self.start;
        self.histogram.observe(duration.as_secs_f64());
    }
}

pub trait HistogramTimerExt {
    fn start_timer(&self) -> HistogramTimer<'_>;
}

impl HistogramTimerExt for Histogram {
    fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            start: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_transitions_are_exported() {
        SECTOR_TRANSITIONS.get_or_create(&values::SECTOR_COMMITTED).inc();
        let text = encode_default_registry().unwrap();
        assert!(text.contains("sector_transitions"));
    }
}
