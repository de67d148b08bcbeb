// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
};
use std::sync::LazyLock;

pub static BLOCK_VALIDATION_TIME: LazyLock<Histogram> = LazyLock::new(|| {
    let metric = crate::metrics::default_histogram();
    crate::metrics::default_registry().register(
        "cns_block_validation_time",
        "Duration of routine which validate blocks in fil_cns",
        metric.clone(),
    );
    metric
});

pub static BLOCK_VALIDATION_FAILURE: LazyLock<Family<ReasonLabel, Counter>> =
    LazyLock::new(|| {
        let metric = Family::default();
        crate::metrics::default_registry().register(
            "cns_block_validation_failure",
            "Number of rejected blocks by reason",
            metric.clone(),
        );
        metric
    });

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabel {
    reason: &'static str,
}

impl ReasonLabel {
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}
