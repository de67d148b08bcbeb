// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::Path;

use crate::actors::Policy;
use crate::utils::io::read_toml;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Top level configuration. Every section falls back to its defaults, so a
/// file only needs the values it changes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub policy: Policy,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&toml).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config: Self = read_toml(toml)?;
        config.policy.validate()?;
        Ok(config)
    }
}
