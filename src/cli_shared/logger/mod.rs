// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::Path;

use tracing_subscriber::{EnvFilter, Registry, prelude::*};

/// Installs the global subscriber: a console layer and, with `log_dir`, an
/// hourly rolling file. Fails if a global subscriber is already set.
pub fn setup_logger(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let mut layers: Vec<Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync>> =
        // console logger
        vec![Box::new(
            tracing_subscriber::fmt::Layer::new()
                .with_filter(get_env_filter(default_env_filter())),
        )];

    // file logger
    if let Some(log_dir) = log_dir {
        let file_appender = tracing_appender::rolling::hourly(log_dir, "forest-spc.log");
        layers.push(Box::new(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(false)
                .with_writer(file_appender)
                .with_filter(get_env_filter(default_env_filter())),
        ));
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable, or a default
/// - see [`default_env_filter`]
fn get_env_filter(def: EnvFilter) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(s) => EnvFilter::new(s),
        Err(NotPresent) => def,
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

fn default_env_filter() -> EnvFilter {
    let default_directives = [
        "info",
        "forest_spc::actors::miner=info",
        "forest_spc::fil_cns=warn",
    ];
    EnvFilter::try_new(default_directives.join(",")).unwrap_or_default()
}
