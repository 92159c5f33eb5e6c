//! Logging Setup
//!
//! Installs the global tracing subscriber: an `EnvFilter` (overridable with
//! `RUST_LOG`), a stdout fmt layer, and optionally a daily-rolling file layer.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "assembly_dashboard=info,tower_http=info";

/// Keeps the file writer flushing; hold it for the life of the process.
pub struct TelemetryGuard {
    _file_writer: Option<WorkerGuard>,
}

pub fn init_telemetry(service_name: &str, log_dir: Option<&Path>) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, file_writer) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(TelemetryGuard {
        _file_writer: file_writer,
    })
}
