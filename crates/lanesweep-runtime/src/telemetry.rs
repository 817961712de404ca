//! Logging and OpenTelemetry initialisation for LaneSweep.
//!
//! Call [`init_tracing`] once at process startup and keep the returned
//! [`TelemetryGuard`] alive until exit.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). Use `debug` to see every command. |
//! | `LANESWEEP_LOG_FORMAT=json` | Emit newline-delimited JSON on the console. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). When set, spans are exported over OTLP/HTTP. |
//!
//! # Example
//!
//! ```rust,no_run
//! use lanesweep_runtime::telemetry::{TelemetryConfig, init_tracing};
//!
//! let _guard = init_tracing("lanesweep", &TelemetryConfig::default()).unwrap();
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lanesweep_types::SweepError;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Output options that come from the config file rather than the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Force JSON console output regardless of `LANESWEEP_LOG_FORMAT`.
    pub json: bool,
    /// Append a plain-text copy of every event to this file.
    pub log_file: Option<PathBuf>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global `tracing` subscriber.
///
/// The console layer is always present.  A file layer is added when
/// `config.log_file` is set and an OTLP layer when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set; an exporter that fails to build is
/// reported on stderr and skipped.
///
/// # Errors
///
/// Returns [`SweepError::Telemetry`] when the log file cannot be opened or a
/// global subscriber is already installed.
pub fn init_tracing(service_name: &str, config: &TelemetryConfig) -> Result<TelemetryGuard, SweepError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = config.json || std::env::var("LANESWEEP_LOG_FORMAT").as_deref() == Ok("json");

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if use_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().boxed()
    });

    if let Some(path) = &config.log_file {
        let file = open_log_file(path)?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    let provider = build_provider(service_name);
    if let Some(p) = &provider {
        let tracer = p.tracer("lanesweep");
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| SweepError::Telemetry(format!("cannot install subscriber: {e}")))?;

    Ok(TelemetryGuard(provider))
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// Shuts down the OTel [`SdkTracerProvider`] on drop, flushing pending spans.
pub struct TelemetryGuard(Option<SdkTracerProvider>);

impl TelemetryGuard {
    /// `true` when spans are being exported over OTLP.
    pub fn exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[lanesweep] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[lanesweep] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // The control loop never runs a Tokio runtime, so batch export is out.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

fn open_log_file(path: &Path) -> Result<File, SweepError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            SweepError::Telemetry(format!("cannot create log directory {}: {e}", parent.display()))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SweepError::Telemetry(format!("cannot open log file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn build_provider_returns_none_without_endpoint() {
        // SAFETY: no other test in this crate touches this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("test-service").is_none());
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        let guard = TelemetryGuard(None);
        assert!(!guard.exporting());
        drop(guard);
    }

    #[test]
    fn log_file_is_created_with_parents_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("sweep.log");

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "first").unwrap();
        drop(file);
        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn log_file_in_missing_location_reports_telemetry_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = open_log_file(&blocker.join("sweep.log")).unwrap_err();
        assert!(matches!(err, SweepError::Telemetry(_)));
    }
}
