use anyhow::{anyhow, Context, Result};
use opentelemetry::global;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const SERVICE_NAME: &str = "csmctl";

/// Where run logs go. Everything but `File` writes to stderr so stdout
/// carries only the JSON report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
    File,
    Otlp,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" | "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "file" => Ok(LogFormat::File),
            "otlp" => Ok(LogFormat::Otlp),
            other => Err(anyhow!("Unknown log format: {}", other)),
        }
    }
}

impl LogFormat {
    /// `CSM_LOG_FORMAT`, then `OTEL_EXPORTER`.
    pub fn from_env() -> Self {
        let Ok(value) = std::env::var("CSM_LOG_FORMAT").or_else(|_| std::env::var("OTEL_EXPORTER")) else {
            return LogFormat::default();
        };

        value.parse().unwrap_or_else(|e| {
            eprintln!("{}, falling back to stdout", e);
            LogFormat::default()
        })
    }
}

pub fn init_telemetry() -> Result<()> {
    match LogFormat::from_env() {
        LogFormat::Text => init_text(),
        LogFormat::Json => init_json(),
        LogFormat::File => init_file(),
        LogFormat::Otlp => init_otlp(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_text() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()
        .context("Failed to install text logger")
}

fn init_json() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter())
        .try_init()
        .context("Failed to install JSON logger")
}

fn init_file() -> Result<()> {
    let path = std::env::var("LOG_FILE").unwrap_or_else(|_| format!("{}.log", SERVICE_NAME));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .with(env_filter())
        .try_init()
        .context("Failed to install file logger")?;

    eprintln!("Logging to file: {}", path);
    Ok(())
}

/// Spans from controller runs go to the collector named by the standard
/// `OTEL_EXPORTER_OTLP_*` variables; events still go to stderr.
fn init_otlp() -> Result<()> {
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string());
    let resource = opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
        "service.name",
        service_name,
    )]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic())
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(resource))
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .context("Failed to install OTLP pipeline")?;

    tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()
        .context("Failed to install OTLP logger")
}

pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_names() {
        assert_eq!("stdout".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("otlp".parse::<LogFormat>().unwrap(), LogFormat::Otlp);
        assert!("jaeger".parse::<LogFormat>().is_err());
    }
}
