use anyhow::Result;
use mktv_config::LoggingConfig;
use std::io::{self, IsTerminal};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc, writer::BoxMakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Build the filter from the verbosity flags, falling back to `RUST_LOG`,
/// then the configured level
fn build_filter(verbose_level: u8, quiet: bool, configured_level: Option<&str>) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    let default = match verbose_level {
        0 => configured_level.unwrap_or("info"),
        // -v: debug, but keep the HTTP client's connection chatter out
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn,rustls=warn",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn json_enabled(configured: Option<bool>) -> bool {
    match std::env::var("RUST_LOG_JSON") {
        Ok(v) => v == "true",
        Err(_) => configured.unwrap_or_else(|| !io::stdout().is_terminal()),
    }
}

/// Daily rolling appender: `mktv.log` becomes `mktv.2026-01-17`, ...
fn file_writer(log_path: &Path) -> Result<RollingFileAppender> {
    let log_dir = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
    std::fs::create_dir_all(log_dir)?;

    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
    let log_prefix = log_filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(log_filename);

    Ok(RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix))
}

pub fn init_logging(verbose_level: u8, quiet: bool, settings: Option<&LoggingConfig>) -> Result<()> {
    let filter = build_filter(verbose_level, quiet, settings.map(|s| s.level.as_str()));
    let json = json_enabled(settings.map(|s| s.json));

    // Logs go to stderr so stdout stays clean for --output json
    let (writer, ansi) = match settings.and_then(|s| s.file.as_deref()) {
        Some(path) => (BoxMakeWriter::new(file_writer(path)?), false),
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let registry = Registry::default().with(filter);
    if json {
        let layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer);
        registry.with(layer).init();
    } else {
        let layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer);
        registry.with(layer).init();
    }

    Ok(())
}
