use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::str::FromStr;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target carrying one event per terminal query outcome.
pub const OUTCOME_TARGET: &str = "query_outcome";

/// Installs the global subscriber: an hourly-rolling file under
/// `config.directory` plus a colored console layer.
///
/// The returned guard flushes the file writer and must be kept alive.
pub fn setup_logger(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("Failed to create log directory {}", config.directory))?;

    let file_appender = tracing_appender::rolling::hourly(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_level = parse_level(&config.file_level)?;
    let console_level = parse_level(&config.console_level)?;

    let file_filter = Targets::new()
        .with_target(OUTCOME_TARGET, Level::INFO)
        .with_default(file_level);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = Targets::new()
        .with_target(OUTCOME_TARGET, Level::INFO)
        .with_default(console_level);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to set global subscriber")?;

    Ok(guard)
}

/// Installs a subscriber writing to the single file at `log_path`, for
/// short-lived tools and test runs that should not roll files.
///
/// Events at or above `level` are kept; terminal outcomes on
/// [`OUTCOME_TARGET`] are kept regardless.
pub fn setup_logger_with_file(log_path: &str, level: &str) -> Result<WorkerGuard> {
    let file = File::create(log_path)
        .with_context(|| format!("Failed to create log file {}", log_path))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    let filter = Targets::new()
        .with_target(OUTCOME_TARGET, Level::INFO)
        .with_default(parse_level(level)?);

    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .event_format(FileFormatter)
            .with_filter(filter),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global subscriber")?;

    Ok(guard)
}

fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| anyhow::anyhow!("Invalid log level '{}'", level))
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

fn colorize(msg: String) -> String {
    if msg.contains("SUCCESS") {
        let green = Style::new().fg(Color::LightGreen).bold();
        msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
    } else if msg.contains("FAILED") {
        let red = Style::new().fg(Color::LightRed).bold();
        msg.replace("FAILED", &red.paint("FAILED").to_string())
    } else {
        msg
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = *event.metadata().level();
        let msg = colorize(event_message(event));
        if level <= Level::WARN {
            let tag = Style::new().fg(Color::Yellow).paint(level.as_str());
            write!(writer, "[{}] ", tag)?;
        }
        writeln!(writer, "{}", msg)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let metadata = event.metadata();

        write!(
            writer,
            "{} [{}] {}: ",
            timestamp,
            metadata.level(),
            metadata.target()
        )?;
        writeln!(writer, "{}", event_message(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_marks_outcomes() {
        let success = colorize("transfers SUCCESS: 3 items merged".to_string());
        assert!(success.contains("\u{1b}["));
        let plain = colorize("chunk 2 done".to_string());
        assert_eq!(plain, "chunk 2 done");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert!(parse_level("loud").is_err());
    }
}
