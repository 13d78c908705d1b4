//! Log sinks: stdout plus an append-only file, both in the
//! `[<timestamp>] <LEVEL>: <message>` line format.

use std::{
    fmt,
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::Context;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{metadata::LevelFilter, Event, Subscriber};
use tracing_subscriber::{
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|_| fmt::Error)?;

        write!(writer, "[{timestamp}] {}: ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber. Honors `RUST_LOG`, defaulting to `info`.
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    if let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().event_format(LineFormat))
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::capture;

    fn captured(f: impl FnOnce()) -> String {
        let (logs, guard) = capture();
        f();
        drop(guard);
        logs.contents()
    }

    #[test]
    fn line_format() {
        let out = captured(|| tracing::warn!("No email address provided."));

        assert!(out.starts_with('['), "{out}");
        let (timestamp, rest) = out[1..].split_once(']').unwrap();
        assert!(timestamp.ends_with('Z'), "{timestamp}");
        assert_eq!(rest, " WARN: No email address provided.\n");
    }

    #[test]
    fn one_line_per_event() {
        let out = captured(|| {
            tracing::info!("Password reset email sent to: user@example.com");
            tracing::error!("Email sending error: Connection timeout");
        });

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] INFO: Password reset email sent to: user@example.com"));
        assert!(lines[1].ends_with("] ERROR: Email sending error: Connection timeout"));
    }
}
