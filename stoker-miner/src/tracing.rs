//! Tracing, tailored to this program.
//!
//! The binary calls [`init`] once at startup to install a subscriber.
//! Everywhere else, `use crate::tracing::prelude::*` brings the usual
//! level macros into scope.

use std::{env, fmt};

use time::OffsetDateTime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::format::{DefaultFields, Writer as FmtWriter};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

#[cfg(target_os = "linux")]
use std::{io, os::unix::io::AsRawFd};

#[cfg(target_os = "linux")]
use nix::libc;

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Whether stderr is the stream systemd handed us.
///
/// systemd exports `JOURNAL_STREAM` as `device:inode` of the journal
/// socket; comparing against fstat(2) of stderr catches redirection.
///
/// See: https://www.freedesktop.org/software/systemd/man/latest/systemd.exec.html#%24JOURNAL_STREAM
#[cfg(target_os = "linux")]
fn stderr_is_journal_stream() -> bool {
    let Ok(value) = env::var("JOURNAL_STREAM") else {
        return false;
    };
    let Some((device, inode)) = value.split_once(':') else {
        return false;
    };
    let (Ok(device), Ok(inode)) = (device.parse::<u64>(), inode.parse::<u64>()) else {
        return false;
    };

    let fd = io::stderr().as_raw_fd();
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
        return false;
    }

    stat.st_dev == device && stat.st_ino == inode
}

/// Initialize logging: journald when running under systemd, stdout
/// otherwise.
pub fn init() {
    #[cfg(target_os = "linux")]
    {
        if stderr_is_journal_stream() {
            if let Ok(layer) = tracing_journald::layer() {
                tracing_subscriber::registry().with(layer).init();
                return;
            } else {
                error!("Failed to initialize journald logging, using stdout.");
            }
        }
    }

    use_stdout();
}

// Log to stdout, filtering per RUST_LOG with the default level raised
// from ERROR to INFO.
fn use_stdout() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(ClockTime)
                .with_target(true)
                .fmt_fields(DefaultFields::new())
                .event_format(CompactFormatter),
        )
        .init();
}

/// Single-line event formatter: wall clock, colored level, module path
/// with the crate prefix stripped, message, then any structured fields
/// dimmed at the end of the line.
struct CompactFormatter;

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

impl<S, N> FormatEvent<S, N> for CompactFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: FmtWriter<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut collected = FieldCollector::default();
        event.record(&mut collected);

        ClockTime.format_time(&mut writer)?;

        let (color, label) = match *event.metadata().level() {
            Level::ERROR => ("\x1b[31m", "ERROR"),
            Level::WARN => ("\x1b[33m", "WARN "),
            Level::INFO => ("\x1b[32m", "INFO "),
            Level::DEBUG => ("\x1b[34m", "DEBUG"),
            Level::TRACE => ("\x1b[35m", "TRACE"),
        };
        write!(writer, " {color}{label}\x1b[0m ")?;

        // Our modules log often enough that the crate prefix is noise;
        // dependency paths stay as-is.
        let target = event.metadata().target();
        let target = target.strip_prefix("stoker_miner::").unwrap_or(target);
        write!(writer, "{target}: ")?;

        if let Some(message) = &collected.message {
            // Debug formatting quotes strings.
            write!(writer, "{}", message.trim_matches('"'))?;
        }

        if !collected.fields.is_empty() {
            write!(writer, " \x1b[90m")?;
            for (i, (name, value)) in collected.fields.iter().enumerate() {
                if i > 0 {
                    write!(writer, ", ")?;
                }
                write!(writer, "{name}={}", value.trim_matches('"'))?;
            }
            write!(writer, "\x1b[0m")?;
        }

        writeln!(writer)
    }
}

// Wall-clock timestamps in local time, to the nearest second. The stock
// timer prints a long UTC string.
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut FmtWriter<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "{formatted}")
    }
}
