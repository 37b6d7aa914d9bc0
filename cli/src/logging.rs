use std::any::Any;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::IsTerminal;

use anyhow::Context;
use anyhow::Result;
use hssh::config::Settings;
use camino::Utf8Path;
use tracing::debug;
use tracing::warn;
use tracing_appender::non_blocking;
use tracing_glog::Glog;
use tracing_glog::GlogFields;
use tracing_glog::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

const DEBUG_DIRECTIVE: &str = "warn,hssh=debug";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Guard holder for [`tracing`] things that need to live until the process is
/// replaced. Dropping it flushes the log file.
#[derive(Debug, Default)]
pub struct TracingGuard {
    guards: Vec<Box<dyn Any>>,
}

/// Filter directive: `log_level` if set, else one derived from `debug`.
fn directive(settings: &Settings) -> &str {
    match settings.log_level.as_deref() {
        Some(level) => level,
        None if settings.debug => DEBUG_DIRECTIVE,
        None => DEFAULT_DIRECTIVE,
    }
}

fn open_log_file(path: &Utf8Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("unable to open log file {path}"))
}

/// Initializes all [`tracing`] config.
///
/// Logs go to the configured log file, else to stderr when stdout is a
/// terminal. Otherwise nothing is installed and logging stays silent. A log
/// file that cannot be opened is reported and treated as not configured.
///
/// # Errors
///
/// If a global subscriber is already installed.
pub fn init_tracing(settings: &Settings) -> Result<TracingGuard> {
    let mut guard = TracingGuard::default();
    let filter = EnvFilter::builder().parse_lossy(directive(settings));

    let log_file = settings.logfile.as_deref().map(open_log_file).transpose();
    let (log_file, log_file_error) = match log_file {
        Ok(log_file) => (log_file, None),
        Err(error) => (None, Some(error)),
    };

    if let Some(log_file) = log_file {
        let (file_writer, file_writer_guard) = non_blocking(log_file);
        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(Glog::default().with_timer(LocalTime::default()))
            .fmt_fields(GlogFields::default())
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(filter);
        guard.guards.push(Box::new(file_writer_guard));

        tracing::subscriber::set_global_default(Registry::default().with(file_layer))?;
    } else if std::io::stdout().is_terminal() {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .event_format(Glog::default().with_timer(LocalTime::default()))
            .fmt_fields(GlogFields::default())
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing::subscriber::set_global_default(Registry::default().with(stderr_layer))?;
    } else {
        return Ok(guard);
    }

    debug!("Initialized tracing");
    if let Some(error) = log_file_error {
        warn!("{error:#}");
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, false, "warn")]
    #[case(None, true, "warn,hssh=debug")]
    #[case(Some("hssh=trace"), false, "hssh=trace")]
    #[case(Some("info"), true, "info")]
    fn directive_works(#[case] log_level: Option<&str>, #[case] debug: bool, #[case] expected: &str) {
        let mut settings = Settings::default();
        settings.log_level = log_level.map(ToOwned::to_owned);
        settings.debug = debug;
        assert_eq!(directive(&settings), expected);
    }

    #[test]
    fn open_log_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::try_from(dir.path().join("hssh.log")).unwrap();
        std::fs::write(&path, "earlier\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        std::io::Write::write_all(&mut file, b"later\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn unopenable_log_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.logfile = Some(
            camino::Utf8PathBuf::try_from(dir.path().join("missing-dir").join("hssh.log")).unwrap(),
        );

        assert!(open_log_file(settings.logfile.as_deref().unwrap()).is_err());
        assert!(init_tracing(&settings).is_ok());
    }
}
