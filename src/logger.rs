use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::PkError;

/// Setup logging for the library
///
/// Log messages at `level` or above (`error`, `warn`, `info`, `debug` or `trace`, or any
/// [EnvFilter] directive) are written to stdout. Fails if a global subscriber has already
/// been installed.
pub fn setup_log(level: &str) -> Result<(), PkError> {
    let log_level = level.to_lowercase();
    let env_filter =
        EnvFilter::try_new(&log_level).map_err(|err| PkError::Logger(err.to_string()))?;

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_timer(CompactTimestamp);

    Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|err| PkError::Logger(err.to_string()))?;
    tracing::debug!("Logging is configured with level: {}", log_level);
    Ok(())
}

#[derive(Clone)]
struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}
