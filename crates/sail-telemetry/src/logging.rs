use std::io::Write;
use std::sync::Mutex;

use log::debug;

use crate::error::{TelemetryError, TelemetryResult};

enum LoggingStatus {
    Uninitialized,
    Initialized,
    Failed,
}

static LOGGING_STATUS: Mutex<LoggingStatus> = Mutex::new(LoggingStatus::Uninitialized);

pub struct LoggingOptions {
    /// The filter used when `RUST_LOG` is not set.
    pub default_filter: &'static str,
    /// Whether log records go to the test harness capture instead of stderr.
    pub is_test: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info",
            is_test: false,
        }
    }
}

/// Installs the global logger for the process.
///
/// The logger can only be installed once. Later calls fail without touching
/// the logger that is already in place.
pub fn init_logging(options: LoggingOptions) -> TelemetryResult<()> {
    if options.default_filter.is_empty() {
        return Err(TelemetryError::invalid("default log filter"));
    }
    let mut status = LOGGING_STATUS
        .lock()
        .map_err(|e| TelemetryError::internal(e.to_string()))?;

    match *status {
        LoggingStatus::Uninitialized => {
            let logger = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(options.default_filter),
            )
            .format(move |buf, record| {
                let level = record.level();
                let target = record.target();
                let style = buf.default_level_style(level);
                let timestamp = buf.timestamp();
                let args = record.args();
                writeln!(buf, "[{timestamp} {style}{level}{style:#} {target}] {args}")
            })
            .is_test(options.is_test)
            .build();
            let max_level = logger.filter();
            match log::set_boxed_logger(Box::new(logger)) {
                Ok(()) => {
                    log::set_max_level(max_level);
                    *status = LoggingStatus::Initialized;
                    debug!("logging initialized");
                    Ok(())
                }
                Err(e) => {
                    *status = LoggingStatus::Failed;
                    Err(TelemetryError::internal(e.to_string()))
                }
            }
        }
        LoggingStatus::Initialized => Err(TelemetryError::internal("logging already initialized")),
        LoggingStatus::Failed => Err(TelemetryError::internal(
            "logging failed to initialize previously",
        )),
    }
}
