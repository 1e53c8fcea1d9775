//! Pipeline logging.
//!
//! Stages report progress through the `log_*` helpers, which emit `tracing`
//! events tagged with a [`LogLevel`]. The binary installs a `fmt` subscriber
//! via [`init`]; library users can install their own.

use tracing_subscriber::{fmt, EnvFilter};

/// Level shown next to a pipeline message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Emit a pipeline message at the given level.
pub fn log(level: LogLevel, msg: impl AsRef<str>) {
    let msg = msg.as_ref();
    match level {
        LogLevel::Info => tracing::info!(status = level.as_str(), "{}", msg),
        LogLevel::Success => tracing::info!(status = level.as_str(), "✓ {}", msg),
        LogLevel::Warning => tracing::warn!(status = level.as_str(), "{}", msg),
        LogLevel::Error => tracing::error!(status = level.as_str(), "{}", msg),
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl AsRef<str>) {
    log(LogLevel::Info, msg);
}

pub fn log_success(msg: impl AsRef<str>) {
    log(LogLevel::Success, msg);
}

pub fn log_warning(msg: impl AsRef<str>) {
    log(LogLevel::Warning, msg);
}

pub fn log_error(msg: impl AsRef<str>) {
    log(LogLevel::Error, msg);
}

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Calling this
/// twice is harmless: the second install is ignored.
pub fn init(default_filter: &str) {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
