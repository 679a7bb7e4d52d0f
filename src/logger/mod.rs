//! Structured logging for the agent execution framework
//!
//! Console logger with tag + level + action-code prefixes:
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-area debug control via --debug-<tag> process flags
//! - Colored, column-aligned output
//!
//! Call `logger::init()` once at startup, then use the level
//! functions:
//!
//! ```ignore
//! logger::info(LogTag::Coordinator, "EXECUTE", "strategy=swap id=...");
//! logger::debug(LogTag::Lookup, "CACHE_HIT", "mint=...");
//! ```

mod config;
mod output;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use tags::LogTag;

/// Log level ordering: lower value = higher severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
    Verbose = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Initialize the logger from process arguments. Call once at startup.
pub fn init() {
    config::init_from_args();
}

/// Filtering rules:
/// 1. Errors always log
/// 2. Debug requires --debug-<tag> (or --debug-all / --verbose)
/// 3. Everything else is gated by the minimum level threshold
fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let cfg = config::get_logger_config();

    if level == LogLevel::Debug {
        return config::is_debug_enabled_for_tag(tag);
    }

    level <= cfg.min_level
}

fn log_internal(tag: LogTag, level: LogLevel, action: &str, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    output::write_line(tag, action, message);
}

/// Critical failures, always shown
pub fn error(tag: LogTag, action: &str, message: &str) {
    log_internal(tag, LogLevel::Error, action, message);
}

/// Issues that need attention but are not fatal
pub fn warning(tag: LogTag, action: &str, message: &str) {
    log_internal(tag, LogLevel::Warning, action, message);
}

/// Normal operational events
pub fn info(tag: LogTag, action: &str, message: &str) {
    log_internal(tag, LogLevel::Info, action, message);
}

/// Detailed diagnostics, gated per tag
pub fn debug(tag: LogTag, action: &str, message: &str) {
    log_internal(tag, LogLevel::Debug, action, message);
}

/// Very detailed tracing, gated by --verbose
pub fn verbose(tag: LogTag, action: &str, message: &str) {
    log_internal(tag, LogLevel::Verbose, action, message);
}
