/// Logger configuration and per-tag debug gating
///
/// Configuration is initialized once from the process arguments:
/// - `--debug-<tag>` enables DEBUG output for one tag (e.g. --debug-lookup)
/// - `--debug-all` enables DEBUG output for every tag
/// - `--verbose` lowers the threshold to VERBOSE
/// - `--quiet` raises the threshold to ERROR

use std::collections::HashSet;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use super::tags::LogTag;
use super::LogLevel;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub debug_tags: HashSet<&'static str>,
    pub debug_all: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            debug_all: false,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Build configuration by scanning the process arguments
pub fn init_from_args() {
    let args: Vec<String> = std::env::args().collect();
    let mut config = LoggerConfig::default();

    if args.iter().any(|a| a == "--quiet") {
        config.min_level = LogLevel::Error;
    } else if args.iter().any(|a| a == "--verbose") {
        config.min_level = LogLevel::Verbose;
    }

    config.debug_all = args.iter().any(|a| a == "--debug-all");

    for tag in LogTag::all() {
        let flag = format!("--debug-{}", tag.to_debug_key());
        if args.iter().any(|a| *a == flag) {
            config.debug_tags.insert(tag.to_debug_key());
        }
    }

    set_logger_config(config);
}

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_default()
}

pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut guard) = LOGGER_CONFIG.write() {
        *guard = config;
    }
}

/// Whether DEBUG output is enabled for the given tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.debug_all
        || config.min_level >= LogLevel::Debug
        || config.debug_tags.contains(tag.to_debug_key())
}
