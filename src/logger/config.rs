/// Logger configuration derived from command-line arguments
///
/// Holds the minimum level threshold plus the per-tag debug/verbose flag
/// sets. Initialized once at startup from argv and readable from any thread.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::arguments;

use super::levels::LogLevel;
use super::tags::LogTag;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    /// Tags with --debug-<tag> enabled
    pub debug_tags: HashSet<String>,
    /// Tags with --verbose-<tag> enabled
    pub verbose_tags: HashSet<String>,
    /// When non-empty, only these tags are shown at all
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

impl LoggerConfig {
    pub fn is_debug_enabled_for(&self, tag: &LogTag) -> bool {
        self.min_level >= LogLevel::Debug || self.debug_tags.contains(&tag.to_debug_key())
    }

    pub fn is_verbose_enabled_for(&self, tag: &LogTag) -> bool {
        self.verbose_tags.contains(&tag.to_debug_key())
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_default()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut guard) = LOGGER_CONFIG.write() {
        *guard = config;
    }
}

/// Build a configuration from an argument list
///
/// Recognized flags:
/// - `--quiet` raises the threshold to Warning
/// - `--log-level <level>` sets the threshold explicitly
/// - `--verbose` shows everything
/// - `--debug-<tag>` / `--verbose-<tag>` enable diagnostics per subsystem
/// - `--only-<tag>` restricts output to the named tags
pub fn config_from_args(args: &[String]) -> LoggerConfig {
    let mut config = LoggerConfig::default();

    if args.iter().any(|a| a == "--quiet") {
        config.min_level = LogLevel::Warning;
    }

    let level_value = args
        .iter()
        .position(|a| a == "--log-level")
        .and_then(|i| args.get(i + 1));
    if let Some(level) = level_value.and_then(|v| LogLevel::parse(v)) {
        config.min_level = level;
    }

    if args.iter().any(|a| a == "--verbose") {
        config.min_level = LogLevel::Verbose;
    }

    for arg in args {
        if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_lowercase());
        }
        if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_lowercase());
        }
        if let Some(tag) = arg.strip_prefix("--only-") {
            config.enabled_tags.insert(tag.to_lowercase());
        }
    }

    config
}

/// Initialize the global configuration from the process argv
pub fn init_from_args() {
    set_logger_config(config_from_args(&arguments::get_cmd_args()));
}
