/// Core logging implementation with automatic filtering
///
/// Central decision point for whether a message is displayed, based on the
/// level threshold and per-tag debug/verbose flags.

use super::config::{get_logger_config, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Filtering rules against a given configuration:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<tag> for that tag
/// 4. Verbose level requires --verbose OR --verbose-<tag> for that tag
/// 5. If enabled_tags is non-empty, the tag must be in the set
pub fn should_log_with(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    if level == LogLevel::Debug && config.min_level < LogLevel::Debug {
        return config.is_debug_enabled_for(tag);
    }

    if level == LogLevel::Verbose && config.min_level < LogLevel::Verbose {
        return config.is_verbose_enabled_for(tag);
    }

    if level > config.min_level {
        return false;
    }

    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

/// Check if a log message should be displayed under the active configuration
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    should_log_with(&get_logger_config(), tag, level)
}

/// Internal logging entry point
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}
