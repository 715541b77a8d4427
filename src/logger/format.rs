//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with aligned tag and level columns
//! - Highlighting of job statuses, identifiers and percentages
//! - Dual output (console + file)
//! - Broken pipe handling for piped commands

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Column widths for aligned output
const TAG_WIDTH: usize = 8;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message to console and file
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_level(level),
        highlight(message)
    );
    print_stdout_safe(&console_line);

    let file_line = format!(
        "{} [{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        tag.to_plain_string(),
        level.as_str(),
        message
    );
    write_to_file(&file_line);
}

/// Format a tag with its subsystem color
fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::Auth => padded.bright_magenta().bold(),
        LogTag::Api => padded.bright_purple().bold(),
        LogTag::Topics => padded.bright_cyan().bold(),
        LogTag::Files => padded.bright_blue().bold(),
        LogTag::Jobs => padded.bright_green().bold(),
        LogTag::Poll => padded.bright_yellow().bold(),
        LogTag::Ui => padded.bright_white().bold(),
        LogTag::Config => padded.bright_cyan().bold(),
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Test => padded.bright_blue().bold(),
        LogTag::Other(_) => padded.white().bold(),
    }
}

/// Format a level with severity color
fn format_level(level: LogLevel) -> ColoredString {
    let padded = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => padded.bright_red().bold(),
        LogLevel::Warning => padded.bright_yellow().bold(),
        LogLevel::Info => padded.white().bold(),
        LogLevel::Debug => padded.dimmed(),
        LogLevel::Verbose => padded.dimmed(),
    }
}

/// Highlight domain terms inside a message: job statuses, UUIDs, percentages
fn highlight(message: &str) -> String {
    message
        .split(' ')
        .map(highlight_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn highlight_word(word: &str) -> String {
    let trimmed = word.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        return word.to_string();
    }

    match trimmed {
        "queued" => return word.replace(trimmed, &trimmed.yellow().bold().to_string()),
        "running" => return word.replace(trimmed, &trimmed.bright_blue().bold().to_string()),
        "done" => return word.replace(trimmed, &trimmed.bright_green().bold().to_string()),
        "failed" => return word.replace(trimmed, &trimmed.bright_red().bold().to_string()),
        "cancelled" => return word.replace(trimmed, &trimmed.bright_yellow().bold().to_string()),
        _ => {}
    }

    if looks_like_uuid(trimmed) {
        let short = format!("{}..{}", &trimmed[..8], &trimmed[trimmed.len() - 4..]);
        return word.replace(trimmed, &short.bright_cyan().to_string());
    }

    if word.ends_with('%') && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return word.bright_white().bold().to_string();
    }

    word.to_string()
}

/// 8-4-4-4-12 hex shape check, enough for display shortening
fn looks_like_uuid(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 5
        && [8, 4, 4, 4, 12]
            .iter()
            .zip(&parts)
            .all(|(len, part)| part.len() == *len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}
