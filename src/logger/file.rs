//! File logging with daily log files
//!
//! Appends plain-text log lines to `logs/ankigen_YYYY-MM-DD.log` under the
//! platform data directory. Failures here never interrupt the application;
//! console logging keeps working without the file sink.

use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::paths;

struct FileSink {
    file: File,
    day: String,
}

static FILE_SINK: Lazy<Mutex<Option<FileSink>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path(day: &str) -> PathBuf {
    paths::get_logs_directory().join(format!("ankigen_{}.log", day))
}

fn open_sink(day: &str) -> Option<FileSink> {
    let dir = paths::get_logs_directory();
    if fs::create_dir_all(&dir).is_err() {
        return None;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(day))
        .ok()
        .map(|file| FileSink {
            file,
            day: day.to_string(),
        })
}

/// Prepare the file sink; called once at startup
pub fn init_file_logging() {
    let day = Local::now().format("%Y-%m-%d").to_string();
    if let Ok(mut guard) = FILE_SINK.lock() {
        *guard = open_sink(&day);
    }
}

/// Append one line to the current day's log file, rotating on date change
pub fn write_to_file(line: &str) {
    let day = Local::now().format("%Y-%m-%d").to_string();

    if let Ok(mut guard) = FILE_SINK.lock() {
        let needs_rotate = match guard.as_ref() {
            Some(sink) => sink.day != day,
            None => true,
        };
        if needs_rotate {
            *guard = open_sink(&day);
        }

        if let Some(sink) = guard.as_mut() {
            let _ = writeln!(sink.file, "{}", line);
        }
    }
}

/// Flush pending writes; called during shutdown
pub fn flush_file_logging() {
    if let Ok(mut guard) = FILE_SINK.lock() {
        if let Some(sink) = guard.as_mut() {
            let _ = sink.file.flush();
        }
    }
}
