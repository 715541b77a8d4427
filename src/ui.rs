//! Terminal presentation layer
//!
//! Renders topic lists, file lists and job status from the tracker's
//! snapshot, and formats errors as dismissible banner lines. All rendering
//! is string-building first so it stays testable; printing is a thin shell
//! on top.

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::types::{FileRecord, Job, Topic};
use crate::errors::JobActionError;
use crate::jobs::JobPhase;

/// Character width of the textual progress bar in the job panel
const BAR_WIDTH: usize = 30;

// =============================================================================
// STAGE LABELS
// =============================================================================

/// Human label for a worker stage, localized for the Mini App audience
///
/// Unknown stages fall through verbatim so a new worker stage still renders.
pub fn stage_label(stage: &str, localized: bool) -> String {
    if !localized {
        return stage.to_string();
    }

    match stage {
        "queued" => "в очереди".to_string(),
        "extracting" => "извлекаем текст".to_string(),
        "chunking" => "разбиваем на фрагменты".to_string(),
        "generating" => "генерируем вопросы".to_string(),
        "deduping" => "убираем дубликаты".to_string(),
        "exporting" => "собираем колоду".to_string(),
        "done" => "готово".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// TABLES
// =============================================================================

pub fn topics_table(topics: &[Topic]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Files", "Updated"]);

    for topic in topics {
        table.add_row(vec![
            Cell::new(topic.id),
            Cell::new(&topic.title),
            Cell::new(topic.file_count),
            Cell::new(topic.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    table
}

pub fn files_table(files: &[FileRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Filename", "Type", "Size", "Uploaded"]);

    for file in files {
        table.add_row(vec![
            Cell::new(file.id),
            Cell::new(&file.original_filename),
            Cell::new(&file.mime_type),
            Cell::new(format_size(file.size_bytes)),
            Cell::new(file.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    table
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// =============================================================================
// JOB PANEL
// =============================================================================

/// Colored one-word badge for a phase
pub fn phase_badge(phase: JobPhase) -> String {
    let text = phase.as_str().to_uppercase();
    match phase {
        JobPhase::Idle => text.dimmed().to_string(),
        JobPhase::Queued => text.yellow().bold().to_string(),
        JobPhase::Running => text.bright_blue().bold().to_string(),
        JobPhase::Done => text.bright_green().bold().to_string(),
        JobPhase::Failed => text.bright_red().bold().to_string(),
        JobPhase::Cancelled => text.bright_yellow().bold().to_string(),
    }
}

/// Textual progress bar, filled proportionally to progress (0..=100)
pub fn progress_bar(progress: u8, width: usize) -> String {
    let clamped = progress.min(100) as usize;
    let filled = width * clamped / 100;
    format!(
        "[{}{}] {:>3}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        clamped
    )
}

/// Multi-line status panel for the current job snapshot
pub fn job_panel(job: Option<&Job>, localized: bool) -> String {
    let Some(job) = job else {
        return format!("{}  no generation job yet", phase_badge(JobPhase::Idle));
    };

    let phase = JobPhase::from(job.status);
    let mut lines = vec![format!(
        "{}  job {}  mode={}",
        phase_badge(phase),
        job.id,
        job.mode
    )];

    match phase {
        JobPhase::Queued | JobPhase::Running => {
            lines.push(format!(
                "  {}  {}",
                progress_bar(job.progress, BAR_WIDTH),
                stage_label(&job.stage, localized)
            ));
        }
        JobPhase::Done => {
            lines.push(format!("  {}", progress_bar(100, BAR_WIDTH)));
            if let Some(paths) = &job.result_paths {
                let mut formats: Vec<&str> = paths.keys().map(|k| k.as_str()).collect();
                formats.sort_unstable();
                lines.push(format!("  artifacts: {}", formats.join(", ")));
            }
        }
        JobPhase::Failed => {
            let reason = job.error_message.as_deref().unwrap_or("unknown error");
            lines.push(format!("  {}", reason.bright_red()));
        }
        JobPhase::Cancelled => {
            lines.push("  cancelled by user".dimmed().to_string());
        }
        JobPhase::Idle => {}
    }

    lines.join("\n")
}

/// Dismissible banner line for a failed action
///
/// Actions stay available after a failure; the banner only informs.
pub fn error_banner(error: &JobActionError) -> String {
    format!(
        "{} {}",
        format!("[{} failed]", error.action()).bright_red().bold(),
        error.detail()
    )
}

/// Progress bar used by watch mode, updated from each adopted snapshot
pub fn watch_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Feed one snapshot into the watch bar
pub fn update_watch_bar(bar: &ProgressBar, job: Option<&Job>, localized: bool) {
    match job {
        Some(job) => {
            bar.set_position(job.progress.min(100) as u64);
            bar.set_message(format!(
                "{} — {}",
                JobPhase::from(job.status),
                stage_label(&job.stage, localized)
            ));
        }
        None => bar.set_message("no job".to_string()),
    }
}
