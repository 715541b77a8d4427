use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use ankigen::api::types::JobParams;
use ankigen::api::{ApiClient, FilesClient, JobsClient, TopicsClient};
use ankigen::config::Config;
use ankigen::errors::{ApiError, JobActionError};
use ankigen::jobs::JobTracker;
use ankigen::logger::{self, LogTag};
use ankigen::paths;
use ankigen::session::{AuthSession, TokenSource};
use ankigen::ui;

/// Refresh rate of the watch-mode display between polls
const WATCH_REFRESH_MS: u64 = 250;

#[derive(Parser)]
#[command(name = "ankigen", version, about = "Client for the Telegram Anki deck generation service")]
struct Cli {
    /// Override api.base_url from the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authentication: exchange init data, inspect or drop the stored token
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Manage topics
    #[command(subcommand)]
    Topics(TopicsCommand),
    /// Manage files inside a topic
    #[command(subcommand)]
    Files(FilesCommand),
    /// Generation jobs: start, poll, cancel, retry, send, download
    #[command(subcommand)]
    Jobs(JobsCommand),
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Exchange Telegram init data for a bearer token
    Login {
        /// Init data string; read from the configured env var when omitted
        #[arg(long)]
        init_data: Option<String>,
    },
    /// Show whether a token is held and where it came from
    Status,
    /// Drop the in-memory and stored token
    Logout,
}

#[derive(Subcommand)]
enum TopicsCommand {
    List,
    Create { title: String },
    Rename { topic_id: Uuid, title: String },
    Delete { topic_id: Uuid },
}

#[derive(Subcommand)]
enum FilesCommand {
    List { topic_id: Uuid },
    /// Upload one or more files; each file is its own HTTP call, so a
    /// mid-batch failure leaves earlier files uploaded
    Upload {
        topic_id: Uuid,
        paths: Vec<PathBuf>,
    },
    Delete { topic_id: Uuid, file_id: Uuid },
}

#[derive(Subcommand)]
enum JobsCommand {
    /// Start a generation job
    Start {
        topic_id: Uuid,
        #[arg(long, default_value = "merged")]
        mode: String,
        /// Requested question count; clamped into [5, 200]
        #[arg(long, default_value_t = 20)]
        questions: u32,
        #[arg(long, default_value = "medium")]
        difficulty: String,
        /// Allow repeated questions across runs
        #[arg(long)]
        repeats: bool,
        /// Generate questions without answers
        #[arg(long)]
        no_answers: bool,
        /// Keep polling until the job finishes
        #[arg(long)]
        watch: bool,
    },
    /// Show the latest job for a topic
    Status { topic_id: Uuid },
    /// Poll the latest job until it reaches a terminal state
    Watch { topic_id: Uuid },
    Cancel { topic_id: Uuid },
    Retry { topic_id: Uuid },
    /// Push the finished deck to the originating Telegram chat
    Send { topic_id: Uuid },
    /// Download a result artifact
    Download {
        topic_id: Uuid,
        #[arg(default_value = "apkg")]
        format: String,
        /// Output file; defaults to deck.<format> in the working directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

struct AppContext {
    config: Config,
    session: Arc<AuthSession>,
    client: Arc<ApiClient>,
}

#[tokio::main]
async fn main() {
    // Directories must exist before the logger opens its file sink
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create data directories: {}", e);
        process::exit(1);
    }

    logger::init();

    // Logger-only flags are consumed by logger::init from the raw argv;
    // strip them so clap sees just the structured CLI
    let cli = Cli::parse_from(strip_logger_flags(ankigen::arguments::get_cmd_args()));

    if let Err(message) = run(cli).await {
        logger::error(LogTag::System, &message);
        logger::flush();
        process::exit(1);
    }

    logger::flush();
}

/// Remove flags owned by the logger (--debug-<tag>, --verbose[-<tag>],
/// --only-<tag>, --quiet, --log-level <level>) before clap parsing
fn strip_logger_flags(args: Vec<String>) -> Vec<String> {
    let mut filtered = Vec::with_capacity(args.len());
    let mut skip_value = false;

    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--log-level" {
            skip_value = true;
            continue;
        }
        if arg == "--quiet"
            || arg == "--verbose"
            || arg.starts_with("--debug-")
            || arg.starts_with("--verbose-")
            || arg.starts_with("--only-")
        {
            continue;
        }
        filtered.push(arg);
    }

    filtered
}

async fn run(cli: Cli) -> Result<(), String> {
    let context = build_context(cli.api_url).map_err(|e| e.to_string())?;

    match cli.command {
        Command::Auth(command) => run_auth(&context, command).await,
        Command::Topics(command) => {
            authenticate(&context).await?;
            run_topics(&context, command).await
        }
        Command::Files(command) => {
            authenticate(&context).await?;
            run_files(&context, command).await
        }
        Command::Jobs(command) => {
            authenticate(&context).await?;
            run_jobs(&context, command).await
        }
    }
}

fn build_context(api_url: Option<String>) -> Result<AppContext, ApiError> {
    let mut config = Config::load(&paths::get_config_file())?;
    if let Some(url) = api_url {
        config.api.base_url = url;
    }

    let session = Arc::new(AuthSession::from_config(&config.auth));
    let client = Arc::new(ApiClient::new(&config.api, session.clone())?);

    Ok(AppContext {
        config,
        session,
        client,
    })
}

/// Resolve a token before resource calls. A missing auth context is not
/// fatal: requests proceed unauthenticated and the server's rejection is
/// surfaced like any other request failure.
async fn authenticate(context: &AppContext) -> Result<(), String> {
    match context.session.resolve(&context.client).await {
        Ok(TokenSource::Exchange) => {
            logger::debug(LogTag::Auth, "Authenticated via init data exchange");
            Ok(())
        }
        Ok(TokenSource::Stored) => Ok(()),
        Err(ApiError::AuthContextMissing) => {
            logger::warning(
                LogTag::Auth,
                "No init data and no stored token; proceeding unauthenticated",
            );
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

async fn run_auth(context: &AppContext, command: AuthCommand) -> Result<(), String> {
    match command {
        AuthCommand::Login { init_data } => {
            let init_data = match init_data {
                Some(value) => value,
                None => std::env::var(&context.config.auth.init_data_env)
                    .map_err(|_| ApiError::AuthContextMissing.to_string())?,
            };
            context
                .session
                .exchange(&context.client, &init_data)
                .await
                .map_err(|e| e.to_string())?;
            println!("Authenticated.");
            Ok(())
        }
        AuthCommand::Status => {
            match context.session.resolve(&context.client).await {
                Ok(TokenSource::Exchange) => println!("Token obtained via init data exchange."),
                Ok(TokenSource::Stored) => println!("Using stored token fallback."),
                Err(e) => println!("Not authenticated: {}", e),
            }
            Ok(())
        }
        AuthCommand::Logout => {
            context.session.logout();
            println!("Stored token removed.");
            Ok(())
        }
    }
}

async fn run_topics(context: &AppContext, command: TopicsCommand) -> Result<(), String> {
    let topics = TopicsClient::new(context.client.clone());

    match command {
        TopicsCommand::List => {
            let listed = topics.list().await.map_err(|e| e.to_string())?;
            if listed.is_empty() {
                println!("No topics yet.");
            } else {
                println!("{}", ui::topics_table(&listed));
            }
        }
        TopicsCommand::Create { title } => {
            let topic = topics.create(&title).await.map_err(|e| e.to_string())?;
            logger::info(
                LogTag::Topics,
                &format!("Created topic {} ({})", topic.title, topic.id),
            );
            println!("Created topic {}", topic.id);
        }
        TopicsCommand::Rename { topic_id, title } => {
            let topic = topics
                .rename(topic_id, &title)
                .await
                .map_err(|e| e.to_string())?;
            println!("Renamed topic {} to \"{}\"", topic.id, topic.title);
        }
        TopicsCommand::Delete { topic_id } => {
            topics.delete(topic_id).await.map_err(|e| e.to_string())?;
            logger::info(LogTag::Topics, &format!("Deleted topic {}", topic_id));
            println!("Deleted topic {} (files and jobs removed with it)", topic_id);
        }
    }

    Ok(())
}

async fn run_files(context: &AppContext, command: FilesCommand) -> Result<(), String> {
    let files = FilesClient::new(context.client.clone());

    match command {
        FilesCommand::List { topic_id } => {
            let listed = files.list(topic_id).await.map_err(|e| e.to_string())?;
            if listed.is_empty() {
                println!("No files in this topic.");
            } else {
                println!("{}", ui::files_table(&listed));
            }
        }
        FilesCommand::Upload { topic_id, paths } => {
            if paths.is_empty() {
                return Err("no files given".to_string());
            }

            // One call per file; on failure, re-list to see what actually landed
            let mut uploaded = 0usize;
            for path in &paths {
                match files.upload(topic_id, path).await {
                    Ok(record) => {
                        uploaded += 1;
                        println!("Uploaded {} ({})", record.original_filename, record.id);
                    }
                    Err(e) => {
                        logger::error(
                            LogTag::Files,
                            &format!("Upload of {} failed: {}", path.display(), e),
                        );
                        println!(
                            "Upload stopped: {} of {} files made it; run `files list` to see server state",
                            uploaded,
                            paths.len()
                        );
                        return Err(e.to_string());
                    }
                }
            }
            println!("Uploaded {} file(s).", uploaded);
        }
        FilesCommand::Delete { topic_id, file_id } => {
            files
                .delete(topic_id, file_id)
                .await
                .map_err(|e| e.to_string())?;
            println!("Deleted file {}", file_id);
        }
    }

    Ok(())
}

async fn run_jobs(context: &AppContext, command: JobsCommand) -> Result<(), String> {
    let jobs = JobsClient::new(context.client.clone());
    let localized = context.config.ui.stage_labels_localized;
    let poll_interval = Duration::from_millis(context.config.jobs.poll_interval_ms);

    match command {
        JobsCommand::Start {
            topic_id,
            mode,
            questions,
            difficulty,
            repeats,
            no_answers,
            watch,
        } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            let params =
                JobParams::new(&mode, questions, &difficulty).with_flags(!repeats, !no_answers);

            let job = tracker.start(params).await.map_err(banner)?;
            println!("{}", ui::job_panel(Some(&job), localized));

            if watch {
                watch_tracker(&tracker, localized).await;
            } else {
                tracker.shutdown();
            }
        }
        JobsCommand::Status { topic_id } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            println!("{}", ui::job_panel(tracker.current_job().as_ref(), localized));
            tracker.shutdown();
        }
        JobsCommand::Watch { topic_id } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            watch_tracker(&tracker, localized).await;
        }
        JobsCommand::Cancel { topic_id } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            let job = tracker.cancel().await.map_err(banner)?;
            println!("{}", ui::job_panel(Some(&job), localized));
            tracker.shutdown();
        }
        JobsCommand::Retry { topic_id } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            let job = tracker.retry().await.map_err(banner)?;
            println!("{}", ui::job_panel(Some(&job), localized));
            watch_tracker(&tracker, localized).await;
        }
        JobsCommand::Send { topic_id } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            tracker.send().await.map_err(banner)?;
            println!("Deck sent to your Telegram chat.");
            tracker.shutdown();
        }
        JobsCommand::Download {
            topic_id,
            format,
            output,
        } => {
            let tracker = JobTracker::new(jobs, topic_id, poll_interval);
            tracker.sync().await.map_err(banner)?;
            let bytes = tracker.download(&format).await.map_err(banner)?;
            tracker.shutdown();

            let target = output.unwrap_or_else(|| PathBuf::from(format!("deck.{}", format)));
            tokio::fs::write(&target, &bytes)
                .await
                .map_err(|e| format!("failed to write {}: {}", target.display(), e))?;
            println!(
                "Saved {} ({})",
                target.display(),
                ui::format_size(bytes.len() as u64)
            );
        }
    }

    Ok(())
}

/// Render a job-action failure as a banner and pass the message up
fn banner(error: JobActionError) -> String {
    println!("{}", ui::error_banner(&error));
    error.to_string()
}

/// Drive the tracker until the job reaches a terminal state or the user
/// interrupts; navigating away always cancels the pending timer.
async fn watch_tracker(tracker: &JobTracker, localized: bool) {
    if !tracker.phase().is_active() {
        println!("{}", ui::job_panel(tracker.current_job().as_ref(), localized));
        tracker.shutdown();
        return;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        let _ = ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        });
    }

    let bar = ui::watch_bar();
    loop {
        ui::update_watch_bar(&bar, tracker.current_job().as_ref(), localized);

        if let Some(error) = tracker.take_poll_error() {
            bar.println(ui::error_banner(&error));
        }

        if !tracker.phase().is_active() {
            break;
        }
        if interrupted.load(Ordering::SeqCst) {
            logger::info(LogTag::Ui, "Watch interrupted; polling stopped");
            break;
        }

        tokio::time::sleep(Duration::from_millis(WATCH_REFRESH_MS)).await;
    }

    tracker.shutdown();
    bar.finish_and_clear();
    println!("{}", ui::job_panel(tracker.current_job().as_ref(), localized));
}
