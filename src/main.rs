//! Subex - Batch Subtitle Extraction
//!
//! Command-line front end: parses arguments, renders progress and prints
//! the per-file outcome of a batch.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subex::cli::{Args, Commands};
use subex::config::{Config, DEFAULT_CONFIG_FILE};
use subex::language::{LanguageCode, LANGUAGE_PRESETS};
use subex::planner::{discover_subdirectories, BatchPlan};
use subex::progress::BatchEvent;
use subex::runner::BatchSummary;
use subex::subtitle::SubtitleFormat;
use subex::workflow::{BatchHandle, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Extract { selection, report } => {
            let request = selection.to_request(&config)?;
            let workflow = Workflow::new(config).await?;

            info!(
                "Extracting '{}' subtitles as {} from {}",
                request.language,
                request.format,
                request.root.display()
            );
            let handle = workflow.start(request);
            let summary = follow_batch(handle).await?;

            print_summary(&summary);
            if let Some(report_path) = report {
                summary.write_report(&report_path)?;
                info!("Report written to {}", report_path.display());
            }
        }
        Commands::Scan { selection } => {
            let request = selection.to_request(&config)?;
            let workflow = Workflow::new(config).await?;
            let plan = workflow.plan(&request).await?;
            print_plan(&plan, &request.root);
        }
        Commands::Subdirs { root } => {
            let entries = discover_subdirectories(&root, &config.extraction.video_extensions)?;
            let root = std::fs::canonicalize(&root)?;

            if entries.is_empty() {
                println!("No subdirectories with video files found.");
            } else {
                println!("{}", root.display());
                for entry in entries {
                    let name = entry
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| relative(&entry.path, &root));
                    println!(
                        "{}{}/ ({} video file(s))",
                        "  ".repeat(entry.depth),
                        name,
                        entry.video_count
                    );
                }
            }
        }
        Commands::Probe { input } => {
            let workflow = Workflow::new(config).await?;
            let streams = workflow.probe_file(&input).await?;

            if streams.is_empty() {
                println!("No subtitle streams found in {}", input.display());
            } else {
                println!(
                    "{:<8} {:<10} {:<12} {:<15} {:<30}",
                    "Index", "Language", "Name", "Codec", "Title"
                );
                println!("{}", "-".repeat(78));
                for stream in streams {
                    let name = LanguageCode::try_from(stream.language.clone())
                        .map(|code| code.display_name().to_string())
                        .unwrap_or_default();
                    println!(
                        "{:<8} {:<10} {:<12} {:<15} {:<30}",
                        stream.index,
                        stream.language,
                        name,
                        stream.codec_name,
                        stream.title.unwrap_or_default()
                    );
                }
            }
        }
        Commands::Check => {
            let workflow = Workflow::new(config).await?;
            let (ffprobe, ffmpeg) = workflow.tool_versions().await?;
            println!("{}", ffprobe);
            println!("{}", ffmpeg);
        }
        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Languages => {
            println!("{:<6} {:<20}", "Code", "Name");
            println!("{}", "-".repeat(26));
            for (code, name) in LANGUAGE_PRESETS {
                println!("{:<6} {:<20}", code, name);
            }
            println!(
                "\nAny other three-letter code works with --language, other tags with --custom-language."
            );

            println!("\n{:<8} {:<6} {:<30}", "Format", "Ext", "Description");
            println!("{}", "-".repeat(44));
            for format in SubtitleFormat::ALL {
                println!(
                    "{:<8} {:<6} {:<30}",
                    format.to_string(),
                    format.extension(),
                    format.description()
                );
            }
        }
    }

    Ok(())
}

/// Render batch events until the worker is done.
///
/// The first Ctrl-C stops after the current file, a second one aborts it.
async fn follow_batch(mut handle: BatchHandle) -> Result<BatchSummary> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    loop {
        tokio::select! {
            event = handle.events.recv() => {
                let Some(event) = event else { break };
                match event {
                    BatchEvent::Scanning { current, total, path } => {
                        pb.set_length(total as u64);
                        pb.set_position(current as u64);
                        pb.set_message(format!("Scanning {}", file_name(&path)));
                    }
                    BatchEvent::Planned { jobs, skipped } => {
                        pb.println(format!(
                            "Found {} subtitle stream(s) to extract, {} file(s) skipped",
                            jobs, skipped
                        ));
                        pb.set_length(jobs as u64);
                        pb.set_position(0);
                    }
                    BatchEvent::JobStarted { current, total, path } => {
                        pb.set_message(format!("[{}/{}] {}", current, total, file_name(&path)));
                    }
                    BatchEvent::JobFinished(snapshot) => {
                        pb.set_position(snapshot.current as u64);
                        let remaining = snapshot
                            .remaining
                            .map(|d| format_duration(d.as_secs()))
                            .unwrap_or_else(|| "--:--".to_string());
                        pb.set_message(format!(
                            "Elapsed: {} | Remaining: {}",
                            format_duration(snapshot.elapsed.as_secs()),
                            remaining
                        ));
                    }
                    BatchEvent::Finished(_) => pb.finish_and_clear(),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if handle.cancel.is_cancelled() {
                    warn!("Second interrupt, stopping the current file");
                    handle.abort();
                    break;
                }
                warn!(
                    "Cancellation requested. Waiting for current file to complete (Ctrl-C again to stop now)..."
                );
                handle.cancel.cancel();
            }
        }
    }

    pb.finish_and_clear();
    Ok(handle.wait().await?)
}

fn print_summary(summary: &BatchSummary) {
    for outcome in summary.outcomes() {
        println!("{}", outcome);
    }

    println!();
    if summary.cancelled {
        println!("Batch cancelled; results of finished files are kept.");
    }
    println!(
        "Extracted: {}  Skipped: {}  Failed: {}  Total: {}",
        summary.succeeded, summary.skipped, summary.failed, summary.total_files
    );
    println!("Total time: {}", format_duration(summary.elapsed.as_secs()));
}

fn print_plan(plan: &BatchPlan, root: &Path) {
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    if plan.total_files == 0 {
        println!("No video files found in the selected directories.");
        return;
    }

    for job in &plan.jobs {
        println!(
            "EXTRACT {} stream {} ({}) -> {}",
            relative(&job.video.path, &root),
            job.stream.index,
            job.stream.codec_name,
            job.output_path.display()
        );
    }
    for skipped in &plan.skipped {
        println!("SKIP    {} ({})", relative(&skipped.video.path, &root), skipped.reason);
    }
    println!(
        "\n{} job(s), {} skipped, {} video file(s)",
        plan.jobs.len(),
        plan.skipped.len(),
        plan.total_files
    );
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let subex_dir = std::env::current_dir()?.join(".subex");
    let log_dir = subex_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subex.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subex.log").display()
    );

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn relative(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Format duration in seconds as H:MM:SS
fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}
