mod commands;
mod logging;

use std::fs;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Context};
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use drop_catcher_core::{AppConfig, DropCatcher, MoveRecord, MoveStatus};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match drop_catcher_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command.unwrap_or(Commands::Watch) {
        Commands::Watch => run_watch(config),
        Commands::Process { file } => run_process(config, &file),
        Commands::History { limit } => run_history(config, limit),
        Commands::Show { id } => run_show(config, &id),
        Commands::Stats => run_stats(config),
        Commands::PrintConfig => print_config(&config),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_watch(config: AppConfig) -> anyhow::Result<()> {
    let catcher = DropCatcher::new(config);
    let pipeline = catcher.pipeline()?;
    let (watcher, handle) = catcher.subscribe()?;

    let interrupt = catcher.interrupt();
    let presses = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if presses.fetch_add(1, Ordering::SeqCst) == 0 {
            warn!("Stopping after the file in flight. Press Ctrl-C again to abort it");
            handle.close();
        } else {
            interrupt.raise();
        }
    })
    .context("installing the Ctrl-C handler")?;

    info!(
        "Waiting for files in {} (Ctrl-C to stop)",
        format!("{}", catcher.config().input_dir.display()).cyan()
    );
    watcher.run(&pipeline);
    info!("Watcher stopped");
    Ok(())
}

fn run_process(config: AppConfig, file: &Path) -> anyhow::Result<()> {
    let file = fs::canonicalize(file).with_context(|| format!("cannot read {}", file.display()))?;
    let catcher = DropCatcher::new(config);
    let pipeline = catcher.pipeline()?;

    match pipeline.handle(&file)? {
        Some(record) => print_record(&record),
        None => warn!("No record was created for {}", file.display()),
    }
    Ok(())
}

fn run_history(config: AppConfig, limit: i64) -> anyhow::Result<()> {
    let db = DropCatcher::new(config).open_database()?;
    let records = db.list_move_records(limit)?;
    if records.is_empty() {
        println!("No files handled yet");
        return Ok(());
    }

    for record in &records {
        let outcome = match (&record.target_file_name, &record.error_code) {
            (Some(target), _) => format!("-> {}", target),
            (None, Some(code)) => code.to_string(),
            (None, None) => record.error_message.clone().unwrap_or_default(),
        };
        println!(
            "{}  {}  {:<28}  {}  {}",
            record.id.dimmed(),
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            colored_status(record.status),
            record.source_file_name,
            outcome
        );
    }
    Ok(())
}

fn run_show(config: AppConfig, id: &str) -> anyhow::Result<()> {
    let db = DropCatcher::new(config).open_database()?;
    let record = db
        .get_move_record(id)?
        .ok_or_else(|| anyhow!("no move record with id {}", id))?;
    print_record(&record);
    Ok(())
}

fn run_stats(config: AppConfig) -> anyhow::Result<()> {
    let db = DropCatcher::new(config).open_database()?;
    let counts = db.count_by_status()?;
    let total: i64 = counts.iter().map(|(_, count)| count).sum();

    for (status, count) in &counts {
        println!("{:<28} {}", colored_status(*status), count);
    }
    println!("{:<28} {}", "TOTAL".bold(), total);
    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering configuration")?;
    println!("{}", rendered);
    Ok(())
}

fn print_record(record: &MoveRecord) {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("{:<18} {}", "id", record.id);
    println!("{:<18} {}", "status", colored_status(record.status));
    println!("{:<18} {}", "created_at", record.created_at.to_rfc3339());
    println!(
        "{:<18} {}",
        "source",
        Path::new(&record.source_directory)
            .join(&record.source_file_name)
            .display()
    );
    println!("{:<18} {} bytes", "size", record.file_size);
    println!("{:<18} {}", "content_hash", optional(&record.content_hash));
    if let (Some(dir), Some(name)) = (&record.target_directory, &record.target_file_name) {
        println!("{:<18} {}", "target", Path::new(dir).join(name).display());
    }
    if let Some(completed) = record.move_completed_at {
        println!("{:<18} {}", "move_completed_at", completed.to_rfc3339());
    }
    if let Some(code) = record.error_code {
        println!("{:<18} {}", "error_code", code.to_string().red());
    }
    if record.error_message.is_some() {
        println!("{:<18} {}", "error_message", optional(&record.error_message));
    }
}

fn colored_status(status: MoveStatus) -> ColoredString {
    match status {
        MoveStatus::Pending => status.as_str().cyan(),
        MoveStatus::Succeeded => status.as_str().green(),
        MoveStatus::MoveFailed => status.as_str().yellow(),
        MoveStatus::MoveFailedUnexpectedError => status.as_str().red().bold(),
    }
}
