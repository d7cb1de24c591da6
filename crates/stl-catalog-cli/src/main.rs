mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{CategoryCommands, Cli, Commands, PropagateArgs};
use dotenv::dotenv;
use progress::CliReporter;
use stl_catalog_core::propagate::{propagate_categories, update_folder_categories};
use stl_catalog_core::storage::{normalize_category_name, Category, JobStatus, ScanJob};
use stl_catalog_core::{AppConfig, CancelToken, Database, PropagationScope, ScanEngine};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    dotenv().ok();

    let config = match stl_catalog_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {}", "Error loading configuration:".red(), err);
            process::exit(1);
        }
    };

    let _guard = logging::init_logger(&config);

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    if let Err(err) = run(command, &config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Scan => run_scan(config),
        Commands::Job { id, json } => show_job(config, id, json),
        Commands::Jobs { limit } => {
            let db = open_database(config)?;
            for job in db.list_scan_jobs(0, limit)? {
                print_job(&job);
            }
            Ok(())
        }
        Commands::Categories(cmd) => run_categories(config, cmd),
        Commands::Propagate(args) => run_propagate(config, args),
        Commands::Reclassify { file_id } => {
            let db = open_database(config)?;
            let engine = ScanEngine::from_config(config.clone());
            let categories = engine.reclassify_file(&db, file_id)?;
            println!("File {}: {}", file_id, category_names(&categories).green());
            Ok(())
        }
        Commands::SetFileCategories {
            file_id,
            categories,
        } => {
            let db = open_database(config)?;
            let engine = ScanEngine::from_config(config.clone());
            let categories = engine.set_file_categories(&db, file_id, &categories)?;
            println!("File {}: {}", file_id, category_names(&categories).green());
            Ok(())
        }
        Commands::Hash { path } => {
            let digest = stl_catalog_core::hasher::content_hash(Path::new(&path))
                .with_context(|| format!("hashing {}", path))?;
            println!("{}  {}", digest, path);
            Ok(())
        }
        Commands::PrintConfig => {
            let mut shown = config.clone();
            if shown.openai_api_key.is_some() {
                shown.openai_api_key = Some("********".to_string());
            }
            println!("Configuration: {:?}", shown);
            Ok(())
        }
        Commands::TruncateDb => {
            match prompt_confirm(
                "Are you SURE you want to delete all scan, folder and file records?",
                Some(false),
            ) {
                Ok(true) => {
                    open_database(config)?.truncate_all()?;
                    println!("All catalog tables truncated");
                }
                _ => process::exit(0),
            }
            Ok(())
        }
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    Database::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path))
}

fn run_scan(config: &AppConfig) -> Result<()> {
    let db = open_database(config)?;
    let engine = ScanEngine::from_config(config.clone());

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Cancelling crawl...");
        handler_token.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let reporter = CliReporter::new();
    let summary = engine.scan(&db, &cancel, &reporter)?;

    println!();
    info!(
        "Crawl: {}, Folders: {}, Classify: {}",
        format!("{:.2}s", summary.crawl_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.hierarchy_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.classify_duration.as_secs_f64()).green(),
    );
    info!(
        "Job {}: {} found, {} stored, {} uncategorized, {} failed",
        summary.job_id,
        format!("{}", summary.found).cyan(),
        format!("{}", summary.stored).cyan(),
        format!("{}", summary.uncategorized).yellow(),
        format!("{}", summary.failed).red(),
    );
    info!(
        "{} folders created, {} re-parented",
        format!("{}", summary.folders_created).cyan(),
        format!("{}", summary.folders_reconciled).cyan(),
    );
    Ok(())
}

fn show_job(config: &AppConfig, id: i64, json: bool) -> Result<()> {
    let db = open_database(config)?;
    let Some(job) = db.get_scan_job(id)? else {
        bail!("scan job {} not found", id);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job(&job);
    }
    Ok(())
}

fn print_job(job: &ScanJob) {
    let status = match job.status {
        JobStatus::Running => job.status.as_str().yellow(),
        JobStatus::Completed => job.status.as_str().green(),
        JobStatus::Failed => job.status.as_str().red(),
    };
    println!(
        "#{:<5} {:<10} {:>3}%  {}/{} files  {}",
        job.id, status, job.progress, job.processed, job.found, job.updated_at
    );
    if let Some(message) = &job.error {
        println!("       {}", message.red());
    }
}

fn run_categories(config: &AppConfig, cmd: CategoryCommands) -> Result<()> {
    let db = open_database(config)?;
    match cmd {
        CategoryCommands::List { all } => {
            let categories = if all {
                db.list_all_categories()?
            } else {
                db.list_categories()?
            };
            for category in categories {
                print_category(&category);
            }
        }
        CategoryCommands::Add { name } => {
            let name = normalize_category_name(&name)?;
            if db.get_category_by_name(&name)?.is_some() {
                bail!("category '{}' already exists", name);
            }
            let category = db.create_category(&name)?;
            print_category(&category);
        }
        CategoryCommands::Rename { id, name } => {
            let name = normalize_category_name(&name)?;
            if db.rename_category(id, &name)? == 0 {
                bail!("category {} not found", id);
            }
            println!("Renamed category {} to {}", id, name.green());
        }
        CategoryCommands::Delete { id } => {
            if db.soft_delete_category(id)? == 0 {
                bail!("category {} not found or already deleted", id);
            }
            println!("Deleted category {}", id);
        }
        CategoryCommands::Restore { id } => {
            let restored = db.restore_category(id).with_context(|| {
                format!("restoring category {}: a live category may already use its name", id)
            })?;
            if restored == 0 {
                bail!("category {} not found or not deleted", id);
            }
            println!("Restored category {}", id);
        }
    }
    Ok(())
}

fn print_category(category: &Category) {
    if category.deleted {
        println!("{:>5}  {} {}", category.id, category.name.dimmed(), "(deleted)".dimmed());
    } else {
        println!("{:>5}  {}", category.id, category.name);
    }
}

fn run_propagate(config: &AppConfig, args: PropagateArgs) -> Result<()> {
    let db = open_database(config)?;
    let scope = PropagationScope {
        stl: args.stl,
        zip: args.zip,
        rar: args.rar,
        subfolders: args.subfolders,
    };
    if scope.is_empty() && args.children_only {
        warn!("No file types or subfolders selected; nothing to propagate");
    }

    let report = if args.children_only {
        propagate_categories(&db, args.folder_id, &args.categories, scope)?
    } else {
        update_folder_categories(&db, args.folder_id, &args.categories, scope)?
    };
    info!(
        "Folder {}: {} files and {} subfolders updated",
        args.folder_id,
        format!("{}", report.files_updated).cyan(),
        format!("{}", report.subfolders_updated).cyan(),
    );
    Ok(())
}

fn category_names(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
