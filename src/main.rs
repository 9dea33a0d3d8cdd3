use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use fieldsync::cache::CacheMirror;
use fieldsync::cli::args::{CacheCommands, Cli, Commands};
use fieldsync::cli::commands;
use fieldsync::config::{Config, Paths};
use fieldsync::error::FieldsyncError;
use fieldsync::storage::{KeyValueStore, SqliteStore};
use fieldsync::sync::MutationQueue;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), FieldsyncError> {
    let cli = Cli::parse();
    let format = cli.output;

    let paths = match cli.data_dir {
        Some(root) => Paths::with_root(root),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let config = Config::load_from_path(&paths.config_file)?;

    let output = match cli.command {
        Commands::Completions { shell } => commands::completions(shell)?,
        command => {
            let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_at(&paths.database)?);
            let queue = MutationQueue::open(Arc::clone(&store))?;
            let mirror = CacheMirror::open(store)?;

            match command {
                Commands::Status => {
                    commands::status(&queue, &mirror, config.sync.attempt_ceiling, format)?
                }
                Commands::List { limit } => commands::list(&queue, limit, format)?,
                Commands::Retry { all, id } => commands::retry(&queue, all, id, format)?,
                Commands::Clear { force } => commands::clear(&queue, force, format)?,
                Commands::Cache(args) => match args.command {
                    CacheCommands::List => commands::cache_list(&mirror, format)?,
                    CacheCommands::Show { collection } => {
                        commands::cache_show(&mirror, &collection, format)?
                    }
                },
                Commands::Completions { .. } => String::new(),
            }
        }
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
