use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Inspect and maintain the fieldsync offline queue and cache")]
#[command(long_about = "fieldsync - offline sync maintenance tooling

Inspects and maintains the persisted state of the fieldsync engine: the
offline mutation queue and the per-collection cache snapshots. Flushing is
driven by the host application (it owns the remote executor); this tool
never touches the network.

QUICK START:
  fieldsync status           Show pending mutations and cached collections
  fieldsync list             List queued mutations with diagnostics
  fieldsync retry --all      Re-arm failed mutations for the next flush

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  fieldsync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,

    /// Data directory holding config.yaml and fieldsync.db
    ///
    /// Defaults to ~/.fieldsync/.
    #[arg(long, env = "FIELDSYNC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show queue and cache status
    ///
    /// Shows the number of mutations waiting to sync, the age of the
    /// oldest one, and a summary of the cached collections.
    ///
    /// # Examples
    ///
    ///   fieldsync status
    ///   fieldsync status -o json
    #[command(alias = "st")]
    Status,

    /// List queued mutations
    ///
    /// Shows every mutation waiting to sync, in replay order, with its
    /// attempt count and last error if replay has failed before.
    ///
    /// # Examples
    ///
    ///   fieldsync list
    ///   fieldsync list --limit 10
    ///   fieldsync list -o json | jq '.[].target'
    #[command(alias = "ls")]
    List {
        /// Maximum number of mutations to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Re-arm mutations for the next flush
    ///
    /// Resets the attempt count of a mutation (or all mutations) so it is
    /// retried from scratch instead of being discarded at the ceiling.
    ///
    /// # Examples
    ///
    ///   fieldsync retry 42
    ///   fieldsync retry --all
    Retry {
        /// Reset every queued mutation
        #[arg(long)]
        all: bool,

        /// Id of the mutation to reset
        id: Option<u64>,
    },

    /// Clear the mutation queue
    ///
    /// Drops every queued mutation. This is accepted data loss: the
    /// dropped intents will never reach the remote store.
    ///
    /// # Examples
    ///
    ///   fieldsync clear --force
    Clear {
        /// Required confirmation flag
        #[arg(long)]
        force: bool,
    },

    /// Inspect cached collections
    Cache(CacheArgs),

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   fieldsync completions bash > /etc/bash_completion.d/fieldsync
    ///   fieldsync completions zsh > ~/.zfunc/_fieldsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached collections with record counts
    List,

    /// Show the cached records of one collection
    ///
    /// # Examples
    ///
    ///   fieldsync cache show tasks
    ///   fieldsync cache show attendance -o json
    Show {
        /// Collection name
        collection: String,
    },
}
