//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// repoqa: grounded question answering over source repositories.
///
/// Index a repository into a searchable corpus, then ask questions; every
/// claim in an answer carries a file:line citation into the code.
#[derive(Parser, Debug)]
#[command(name = "repoqa")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the corpus and vector databases.
    ///
    /// Defaults to `.repoqa` in the current directory.
    #[arg(long, env = "REPOQA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output (includes the reasoning trace).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a local repository into the corpus.
    Index {
        /// Path to the repository root.
        path: PathBuf,
    },

    /// Ask a question against an indexed repository.
    Ask {
        /// Repository id (from `index` or `list`).
        repo: String,

        /// The question to answer.
        question: String,

        /// Emit the plain draft + references instead of the structured
        /// document.
        #[arg(long)]
        plain: bool,
    },

    /// Generate an architecture overview of an indexed repository.
    #[command(alias = "arch")]
    Architecture {
        /// Repository id.
        repo: String,
    },

    /// List indexed repositories, newest first.
    #[command(alias = "ls")]
    List,

    /// Show the indexing status of a repository.
    Status {
        /// Repository id.
        repo: String,
    },

    /// Delete a repository corpus and its vector namespace.
    #[command(alias = "rm")]
    Delete {
        /// Repository id.
        repo: String,
    },
}
