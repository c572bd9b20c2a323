//! # rehydra CLI Module
//!
//! This module implements the CLI interface for rehydra.
//!
//! ## Available Commands
//!
//! - `rehydrate` - Rehydrate a root function and print its call graph
//! - `definitions` - List the definition table of an environment
//! - `flatten` - Concatenate headers, inlining quoted includes once each

mod commands;

use crate::config::Config;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// rehydra - environment rehydration
///
/// Rebuilds the linked function graph described by a serialized environment.
#[derive(Parser, Debug)]
#[command(name = "rehydra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML config file (default: rehydra.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Reject environments containing duplicate definition names
    #[arg(long, global = true)]
    pub strict_duplicates: bool,

    /// Maximum nesting of definition rehydration
    #[arg(long, global = true)]
    pub max_call_depth: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rehydrate a root function and print everything it reaches
    Rehydrate {
        /// Path to the environment file (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Name of the root function
        #[arg(short, long)]
        root: String,
    },

    /// List the definitions of an environment
    Definitions {
        /// Path to the environment file (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Flatten headers into a single stream
    Flatten {
        /// Headers to flatten, in order
        #[arg(required = true)]
        headers: Vec<String>,

        /// Directory include names are resolved against
        #[arg(short, long, default_value = ".")]
        base: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Rehydrate { file, root } => {
            let options = Config::resolve(cli.config.as_deref())?
                .session_options(cli.strict_duplicates, cli.max_call_depth);
            cmd_rehydrate(&file, &root, options, json_mode)
        }
        Commands::Definitions { file } => {
            let options = Config::resolve(cli.config.as_deref())?
                .session_options(cli.strict_duplicates, cli.max_call_depth);
            cmd_definitions(&file, options, json_mode)
        }
        Commands::Flatten {
            headers,
            base,
            output,
        } => cmd_flatten(&headers, &base, output.as_deref()),
    }
}
