//! CLI parse: clap types for agentstack. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentstack CLI - IAM role and AgentCore runtime assembly
#[derive(Parser)]
#[command(name = "agentstack")]
#[command(about = "Assemble, synthesize and validate an AgentCore runtime stack")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// AWS account id (overrides config and environment)
    #[arg(long)]
    pub account: Option<String>,

    /// AWS region (overrides config and environment)
    #[arg(long)]
    pub region: Option<String>,

    /// Stack identifier (overrides stack.name)
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize the template
    Synth {
        /// Write template and asset manifest into this directory instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a fresh synthesis or an existing template file
    Validate {
        /// Template file to validate (default: synthesize the workspace stack)
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
    /// Report policy statements that pair sensitive or wildcard actions with `*`
    Lint {
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
    /// Print the runtime name derived from a stack identifier
    Name {
        /// Stack identifier
        stack_id: String,
    },
    /// Show the resolved configuration and deployment target
    Config {
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Stable command name for logs
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Synth { .. } => "synth",
        Commands::Validate { .. } => "validate",
        Commands::Lint { .. } => "lint",
        Commands::Name { .. } => "name",
        Commands::Config { .. } => "config",
    }
}
