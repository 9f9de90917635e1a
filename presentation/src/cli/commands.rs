//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for devops-agent
#[derive(Parser, Debug)]
#[command(name = "devops-agent")]
#[command(author, version, about = "DevOps assistant - plans, runs and explains operational tasks")]
#[command(long_about = r#"
devops-agent turns a natural-language request into a plan, runs the plan's
steps against local tools under a risk policy, and streams back a summary.

Every step is classified before it runs:
  safe / read_only     run immediately
  requires_approval    run only after approval (or with --auto-approve)
  blocked              never run

Configuration files are loaded from (in priority order):
1. DEVOPS_AGENT_* environment variables
2. --config <path>        Explicit config file
3. ./devops-agent.toml    Project-level config
4. ~/.config/devops-agent/config.toml   Global config

Example:
  devops-agent "list all running containers"
  devops-agent -m llama3.1:8b --interactive-approval
  devops-agent --show-config
"#)]
pub struct Cli {
    /// Ask a single question and exit (starts the chat REPL when omitted)
    pub question: Option<String>,

    /// Model to use (overrides `agent.model`)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and the merged configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Run approval-gated steps without asking
    #[arg(long, conflicts_with = "interactive_approval")]
    pub auto_approve: bool,

    /// Ask on the terminal before running approval-gated steps
    #[arg(long)]
    pub interactive_approval: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// `tracing` filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace", // -vvv or more
        }
    }
}
