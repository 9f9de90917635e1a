//! CLI entrypoint for devops-agent
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use devops_agent_application::{AgentOrchestrator, ApprovalPort};
use devops_agent_domain::CommandFilter;
use devops_agent_infrastructure::{
    ConfigLoader, FileConfig, JsonlConversationLogger, OllamaClient, ShellTool, ToolRegistry,
};
use devops_agent_presentation::{ChatRepl, Cli, ConsoleFormatter, InteractiveApproval};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(&cli, &config)?;
    info!("Starting devops-agent");

    if cli.show_config {
        return show_config(&cli, &config);
    }

    config.validate().context("Invalid configuration")?;

    let mut agent_file_config = config.agent.clone();
    if let Some(model) = &cli.model {
        agent_file_config.model = model.clone();
    }
    let mut agent_config = agent_file_config.to_agent_config()?;
    if cli.auto_approve {
        agent_config = agent_config.with_auto_execute(true);
    }
    if cli.interactive_approval {
        agent_config = agent_config.with_auto_execute(false);
    }

    // === Dependency Injection ===
    let llm = Arc::new(OllamaClient::new(config.ollama.base_url.clone(), config.ollama.timeout())?);
    info!(base_url = %llm.base_url(), model = %agent_config.model, "Using Ollama");

    let mut registry = ToolRegistry::new();
    if config.shell.enabled {
        registry = registry.register(ShellTool::new().with_timeout(Duration::from_secs(config.shell.timeout_secs)));
    }
    let tool_names: Vec<String> = registry.tool_names().into_iter().map(String::from).collect();

    let filter: Arc<dyn CommandFilter> = Arc::new(config.safety.to_command_filter()?);

    let mut orchestrator = AgentOrchestrator::new(llm, Arc::new(registry), agent_config)
        .with_command_filter(filter);

    if cli.interactive_approval {
        let approval: Arc<dyn ApprovalPort> = Arc::new(InteractiveApproval::new());
        orchestrator = orchestrator.with_approval(approval);
    }

    if let Some(path) = &config.logging.conversation_log {
        match JsonlConversationLogger::open(path) {
            Ok(logger) => {
                info!(path = %logger.path().display(), "Recording conversation transcript");
                orchestrator = orchestrator.with_conversation_logger(Arc::new(logger));
            }
            Err(e) => warn!(path = %path, error = %e, "Could not open conversation log"),
        }
    }

    let mut repl = ChatRepl::new(orchestrator).with_tool_names(tool_names);

    // Single question mode
    if let Some(question) = &cli.question {
        if let Err(e) = repl.ask(question).await {
            eprintln!("{}", ConsoleFormatter::error(&e));
            return Err(e.into());
        }
        return Ok(());
    }

    repl.run().await?;
    Ok(())
}

/// Install the tracing subscriber.
///
/// `-v` flags win over `logging.level`. When a log file is configured the
/// returned guard must live until exit so buffered lines are flushed.
fn init_logging(cli: &Cli, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let level = match (cli.verbose, &config.logging.level) {
        (0, Some(level)) => level.as_str(),
        _ => cli.log_level(),
    };
    let filter = EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.log_file.as_ref().map(Into::into));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let directory = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", log_file.display()))?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("Configuration sources (lowest to highest priority):");
    if cli.no_config {
        println!("  (disabled by --no-config)");
    } else {
        for source in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("  {}", source);
        }
    }
    println!();
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    Ok(())
}
