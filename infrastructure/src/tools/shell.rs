//! Shell tool: `shell.run`
//!
//! Runs one command line through `sh -c`. Commands built only from known
//! inspection programs (`ls`, `df`, `docker ps`, `kubectl get`, ...) are
//! classified `read_only` when their arguments cannot change anything
//! (`git branch -a` but not `git branch -D`); everything else needs approval. Destructive
//! patterns are caught separately by the command filter.

use async_trait::async_trait;
use devops_agent_application::{Tool, ToolError};
use devops_agent_domain::core::string::truncate;
use devops_agent_domain::{
    OperationSpec, RiskLevel, ToolDescriptor, ToolInput, ToolParameter, ToolParameters, ToolResult,
};
use serde_json::json;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Tool name constant
pub const SHELL: &str = "shell";

/// The single operation this tool exposes
pub const RUN: &str = "run";

/// Default timeout for command execution (60 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum output size returned to the model (64 KiB)
const MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// What may follow a read-only program or subcommand.
///
/// Patterns ending in `*` match by prefix.
enum Args {
    Any,
    /// Every argument must match one of these
    Only(&'static [&'static str]),
    /// No argument may match any of these
    Deny(&'static [&'static str]),
}

impl Args {
    fn allows(&self, args: &[&str]) -> bool {
        match self {
            Args::Any => true,
            Args::Only(allowed) => args.iter().all(|arg| matches_any(arg, allowed)),
            Args::Deny(denied) => !args.iter().any(|arg| matches_any(arg, denied)),
        }
    }
}

fn matches_any(arg: &str, patterns: &[&str]) -> bool {
    let arg = arg.trim_matches(|c| c == '\'' || c == '"');
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => arg.starts_with(prefix),
        None => arg == *pattern,
    })
}

const IP_SHOW: Args = Args::Only(&["show", "list", "ls", "-4", "-6", "-br", "-brief", "-c", "-color"]);
const GIT_READ: Args = Args::Deny(&["--output*"]);

/// Programs and subcommands that only inspect state
const READ_ONLY_RULES: &[(&str, Args)] = &[
    ("cat", Args::Any),
    ("date", Args::Only(&["+*", "-u", "--utc", "--universal", "-R", "--rfc-email", "-I*", "--iso-8601*", "--rfc-3339=*"])),
    ("df", Args::Any),
    ("dig", Args::Any),
    ("du", Args::Any),
    ("echo", Args::Any),
    ("file", Args::Any),
    ("free", Args::Any),
    ("grep", Args::Any),
    ("head", Args::Any),
    ("host", Args::Any),
    ("hostname", Args::Only(&["-f", "-s", "-i", "-I", "-d", "-A", "--fqdn", "--long", "--short", "--domain", "--all-fqdns", "--ip-address", "--all-ip-addresses"])),
    ("id", Args::Any),
    ("ip addr", IP_SHOW),
    ("ip address", IP_SHOW),
    ("ip link", IP_SHOW),
    ("ip neigh", IP_SHOW),
    ("ip route", IP_SHOW),
    (
        "journalctl",
        Args::Deny(&[
            "--vacuum*",
            "--rotate",
            "--flush",
            "--sync",
            "--relinquish-var",
            "--smart-relinquish-var",
            "--setup-keys",
            "--update-catalog",
        ]),
    ),
    ("ls", Args::Any),
    ("lsblk", Args::Any),
    ("lsof", Args::Any),
    ("netstat", Args::Any),
    ("nslookup", Args::Any),
    ("printenv", Args::Any),
    ("ps", Args::Any),
    ("pwd", Args::Any),
    ("ss", Args::Any),
    ("stat", Args::Any),
    ("tail", Args::Any),
    ("uname", Args::Any),
    ("uptime", Args::Any),
    ("wc", Args::Any),
    ("which", Args::Any),
    ("whoami", Args::Any),
    ("docker images", Args::Any),
    ("docker inspect", Args::Any),
    ("docker logs", Args::Any),
    ("docker ps", Args::Any),
    ("docker stats --no-stream", Args::Any),
    ("docker version", Args::Any),
    (
        "git branch",
        Args::Only(&[
            "-a",
            "-r",
            "-v",
            "-vv",
            "--all",
            "--remotes",
            "--verbose",
            "--list",
            "--show-current",
            "--merged",
            "--no-merged",
            "--no-color",
        ]),
    ),
    ("git diff", GIT_READ),
    ("git log", GIT_READ),
    ("git show", GIT_READ),
    ("git status", Args::Any),
    ("helm list", Args::Any),
    ("helm status", Args::Any),
    ("kubectl describe", Args::Any),
    ("kubectl get", Args::Any),
    ("kubectl logs", Args::Any),
    ("kubectl top", Args::Any),
    ("kubectl version", Args::Any),
    ("systemctl is-active", Args::Any),
    ("systemctl list-units", Args::Any),
    ("systemctl status", Args::Any),
];

/// Sequencing, redirection and substitution; any of these makes a line
/// impossible to classify by its first word.
const UNSAFE_SHELL_SYNTAX: &[&str] = &[";", "&", ">", "<", "`", "$(", "\n"];

/// Runs shell commands on the local host
#[derive(Debug, Clone)]
pub struct ShellTool {
    default_timeout: Duration,
    max_output: usize,
}

impl Default for ShellTool {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output: MAX_OUTPUT_SIZE,
        }
    }
}

impl ShellTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }

    /// Classify a command line on its own.
    ///
    /// Pipelines are read-only when every stage is.
    pub fn classify_command(command: &str) -> RiskLevel {
        let command = command.trim();
        if command.is_empty() {
            return RiskLevel::Safe;
        }
        if UNSAFE_SHELL_SYNTAX.iter().any(|s| command.contains(s)) {
            return RiskLevel::RequiresApproval;
        }
        if command.split('|').all(is_read_only_stage) {
            RiskLevel::ReadOnly
        } else {
            RiskLevel::RequiresApproval
        }
    }

    fn combine_output(&self, stdout: &[u8], stderr: &[u8]) -> String {
        let stdout = String::from_utf8_lossy(stdout);
        let stderr = String::from_utf8_lossy(stderr);

        let mut combined = stdout.trim_end().to_string();
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push_str("\n--- stderr ---\n");
            }
            combined.push_str(stderr.trim_end());
        }

        if combined.len() > self.max_output {
            combined = truncate(&combined, self.max_output);
            combined.push_str("\n(output truncated)");
        }
        combined
    }
}

fn is_read_only_stage(stage: &str) -> bool {
    let mut words: Vec<&str> = stage.split_whitespace().collect();
    let Some(program) = words.first_mut() else {
        return false;
    };
    // `/usr/bin/ls` classifies like `ls`
    let name = *program;
    *program = name.rsplit('/').next().unwrap_or(name);

    READ_ONLY_RULES.iter().any(|(prefix, args)| {
        let prefix: Vec<&str> = prefix.split(' ').collect();
        words.len() >= prefix.len() && words[..prefix.len()] == prefix[..] && args.allows(&words[prefix.len()..])
    })
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        SHELL
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(SHELL, "Run a shell command on the local host and return its output").with_operation(
            OperationSpec::new(RUN, "Execute a command line with sh -c")
                .with_parameter(ToolParameter::new("command", "The command line to execute", true))
                .with_parameter(
                    ToolParameter::new("working_dir", "Working directory for the command", false)
                        .with_type("path"),
                )
                .with_parameter(
                    ToolParameter::new(
                        "timeout_secs",
                        format!("Timeout in seconds (default: {})", self.default_timeout.as_secs()),
                        false,
                    )
                    .with_type("number"),
                ),
        )
    }

    fn risk_level(&self, operation: &str, parameters: &ToolParameters) -> RiskLevel {
        if operation != RUN {
            return RiskLevel::RequiresApproval;
        }
        match parameters.get("command").and_then(|v| v.as_str()) {
            Some(command) => Self::classify_command(command),
            None => RiskLevel::RequiresApproval,
        }
    }

    async fn execute(&self, input: ToolInput) -> Result<ToolResult, ToolError> {
        let command_str = input.require_string("command").map_err(ToolError::InvalidInput)?;
        let timeout_secs = input
            .get_u64("timeout_secs")
            .unwrap_or(self.default_timeout.as_secs());

        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_str])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = input.get_string("working_dir") {
            let path = Path::new(dir);
            if !path.is_dir() {
                return Err(ToolError::InvalidInput(format!(
                    "Working directory does not exist: {}",
                    dir
                )));
            }
            cmd.current_dir(path);
        }

        debug!(command = %command_str, timeout_secs, "Running shell command");
        let start = Instant::now();
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| ToolError::Timeout(timeout_secs))?
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to spawn command: {}", e)))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let combined = self.combine_output(&output.stdout, &output.stderr);

        match output.status.code() {
            Some(0) => Ok(ToolResult::success(json!({
                "command": command_str,
                "exit_code": 0,
                "output": combined,
                "duration_ms": duration_ms,
            }))),
            Some(code) => Ok(ToolResult::failure(format!(
                "Command exited with code {}: {}",
                code, combined
            ))),
            None => Ok(ToolResult::failure(format!(
                "Command terminated by signal: {}",
                combined
            ))),
        }
    }
}
