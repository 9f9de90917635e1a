//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use colored::Colorize;
use devops_agent_application::{AgentOrchestrator, ChatError, ChatSession};
use devops_agent_domain::ApprovalId;
use futures::StreamExt;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Number of lines kept in the history file
const HISTORY_SIZE: usize = 1000;

/// A slash command typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    State,
    History,
    Clear,
    Pending,
    Approve(ApprovalId),
    Reject(ApprovalId),
    Quit,
    /// Recognised command with a bad or missing argument
    Usage(&'static str),
    Unknown(String),
}

impl ReplCommand {
    /// Parse a prompt line. Returns `None` for ordinary questions.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        let id = |usage: &'static str, make: fn(ApprovalId) -> ReplCommand| {
            match arg.map(str::parse::<ApprovalId>) {
                Some(Ok(id)) => make(id),
                _ => ReplCommand::Usage(usage),
            }
        };

        Some(match name {
            "help" | "h" | "?" => ReplCommand::Help,
            "state" | "status" => ReplCommand::State,
            "history" => ReplCommand::History,
            "clear" => ReplCommand::Clear,
            "pending" => ReplCommand::Pending,
            "approve" => id("/approve ID", ReplCommand::Approve),
            "reject" => id("/reject ID", ReplCommand::Reject),
            "quit" | "exit" | "q" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        })
    }
}

/// Interactive chat REPL
pub struct ChatRepl {
    orchestrator: AgentOrchestrator,
    session: ChatSession,
    tool_names: Vec<String>,
    history_path: Option<PathBuf>,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(orchestrator: AgentOrchestrator) -> Self {
        Self {
            orchestrator,
            session: ChatSession::new(),
            tool_names: Vec::new(),
            history_path: dirs::data_dir().map(|p| p.join("devops-agent").join("history.txt")),
        }
    }

    /// Tool names shown in the banner
    pub fn with_tool_names(mut self, names: Vec<String>) -> Self {
        self.tool_names = names;
        self
    }

    /// Override (or disable) the prompt history file
    pub fn with_history_path(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> io::Result<()> {
        let mut line_editor = self.line_editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("devops".to_string()),
            DefaultPromptSegment::Empty,
        );

        let tools: Vec<&str> = self.tool_names.iter().map(String::as_str).collect();
        println!("{}", ConsoleFormatter::welcome(&self.orchestrator.config().model, &tools));

        loop {
            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match ReplCommand::parse(line) {
                        Some(command) => {
                            if self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            if let Err(e) = self.ask(line).await {
                                println!("{}", ConsoleFormatter::error(&e));
                            }
                        }
                    }
                }
                Ok(Signal::CtrlC) => {
                    println!("^C");
                    continue;
                }
                Ok(Signal::CtrlD) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn line_editor(&self) -> Reedline {
        let editor = Reedline::create();
        let Some(path) = &self.history_path else {
            return editor;
        };
        ensure_history_dir(path);
        match FileBackedHistory::with_file(HISTORY_SIZE, path.clone()) {
            Ok(history) => editor.with_history(Box::new(history)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open REPL history");
                editor
            }
        }
    }

    /// Handle slash commands. Returns true if should exit.
    async fn handle_command(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => print!("{}", ConsoleFormatter::help()),
            ReplCommand::State => println!("{}", ConsoleFormatter::state(self.session.get_state())),
            ReplCommand::History => {
                print!("{}", ConsoleFormatter::history(&self.session.get_conversation_history()))
            }
            ReplCommand::Clear => {
                self.orchestrator.clear_context(&mut self.session);
                println!("{}", "Conversation cleared.".dimmed());
            }
            ReplCommand::Pending => print!("{}", ConsoleFormatter::pending(self.session.pending_approvals())),
            ReplCommand::Approve(id) => {
                let stream = self.orchestrator.resume_approved(&mut self.session, id);
                if let Err(e) = print_stream(stream).await {
                    println!("{}", ConsoleFormatter::error(&e));
                }
            }
            ReplCommand::Reject(id) => match self.orchestrator.reject_pending(&mut self.session, id) {
                Ok(pending) => println!("{} {}", "Rejected".yellow(), pending.summary()),
                Err(e) => println!("{}", ConsoleFormatter::error(&e)),
            },
            ReplCommand::Usage(usage) => println!("Usage: {}", usage),
            ReplCommand::Unknown(name) => {
                println!("Unknown command: /{} (type /help for the list)", name)
            }
        }
        false
    }

    /// Run one turn and print the answer as it streams in.
    pub async fn ask(&mut self, question: &str) -> Result<(), ChatError> {
        let stream = self.orchestrator.chat(&mut self.session, question);
        print_stream(stream).await
    }
}

/// Create the directory holding the history file. Failures are logged and
/// reported as `false`; the REPL still runs without history.
fn ensure_history_dir(path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return true;
    };
    match std::fs::create_dir_all(parent) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %parent.display(), error = %e, "Could not create REPL history directory");
            false
        }
    }
}

/// Print chunks until the stream ends, an error arrives, or Ctrl-C is
/// pressed. Ctrl-C drops the stream, which abandons the turn.
async fn print_stream<S>(stream: S) -> Result<(), ChatError>
where
    S: futures::Stream<Item = Result<String, ChatError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut stdout = io::stdout();

    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Err(ChatError::Cancelled);
            }
        };
        match item {
            Some(Ok(chunk)) => {
                print!("{}", chunk);
                let _ = stdout.flush();
            }
            Some(Err(e)) => {
                println!();
                return Err(e);
            }
            None => break,
        }
    }
    println!();
    Ok(())
}
