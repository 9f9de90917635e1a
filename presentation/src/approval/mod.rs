//! Terminal adapter for the approval port

mod interactive;

pub use interactive::{InteractiveApproval, parse_decision};
