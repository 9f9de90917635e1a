//! Command safety filter adapter

pub mod command_filter;

pub use command_filter::{FilterError, PatternCommandFilter};
