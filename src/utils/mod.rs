//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process execution and output capture
//! - `shell` - Shell escaping and quoting

pub mod command;
pub mod shell;
