// Public modules
pub mod config;
pub mod deploy;
pub mod environment;
pub mod error;
pub mod library;
pub mod paths;
pub mod process;
pub mod releases;
pub mod remote;
pub mod revision;
pub mod server;
pub mod ssh;
pub mod sync;
pub mod template;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
