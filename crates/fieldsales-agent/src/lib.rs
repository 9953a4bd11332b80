//! # Fieldsales Agent
//!
//! Configuration and device simulation for the `fieldsales-agent` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod replay;

pub use cli::{Cli, Command};
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use replay::ReplayLocationProvider;
