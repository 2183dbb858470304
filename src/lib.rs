pub mod config;
pub mod docker;
pub mod error;
pub mod jobs;
pub mod runner;
pub mod shutdown;
pub mod watchdog;

pub use error::{AgentError, Result};
