//! Console front end for rehearse.
//!
//! `rehearse practice` runs a session against the console speech engines:
//! partner lines are printed with a simulated speaking time, and the user
//! types their own lines. `rehearse config` and `rehearse progress` inspect
//! and change stored settings and progress.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod paths;
pub mod presentation;
pub mod prompt;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, ConfigCommand};
pub use error::CliError;
pub use parser::Cli;
