//! Subcommand implementations. Each module exposes an action enum and a
//! `run` function; output goes to stdout as pretty JSON.

pub mod account;
pub mod calendar;
pub mod check;
pub mod config;
pub mod dashboard;
pub mod member;

use gymtrack_core::{Config, CoreError, OwnerId};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The signed-in owner, or [`CoreError::Unauthenticated`].
pub fn signed_in_owner(config: &Config) -> Result<OwnerId, CoreError> {
    config.owner().ok_or(CoreError::Unauthenticated)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single-threaded runtime for the long-running commands.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
