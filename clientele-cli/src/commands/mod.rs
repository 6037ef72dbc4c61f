//! Subcommand implementations.

pub mod complex;
pub mod gpsi;

use std::process::ExitCode;

use clientele_core::poller::PollError;

/// How a transaction subcommand ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transaction hash (or receipt) showed up.
    Confirmed,
    /// Polling gave up before anything showed up.
    TimedOut,
    /// The user interrupted polling.
    Cancelled,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Confirmed => ExitCode::SUCCESS,
            Outcome::TimedOut => ExitCode::from(2),
            Outcome::Cancelled => ExitCode::from(130),
        }
    }
}

/// Split a polling error into a cancellation outcome or a hard failure.
fn cancelled_or<E: Into<anyhow::Error>>(err: PollError<E>) -> anyhow::Result<Outcome> {
    match err {
        PollError::Cancelled => Ok(Outcome::Cancelled),
        PollError::Lookup(e) => Err(e.into()),
        PollError::InvalidConfig(e) => Err(e.into()),
    }
}

/// Pretty JSON for terminal output.
fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}
