//! Runtime configuration shared by the core components.
//!
//! Loading and validating the configuration file is handled by the CLI
//! crate; these types only hold already-parsed values.

mod poll;

pub use poll::{PollConfig, PollConfigError};
