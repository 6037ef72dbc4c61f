//! Configuration types for the Clientele toolkit.
//!
//! These types represent validated runtime configuration and can be shared
//! across crates. Loading and parsing the configuration file is handled by
//! the CLI crate.

mod credentials;
mod wallet;

pub use credentials::{ClienteleCredentials, DEFAULT_SCOPES};
pub use wallet::WalletConfig;
