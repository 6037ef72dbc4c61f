#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod abi;
pub mod config;
pub mod poller;
pub mod rpc;
pub mod signing;
pub mod transaction;
pub mod utils;
