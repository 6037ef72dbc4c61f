//! Shared types for the Upvest Clientele toolkit.
//!
//! * [`signature`] verifies `X-UP-Signature` webhook callbacks.
//! * [`objects`] holds the JSON request/response bodies of the Clientele API.
//! * [`config`] holds the credentials needed to talk to the API.
//! * `client` (behind the `client` feature) is a typed HTTP client.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod config;
pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;
