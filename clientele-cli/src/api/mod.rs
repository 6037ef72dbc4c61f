//! HTTP API of the webhook receiver.

pub mod extractors;
pub mod webhook;
