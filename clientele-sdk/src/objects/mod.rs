//! JSON bodies exchanged with the Clientele API.

pub mod networks;
pub mod oauth;
pub mod signatures;
pub mod transactions;
pub mod webhook;

pub use networks::{Network, UnknownNetwork};
pub use oauth::TokenResponse;
pub use signatures::{DigestSignature, SignDigestRequest};
pub use transactions::{
    ComplexTransaction, ComplexTransactionRequest, TransactionResponse,
    ETHEREUM_FUNCTION_CALL,
};
pub use webhook::WebhookEvent;
