//! Clientele API credentials.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: &[&str] = &["read", "write", "echo", "wallet", "transaction"];

/// OAuth2 credentials for the Clientele API.
///
/// The API uses the resource-owner password grant: the OAuth2 client id and
/// secret identify the application, username and password identify the
/// wallet owner.
#[derive(Debug)]
pub struct ClienteleCredentials {
    /// API root, e.g. `https://api.playground.upvest.co/1.0/`.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    /// Scopes requested with every token.
    pub scopes: Vec<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClienteleCredentials {
    /// Space separated scope list as sent in the token request.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secrets() {
        let credentials = ClienteleCredentials {
            base_url: Url::parse("https://api.playground.upvest.co/1.0/").unwrap(),
            client_id: "client".to_string(),
            client_secret: SecretString::from("client-secret-value".to_string()),
            username: "alice".to_string(),
            password: SecretString::from("hunter2".to_string()),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(60),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("client-secret-value"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(credentials.scope_string(), "read write echo wallet transaction");
    }
}
