//! Clientele API client (our backend → Upvest).
//!
//! Every request carries an OAuth2 bearer token obtained with the
//! resource-owner password grant. Tokens are cached until shortly before
//! they expire.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use super::{parse_response, ClientError};
use crate::config::ClienteleCredentials;
use crate::objects::{
    ComplexTransaction, ComplexTransactionRequest, DigestSignature, SignDigestRequest,
    TokenResponse, TransactionResponse,
};

/// Tokens are refreshed this long before the server-side expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Typed HTTP client for the Upvest **Clientele API**.
///
/// Cloning is cheap; clones share the HTTP connection pool and the cached
/// access token.
#[derive(Debug, Clone)]
pub struct ClienteleClient {
    http: Client,
    base_url: Url,
    credentials: Arc<ClienteleCredentials>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Debug)]
struct CachedToken {
    access_token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn from_response(resp: TokenResponse) -> Self {
        let lifetime = Duration::from_secs(resp.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Self {
            access_token: SecretString::from(resp.access_token),
            expires_at: Instant::now() + lifetime,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl ClienteleClient {
    /// Create a new `ClienteleClient`.
    ///
    /// The configured timeout applies to every request, including token
    /// requests.
    pub fn new(credentials: ClienteleCredentials) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(credentials.timeout).build()?;
        Ok(Self::with_http_client(credentials, http))
    }

    /// Create a client on top of a custom `reqwest::Client` (e.g. to
    /// configure a proxy).
    pub fn with_http_client(credentials: ClienteleCredentials, http: Client) -> Self {
        let mut base_url = credentials.base_url.clone();
        // Relative joins only append to a base path ending in `/`.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            credentials: Arc::new(credentials),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// The credentials this client authenticates with.
    pub fn credentials(&self) -> &ClienteleCredentials {
        &self.credentials
    }

    /// Resolve an endpoint path against the API root.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `POST kms/wallets/{wallet_id}/transactions/complex` – have the API
    /// build, sign and broadcast a smart contract call.
    pub async fn create_complex_transaction(
        &self,
        wallet_id: Uuid,
        password: &SecretString,
        tx: &ComplexTransaction,
        fund: bool,
    ) -> Result<TransactionResponse, ClientError> {
        let url = self.endpoint(&format!("kms/wallets/{wallet_id}/transactions/complex"))?;
        let body = ComplexTransactionRequest {
            tx,
            password: password.expose_secret(),
            input_format: "json",
            fund,
        };
        tracing::debug!(%wallet_id, to = %tx.to, fund, "Creating complex transaction");

        let token = self.access_token().await?;
        let resp = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        self.finish(resp).await
    }

    /// `GET kms/wallets/{wallet_id}/transactions/{transaction_id}` – current
    /// state of a submitted transaction.
    pub async fn retrieve_transaction(
        &self,
        wallet_id: Uuid,
        transaction_id: &str,
    ) -> Result<TransactionResponse, ClientError> {
        let url = self.endpoint(&format!(
            "kms/wallets/{wallet_id}/transactions/{transaction_id}"
        ))?;
        let token = self.access_token().await?;
        let resp = self.http.get(url).bearer_auth(token).send().await?;
        self.finish(resp).await
    }

    /// `POST kms/wallets/{wallet_id}/sign` – sign a hex digest with the
    /// wallet's key (General Purpose Signing Interface).
    pub async fn sign_digest(
        &self,
        wallet_id: Uuid,
        password: &SecretString,
        hex_digest: &str,
    ) -> Result<DigestSignature, ClientError> {
        let url = self.endpoint(&format!("kms/wallets/{wallet_id}/sign"))?;
        let body = SignDigestRequest::hex(password.expose_secret(), hex_digest);
        tracing::debug!(%wallet_id, digest = hex_digest, "Requesting digest signature");

        let token = self.access_token().await?;
        let resp = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        self.finish(resp).await
    }

    /// Return a cached access token or fetch a new one.
    async fn access_token(&self) -> Result<String, ClientError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.expose_secret().to_owned());
        }

        let fresh = CachedToken::from_response(self.request_token().await?);
        let value = fresh.access_token.expose_secret().to_owned();
        *cached = Some(fresh);
        Ok(value)
    }

    /// `POST clientele/oauth2/token` with the password grant.
    async fn request_token(&self) -> Result<TokenResponse, ClientError> {
        let url = self.endpoint("clientele/oauth2/token")?;
        let scope = self.credentials.scope_string();
        let form = [
            ("grant_type", "password"),
            ("scope", scope.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose_secret()),
        ];
        tracing::debug!(username = %self.credentials.username, "Requesting OAuth2 access token");

        let resp = self.http.post(url).form(&form).send().await?;
        parse_response(resp).await
    }

    /// Parse a response, dropping the cached token when it was rejected.
    async fn finish<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let result = parse_response(resp).await;
        if let Err(e) = &result {
            if e.is_unauthorized() {
                tracing::warn!("Access token rejected, discarding cached token");
                self.token.lock().await.take();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SCOPES;
    use axum::extract::{Form, Path, State};
    use axum::http::HeaderMap;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credentials(base_url: &str) -> ClienteleCredentials {
        ClienteleCredentials {
            base_url: Url::parse(base_url).unwrap(),
            client_id: "id".to_string(),
            client_secret: SecretString::from("secret".to_string()),
            username: "user".to_string(),
            password: SecretString::from("pw".to_string()),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint_keeps_api_version_segment() {
        let wallet = Uuid::nil();
        for base in [
            "https://api.playground.upvest.co/1.0/",
            "https://api.playground.upvest.co/1.0",
        ] {
            let client = ClienteleClient::new(credentials(base)).unwrap();
            let url = client
                .endpoint(&format!("kms/wallets/{wallet}/sign"))
                .unwrap();
            assert_eq!(
                url.as_str(),
                "https://api.playground.upvest.co/1.0/kms/wallets/00000000-0000-0000-0000-000000000000/sign"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_token_expiry() {
        let token = CachedToken::from_response(TokenResponse {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 60,
            refresh_token: None,
            scope: None,
        });
        assert!(token.is_fresh());
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!token.is_fresh());
    }

    /// In-process stand-in for the Clientele API.
    #[derive(Clone)]
    struct MockApi {
        token_requests: Arc<AtomicUsize>,
        token_form: Arc<StdMutex<Option<HashMap<String, String>>>>,
        authorization: Arc<StdMutex<Vec<String>>>,
        status: Arc<StdMutex<StatusCode>>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                token_requests: Arc::new(AtomicUsize::new(0)),
                token_form: Arc::new(StdMutex::new(None)),
                authorization: Arc::new(StdMutex::new(Vec::new())),
                status: Arc::new(StdMutex::new(StatusCode::OK)),
            }
        }

        fn respond_with(&self, status: StatusCode) {
            *self.status.lock().unwrap() = status;
        }

        fn token_requests(&self) -> usize {
            self.token_requests.load(Ordering::SeqCst)
        }

        fn last_authorization(&self) -> Option<String> {
            self.authorization.lock().unwrap().last().cloned()
        }
    }

    async fn issue_token(
        State(api): State<MockApi>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        let n = api.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
        *api.token_form.lock().unwrap() = Some(form);
        Json(json!({
            "access_token": format!("token-{n}"),
            "token_type": "Bearer",
            "expires_in": 3600,
        }))
    }

    async fn get_transaction(
        State(api): State<MockApi>,
        Path((_wallet, tx_id)): Path<(Uuid, String)>,
        headers: HeaderMap,
    ) -> Response {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            api.authorization.lock().unwrap().push(auth.to_owned());
        }
        let status = *api.status.lock().unwrap();
        if status.is_success() {
            Json(json!({ "id": tx_id, "txhash": "0xabc", "status": "QUEUED" })).into_response()
        } else {
            (status, "upstream exploded").into_response()
        }
    }

    async fn spawn_api(api: MockApi) -> ClienteleClient {
        let app = Router::new()
            .route("/1.0/clientele/oauth2/token", post(issue_token))
            .route(
                "/1.0/kms/wallets/{wallet_id}/transactions/{tx_id}",
                get(get_transaction),
            )
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ClienteleClient::new(credentials(&format!("http://{addr}/1.0"))).unwrap()
    }

    #[tokio::test]
    async fn test_password_grant_form() {
        let api = MockApi::new();
        let client = spawn_api(api.clone()).await;

        client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap();

        let form = api.token_form.lock().unwrap().clone().unwrap();
        assert_eq!(form["grant_type"], "password");
        assert_eq!(form["client_id"], "id");
        assert_eq!(form["client_secret"], "secret");
        assert_eq!(form["username"], "user");
        assert_eq!(form["password"], "pw");
        assert_eq!(form["scope"], "read write echo wallet transaction");
    }

    #[tokio::test]
    async fn test_token_reused_across_requests() {
        let api = MockApi::new();
        let client = spawn_api(api.clone()).await;

        let first = client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap();
        let second = client.clone().retrieve_transaction(Uuid::nil(), "tx-2").await.unwrap();

        assert_eq!(first.id, "tx-1");
        assert_eq!(second.tx_hash(), Some("0xabc"));
        assert_eq!(api.token_requests(), 1);
        assert_eq!(api.last_authorization().as_deref(), Some("Bearer token-1"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let api = MockApi::new();
        let client = spawn_api(api.clone()).await;
        api.respond_with(StatusCode::INTERNAL_SERVER_ERROR);

        let err = client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap_err();
        match &err {
            ClientError::Api { status, body } => {
                assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_unauthorized());

        // A server error does not invalidate the token.
        api.respond_with(StatusCode::OK);
        client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap();
        assert_eq!(api.token_requests(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_discards_cached_token() {
        let api = MockApi::new();
        let client = spawn_api(api.clone()).await;

        client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap();
        assert_eq!(api.token_requests(), 1);

        api.respond_with(StatusCode::UNAUTHORIZED);
        let err = client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap_err();
        assert!(err.is_unauthorized());

        api.respond_with(StatusCode::OK);
        client.retrieve_transaction(Uuid::nil(), "tx-1").await.unwrap();
        assert_eq!(api.token_requests(), 2);
        assert_eq!(api.last_authorization().as_deref(), Some("Bearer token-2"));
    }
}
