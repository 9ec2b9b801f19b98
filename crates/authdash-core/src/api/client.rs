//! HTTP client for the remote identity service.
//!
//! Every request passes through a pipeline of [`RequestHook`]s before it is
//! sent. The default pipeline attaches the stored bearer token, read fresh
//! from the credential store on each call.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::models::{Identity, LoginRequest, MessageResponse, RegisterRequest, TokenResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const ME_PATH: &str = "/api/user/me";

// ============================================================================
// Request hooks
// ============================================================================

/// Pre-request step that may add or rewrite outgoing headers.
pub trait RequestHook: Send + Sync {
    fn apply(&self, headers: &mut header::HeaderMap) -> Result<(), ApiError>;
}

/// Attaches `Authorization: Bearer <token>` when the store holds a token.
pub struct BearerTokenHook {
    store: Arc<dyn CredentialStore>,
}

impl BearerTokenHook {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl RequestHook for BearerTokenHook {
    fn apply(&self, headers: &mut header::HeaderMap) -> Result<(), ApiError> {
        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                // An unreadable slot is treated as absent; the server decides.
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::NetworkError("Stored token is not a valid header value".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(())
    }
}

// ============================================================================
// Identity service contract
// ============================================================================

/// The three endpoints the session layer depends on.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError>;
    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError>;
    async fn fetch_me(&self) -> Result<Identity, ApiError>;
}

// ============================================================================
// Client
// ============================================================================

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl ApiClient {
    /// Client whose requests carry the token held by `store`
    pub fn new(base_url: &str, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Self::with_hooks(base_url, Vec::new())?;
        Ok(client.hook(Arc::new(BearerTokenHook::new(store))))
    }

    /// Client with an explicit hook pipeline and no implicit credentials
    pub fn with_hooks(base_url: &str, hooks: Vec<Arc<dyn RequestHook>>) -> Result<Self, ApiError> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            hooks,
        })
    }

    /// Append a hook to the end of the pipeline
    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        for hook in &self.hooks {
            hook.apply(&mut headers)?;
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send one JSON request and decode the JSON response. No retries.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers()?);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            debug!(%method, url = %url, error = %e, "Request failed to send");
            ApiError::NetworkError(format!("Failed to reach {}: {}", url, e))
        })?;

        let status = response.status();
        debug!(%method, url = %url, status = status.as_u16(), "Response received");
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        Self::decode(status, &text)
    }

    fn decode<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
        serde_json::from_str(text).map_err(|e| {
            warn!(status = status.as_u16(), error = %e, "Malformed JSON response");
            ApiError::from(e)
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }
}

#[async_trait]
impl IdentityService for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
        self.post(REGISTER_PATH, request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.post(LOGIN_PATH, request).await
    }

    async fn fetch_me(&self) -> Result<Identity, ApiError> {
        self.get(ME_PATH).await
    }
}
