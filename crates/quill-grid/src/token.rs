//! Admin credential lifecycle for the grid backend.
//!
//! # Purpose
//! Provisioning calls run under a short-lived admin session token that the
//! backend issues against the configured admin identity. [`TokenManager`]
//! owns that credential: it authenticates on first use, hands out the
//! cached token while it stays comfortably inside its lifetime, refreshes
//! it once when it goes stale, and falls back to a full re-authentication
//! when the refresh is refused.
//!
//! # Key invariants
//! - At most one backend acquisition is in flight at a time. The cache
//!   lock is held across the round trip, so concurrent callers coalesce
//!   onto the winner's result instead of racing the token endpoints.
//! - A stale credential triggers exactly one refresh attempt before the
//!   manager re-authenticates from scratch.
//! - During a backend outage the cached credential keeps being served for
//!   as long as it is genuinely unexpired. An authoritative rejection is
//!   never papered over this way.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::GridConfig;
use crate::endpoints::Endpoints;
use crate::error::{AuthError, ConfigError, detail_snippet};
use crate::wire::{TokenAuthRequest, TokenRefreshRequest, TokenResponse};

/// A grid session token ready to be presented on authenticated calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for admin session calls.
    pub fn authorization(&self) -> String {
        format!("JWT {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    // Tokens must not reach logs through a stray debug format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// One issued credential pair with its expiry resolved to an instant.
///
/// The backend reports lifetime as relative `expires_in` seconds; the
/// instant is pinned at decode time so staleness checks never depend on
/// when the response was first inspected.
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        // An out-of-range lifetime decodes as already expired rather than
        // panicking inside chrono.
        let lifetime =
            chrono::Duration::try_seconds(response.expires_in).unwrap_or_else(chrono::Duration::zero);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now + lifetime,
        }
    }

    /// Usable without any backend round trip: the remaining lifetime still
    /// exceeds the refresh buffer.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
        self.expires_at > now + buffer
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    fn access_token(&self) -> AccessToken {
        AccessToken(self.access_token.clone())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"..")
            .field("refresh_token", &"..")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Caches the admin credential and renews it ahead of expiry.
pub struct TokenManager {
    http: reqwest::Client,
    endpoints: Endpoints,
    admin_email: String,
    admin_password: String,
    refresh_buffer: chrono::Duration,
    cache: Mutex<Option<Credential>>,
}

impl TokenManager {
    pub fn new(config: &GridConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let endpoints = Endpoints::for_version(&config.base_url, config.api_version)?;
        let refresh_buffer =
            chrono::Duration::from_std(config.refresh_buffer).map_err(|_| ConfigError::Invalid {
                key: "QUILL_GRID_REFRESH_BUFFER_SECS",
                detail: "out of range".to_string(),
            })?;
        Ok(Self {
            http,
            endpoints,
            admin_email: config.admin_email.clone(),
            admin_password: config.admin_password.clone(),
            refresh_buffer,
            cache: Mutex::new(None),
        })
    }

    /// Returns a token that is expected to outlive the next backend call.
    ///
    /// Resolution order: cached credential while fresh, then one refresh
    /// attempt, then a full re-authentication. When both renewal paths fail
    /// on transport and the cached credential has lifetime left, the cached
    /// token is served so a brief backend outage does not cascade into
    /// spurious auth failures.
    pub async fn valid_token(&self) -> Result<AccessToken, AuthError> {
        // Held across the whole acquisition; see the module invariants.
        let mut cache = self.cache.lock().await;

        if let Some(credential) = cache.as_ref()
            && credential.is_fresh(Utc::now(), self.refresh_buffer)
        {
            metrics::counter!("quill_grid_token_cache_hits_total").increment(1);
            return Ok(credential.access_token());
        }

        // Step 1: one refresh attempt against the cached refresh token.
        let refresh_token = cache.as_ref().map(|credential| credential.refresh_token.clone());
        let refresh_failure = match refresh_token {
            Some(token) => match self.refresh(&token).await {
                Ok(response) => {
                    metrics::counter!("quill_grid_token_refresh_total", "outcome" => "ok")
                        .increment(1);
                    let credential = Credential::from_response(response, Utc::now());
                    let access = credential.access_token();
                    *cache = Some(credential);
                    return Ok(access);
                }
                Err(error) => {
                    metrics::counter!("quill_grid_token_refresh_total", "outcome" => "error")
                        .increment(1);
                    tracing::debug!(
                        error = %error,
                        "token refresh failed, falling back to re-authentication"
                    );
                    Some(error)
                }
            },
            None => None,
        };

        // Step 2: full re-authentication with the configured admin identity.
        match self.authenticate().await {
            Ok(response) => {
                metrics::counter!("quill_grid_token_auth_total", "outcome" => "ok").increment(1);
                let credential = Credential::from_response(response, Utc::now());
                let access = credential.access_token();
                *cache = Some(credential);
                Ok(access)
            }
            Err(auth_failure) => {
                metrics::counter!("quill_grid_token_auth_total", "outcome" => "error").increment(1);
                // Step 3: ride out a transport outage on the cached
                // credential while it is genuinely unexpired.
                if auth_failure.is_transport()
                    && refresh_failure.as_ref().is_none_or(AuthError::is_transport)
                    && let Some(credential) = cache.as_ref()
                    && !credential.is_expired(Utc::now())
                {
                    metrics::counter!("quill_grid_token_stale_grace_total").increment(1);
                    tracing::warn!(
                        expires_at = %credential.expires_at,
                        "grid backend unreachable, serving cached admin credential until expiry"
                    );
                    return Ok(credential.access_token());
                }
                if !auth_failure.is_transport() {
                    // The backend refused the admin identity outright; the
                    // cached pair is no better than starting over.
                    *cache = None;
                }
                Err(auth_failure)
            }
        }
    }

    /// Drops the cached credential so the next call re-authenticates.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        if cache.take().is_some() {
            tracing::debug!("cleared cached admin credential");
        }
    }

    async fn authenticate(&self) -> Result<TokenResponse, AuthError> {
        tracing::debug!(email = %self.admin_email, "authenticating against the grid backend");
        self.post_token(
            self.endpoints.token_auth(),
            "token_auth",
            &TokenAuthRequest {
                email: &self.admin_email,
                password: &self.admin_password,
            },
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.post_token(
            self.endpoints.token_refresh(),
            "token_refresh",
            &TokenRefreshRequest { refresh_token },
        )
        .await
    }

    async fn post_token<B: Serialize>(
        &self,
        url: String,
        operation: &'static str,
        body: &B,
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| AuthError::Transport { operation, source })?;
        let status = response.status();
        if status.is_client_error() {
            let detail = detail_snippet(&response.text().await.unwrap_or_default());
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        // A 5xx is an outage, not a verdict on the credentials.
        let response = response
            .error_for_status()
            .map_err(|source| AuthError::Transport { operation, source })?;
        response
            .json()
            .await
            .map_err(|source| AuthError::Transport { operation, source })
    }
}
