//! Firebase email/password authentication.
//!
//! Holds a refresh token and a short-lived cached ID token; the ID token is
//! refreshed lazily with a 60 second expiry margin. The user id is read
//! straight out of the ID token's JWT claims, so no extra profile fetch is
//! needed to key per-user state.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::FirebaseConfig;

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    id_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FirebaseAuth {
    client: Client,
    config: FirebaseConfig,
    refresh_token: Arc<Mutex<String>>,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl FirebaseAuth {
    pub fn new(config: FirebaseConfig, refresh_token: String) -> Self {
        Self {
            client: Client::new(),
            config,
            refresh_token: Arc::new(Mutex::new(refresh_token)),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign in with email and password, returning an auth handle with a
    /// fresh refresh token.
    pub async fn sign_in(config: FirebaseConfig, email: &str, password: &str) -> Result<Self> {
        let client = Client::new();
        let url = format!(
            "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key={}",
            config.api_key
        );

        let resp = client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("sign-in failed: {} - {}", status, body));
        }

        let sign_in: SignInResponse = resp.json().await?;
        let expires_in: i64 = sign_in.expires_in.parse().unwrap_or(3600);

        Ok(Self {
            client,
            config,
            refresh_token: Arc::new(Mutex::new(sign_in.refresh_token)),
            cached: Arc::new(Mutex::new(Some(CachedToken {
                id_token: sign_in.id_token,
                expires_at: Utc::now() + Duration::seconds(expires_in),
            }))),
        })
    }

    /// Current ID token, refreshed when within 60s of expiry.
    pub async fn id_token(&self) -> Result<String> {
        {
            let cached = self.cached.lock().await;
            if let Some(ref token) = *cached {
                if token.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.id_token.clone());
                }
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<String> {
        let refresh_token = self.refresh_token.lock().await.clone();
        let url = format!(
            "https://securetoken.googleapis.com/v1/token?key={}",
            self.config.api_key
        );

        let resp = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("token refresh failed: {} - {}", status, body));
        }

        let refreshed: RefreshResponse = resp.json().await?;
        let expires_in: i64 = refreshed.expires_in.parse().unwrap_or(3600);

        // The refresh token may rotate
        *self.refresh_token.lock().await = refreshed.refresh_token;

        let id_token = refreshed.id_token.clone();
        *self.cached.lock().await = Some(CachedToken {
            id_token: refreshed.id_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });

        Ok(id_token)
    }

    /// User id from the ID token's claims (`user_id`, falling back to `sub`).
    pub async fn user_id(&self) -> Result<String> {
        let token = self.id_token().await?;
        user_id_from_jwt(&token)
    }
}

fn user_id_from_jwt(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("malformed JWT"))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| anyhow!("JWT payload decode failed: {e}"))?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded)?;
    claims["user_id"]
        .as_str()
        .or_else(|| claims["sub"].as_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow!("no user_id or sub claim in token"))
}
