use super::{AuthError, RsaPemSigner, ServiceAccountCredentials, Signer};
use crate::error::parse_error_body;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use google_sheets4::api::Scope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

const RS256_HEADER: JwtHeader = JwtHeader {
    alg: "RS256",
    typ: "JWT",
};

// https://developers.google.com/identity/protocols/oauth2/service-account#authorizingrequests
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

fn default_expires_in() -> u64 {
    DEFAULT_TOKEN_LIFETIME.as_secs()
}

/// Exchanges a signed service-account assertion for a bearer access token.
///
/// Exactly one exchange is attempted per call. Failures are never retried
/// here so that a credential misconfiguration is reported as such instead of
/// looking like a transient fault.
pub struct TokenMinter {
    credentials: ServiceAccountCredentials,
    signer: Arc<dyn Signer>,
    scope: String,
    token_url: String,
    lifetime: Duration,
    http_client: reqwest::Client,
}

impl TokenMinter {
    pub fn new(
        credentials: ServiceAccountCredentials,
        token_url: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        let signer = Arc::new(RsaPemSigner::new(credentials.private_key_pem.clone()));
        Self {
            credentials,
            signer,
            scope: Scope::Spreadsheet.as_ref().to_string(),
            token_url: token_url.into(),
            lifetime: DEFAULT_TOKEN_LIFETIME,
            http_client,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Build the compact `header.claims.signature` JWT for `now`.
    pub(crate) fn build_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.credentials.validate()?;

        let iat = now.timestamp();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_url.clone(),
            iat,
            exp: iat.saturating_add(i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX)),
        };

        let header = serde_json::to_vec(&RS256_HEADER)
            .map_err(|e| AuthError::JwtSigningFailed(format!("Failed to encode header: {}", e)))?;
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::JwtSigningFailed(format!("Failed to encode claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = self.signer.sign(signing_input.as_bytes())?;

        Ok(format!("{}.{}", signing_input, signature))
    }

    #[instrument(name = "Minting access token", skip(self), fields(client_email = %self.credentials.client_email))]
    pub async fn mint(&self) -> Result<TokenResponse, AuthError> {
        let assertion = self.build_assertion(Utc::now())?;

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status: None,
                details: Value::String(e.to_string()),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                details: parse_error_body(&body),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                details: Value::String(format!("Malformed token response: {}", e)),
            })?;

        debug!(expires_in = token.expires_in, "Token exchange successful");

        Ok(token)
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    /// Signer that returns a fixed signature and never touches key material.
    pub(crate) struct StaticSigner;

    impl Signer for StaticSigner {
        fn sign(&self, _payload: &[u8]) -> Result<String, AuthError> {
            Ok("c2lnbmF0dXJl".to_string())
        }
    }
}
