//! Service-account authentication for the Sheets API.
//!
//! A [`TokenCache`] serves bearer tokens from an injectable [`TokenStore`],
//! minting new ones through [`TokenMinter`] (JWT bearer grant) when the
//! cached token is missing or inside its expiry buffer. Signing is done by a
//! [`Signer`], by default [`RsaPemSigner`] over a PKCS8 PEM key.

mod cache;
mod jwt;
mod signer;

pub use cache::{CachedToken, InMemoryTokenStore, TokenCache, TokenStore};
pub use jwt::{JWT_BEARER_GRANT_TYPE, TokenMinter};
pub use signer::{RsaPemSigner, Signer};

use crate::error::ErrorCode;
use serde_json::Value;
use thiserror::Error;

const PEM_BEGIN: &str = "-----BEGIN";
const PEM_END: &str = "-----END";

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Service account client email is missing")]
    MissingClientEmail,

    #[error("Service account private key is missing")]
    MissingPrivateKey,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Failed to sign JWT: {0}")]
    JwtSigningFailed(String),

    #[error("Token exchange failed{}: {details}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    TokenExchangeFailed { status: Option<u16>, details: Value },
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingClientEmail => ErrorCode::MissingClientEmail,
            AuthError::MissingPrivateKey => ErrorCode::MissingPrivateKey,
            AuthError::InvalidPrivateKey(_) => ErrorCode::InvalidPrivateKey,
            AuthError::JwtSigningFailed(_) => ErrorCode::JwtSigningFailed,
            AuthError::TokenExchangeFailed { .. } => ErrorCode::TokenExchangeFailed,
        }
    }
}

/// Identity used to sign JWT assertions.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key_pem: String,
}

// Keeps key material out of logs and panics.
impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountCredentials {
    pub fn new(client_email: impl Into<String>, private_key_pem: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key_pem: private_key_pem.into(),
        }
    }

    /// Cheap structural checks; the key itself is only parsed when signing.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_email.trim().is_empty() {
            return Err(AuthError::MissingClientEmail);
        }
        if self.private_key_pem.trim().is_empty() {
            return Err(AuthError::MissingPrivateKey);
        }
        if !self.private_key_pem.contains(PEM_BEGIN) || !self.private_key_pem.contains(PEM_END) {
            return Err(AuthError::InvalidPrivateKey(
                "missing PEM delimiters".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("testdata/test_key.pem");
    pub(crate) const TEST_PUBLIC_KEY: &str = include_str!("testdata/test_key.pub.pem");
    pub(crate) const TEST_CLIENT_EMAIL: &str = "edge-worker@test-project.iam.gserviceaccount.com";

    pub(crate) fn mock_credentials() -> ServiceAccountCredentials {
        ServiceAccountCredentials::new(TEST_CLIENT_EMAIL, TEST_PRIVATE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_pem() {
        assert!(test_helpers::mock_credentials().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        let no_email = ServiceAccountCredentials::new("  ", test_helpers::TEST_PRIVATE_KEY);
        assert!(matches!(
            no_email.validate(),
            Err(AuthError::MissingClientEmail)
        ));

        let no_key = ServiceAccountCredentials::new(test_helpers::TEST_CLIENT_EMAIL, "");
        assert!(matches!(no_key.validate(), Err(AuthError::MissingPrivateKey)));
    }

    #[test]
    fn test_validate_requires_pem_delimiters() {
        let creds = ServiceAccountCredentials::new(test_helpers::TEST_CLIENT_EMAIL, "MIIEvgIBADANBg");
        let err = creds.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPrivateKey);
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let rendered = format!("{:?}", test_helpers::mock_credentials());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("PRIVATE KEY"));
    }

    #[test]
    fn test_token_exchange_display_includes_status() {
        let err = AuthError::TokenExchangeFailed {
            status: Some(400),
            details: serde_json::json!({"error": "invalid_grant"}),
        };
        let message = err.to_string();
        assert!(message.contains("(400)"));
        assert!(message.contains("invalid_grant"));
    }
}
