use super::{AuthError, TokenMinter};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    /// Expiry as milliseconds since the Unix epoch
    pub expires_at_ms: i64,
}

impl CachedToken {
    /// True while the token stays valid for at least `buffer` past `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, buffer: Duration) -> bool {
        let buffer_ms = i64::try_from(buffer.as_millis()).unwrap_or(i64::MAX);
        self.expires_at_ms > now_ms.saturating_add(buffer_ms)
    }
}

/// Holds at most one access token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Option<CachedToken>;

    async fn set(&self, token: CachedToken);

    async fn clear(&self);
}

/// Process-local store; the token is lost when the process exits.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<CachedToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self) -> Option<CachedToken> {
        self.token.read().await.clone()
    }

    async fn set(&self, token: CachedToken) {
        *self.token.write().await = Some(token);
    }

    async fn clear(&self) {
        *self.token.write().await = None;
    }
}

/// Serves a cached access token, minting a new one when it is missing or
/// about to expire.
///
/// Two callers that miss at the same moment may both mint. Token exchanges
/// are idempotent, so the only cost is a redundant request.
pub struct TokenCache {
    minter: TokenMinter,
    store: Arc<dyn TokenStore>,
    expiry_buffer: Duration,
}

impl TokenCache {
    pub fn new(minter: TokenMinter) -> Self {
        Self {
            minter,
            store: Arc::new(InMemoryTokenStore::new()),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_expiry_buffer(mut self, expiry_buffer: Duration) -> Self {
        self.expiry_buffer = expiry_buffer;
        self
    }

    #[instrument(name = "Getting access token", skip_all)]
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let now_ms = Utc::now().timestamp_millis();

        match self.store.get().await {
            Some(cached) if cached.is_fresh(now_ms, self.expiry_buffer) => {
                debug!("Using cached access token");
                return Ok(cached.access_token);
            }
            Some(_) => debug!("Cached access token inside expiry buffer, minting"),
            None => debug!("No cached access token, minting"),
        }

        let minted = self.minter.mint().await?;
        let token = CachedToken {
            access_token: minted.access_token,
            expires_at_ms: expires_at_ms(now_ms, minted.expires_in),
        };
        self.store.set(token.clone()).await;

        Ok(token.access_token)
    }

    /// Drop the cached token, e.g. after credential rotation.
    pub async fn clear(&self) {
        self.store.clear().await;
        debug!("Cleared cached access token");
    }
}

/// Absolute expiry for a token issued at `now_ms`, saturating on absurd
/// `expires_in` values.
fn expires_at_ms(now_ms: i64, expires_in: u64) -> i64 {
    let lifetime_ms = i64::try_from(expires_in)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now_ms.saturating_add(lifetime_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::mock_credentials;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_server(expected_mints: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fresh",
                "expires_in": 3600,
                "token_type": "Bearer",
            })))
            .expect(expected_mints)
            .mount(&server)
            .await;
        server
    }

    fn cache_for(server: &MockServer, store: Arc<dyn TokenStore>) -> TokenCache {
        let minter = TokenMinter::new(
            mock_credentials(),
            format!("{}/token", server.uri()),
            reqwest::Client::new(),
        );
        TokenCache::new(minter).with_store(store)
    }

    #[test]
    fn test_is_fresh_respects_buffer() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at_ms: 10 * 60 * 1000,
        };
        assert!(token.is_fresh(0, DEFAULT_EXPIRY_BUFFER));
        assert!(!token.is_fresh(5 * 60 * 1000, DEFAULT_EXPIRY_BUFFER));
        assert!(!token.is_fresh(6 * 60 * 1000, DEFAULT_EXPIRY_BUFFER));
        assert!(!token.is_fresh(0, Duration::MAX));
    }

    #[test]
    fn test_expires_at_saturates() {
        assert_eq!(expires_at_ms(1_000, 3600), 1_000 + 3_600_000);
        assert_eq!(expires_at_ms(1_000, 10_000_000_000_000_000), i64::MAX);
        assert_eq!(expires_at_ms(1_000, u64::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_huge_expires_in_is_cached_without_overflow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.forever",
                "expires_in": 10_000_000_000_000_000u64,
            })))
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = cache_for(&server, store.clone());

        assert_eq!(cache.get_token().await.unwrap(), "ya29.forever");
        assert_eq!(cache.get_token().await.unwrap(), "ya29.forever");
        assert_eq!(store.get().await.unwrap().expires_at_ms, i64::MAX);
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let server = token_server(1).await;
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = cache_for(&server, store.clone());

        let first = cache.get_token().await.unwrap();
        let second = cache.get_token().await.unwrap();

        assert_eq!(first, "ya29.fresh");
        assert_eq!(second, "ya29.fresh");

        let cached = store.get().await.unwrap();
        let now_ms = Utc::now().timestamp_millis();
        assert!(cached.expires_at_ms > now_ms + 3500 * 1000);
    }

    #[tokio::test]
    async fn test_token_inside_buffer_is_reminted() {
        let server = token_server(1).await;
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .set(CachedToken {
                access_token: "ya29.stale".to_string(),
                expires_at_ms: Utc::now().timestamp_millis() + 4 * 60 * 1000,
            })
            .await;
        let cache = cache_for(&server, store.clone());

        let token = cache.get_token().await.unwrap();

        assert_eq!(token, "ya29.fresh");
        assert_eq!(store.get().await.unwrap().access_token, "ya29.fresh");
    }

    #[tokio::test]
    async fn test_fresh_token_skips_network() {
        let server = token_server(0).await;
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .set(CachedToken {
                access_token: "ya29.cached".to_string(),
                expires_at_ms: Utc::now().timestamp_millis() + 30 * 60 * 1000,
            })
            .await;
        let cache = cache_for(&server, store);

        assert_eq!(cache.get_token().await.unwrap(), "ya29.cached");
    }

    #[tokio::test]
    async fn test_clear_forces_new_mint() {
        let server = token_server(2).await;
        let cache = cache_for(&server, Arc::new(InMemoryTokenStore::new()));

        cache.get_token().await.unwrap();
        cache.clear().await;
        cache.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_buffer() {
        let server = token_server(0).await;
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .set(CachedToken {
                access_token: "ya29.cached".to_string(),
                expires_at_ms: Utc::now().timestamp_millis() + 4 * 60 * 1000,
            })
            .await;
        let cache = cache_for(&server, store).with_expiry_buffer(Duration::from_secs(60));

        assert_eq!(cache.get_token().await.unwrap(), "ya29.cached");
    }

    #[tokio::test]
    async fn test_mint_failure_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
            })))
            .expect(2)
            .mount(&server)
            .await;
        let store = Arc::new(InMemoryTokenStore::new());
        let cache = cache_for(&server, store.clone());

        assert!(cache.get_token().await.is_err());
        assert!(cache.get_token().await.is_err());
        assert!(store.get().await.is_none());
    }
}
