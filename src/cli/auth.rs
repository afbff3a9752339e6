use sheets_edge_client::auth::TokenCache;
use sheets_edge_client::config::Config;
use sheets_edge_client::error::Result;
use sheets_edge_client::sheets::{SheetsClient, SheetsError};
use tracing::info;

pub async fn execute(reset: bool) -> Result<()> {
    let config = Config::load()?;
    let client = SheetsClient::new(&config)?;

    authenticate(client.tokens(), reset).await?;

    info!(
        client_email = %config.google.client_email,
        "Service account authentication verified"
    );

    Ok(())
}

async fn authenticate(tokens: &TokenCache, reset: bool) -> Result<()> {
    if reset {
        tokens.clear().await;
    }

    tokens.get_token().await.map_err(SheetsError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheets_edge_client::auth::{
        CachedToken, InMemoryTokenStore, ServiceAccountCredentials, TokenMinter, TokenStore,
    };
    use sheets_edge_client::error::AppError;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_PRIVATE_KEY: &str = include_str!("../auth/testdata/test_key.pem");

    async fn cache_with_cached_token(server: &MockServer) -> (TokenCache, Arc<InMemoryTokenStore>) {
        let store = Arc::new(InMemoryTokenStore::new());
        store
            .set(CachedToken {
                access_token: "ya29.cached".to_string(),
                expires_at_ms: chrono::Utc::now().timestamp_millis() + 3600 * 1000,
            })
            .await;

        let minter = TokenMinter::new(
            ServiceAccountCredentials::new(
                "edge-worker@test-project.iam.gserviceaccount.com",
                TEST_PRIVATE_KEY,
            ),
            format!("{}/token", server.uri()),
            reqwest::Client::new(),
        );
        (TokenCache::new(minter).with_store(store.clone()), store)
    }

    #[tokio::test]
    async fn test_authenticate_reuses_cached_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let (tokens, _) = cache_with_cached_token(&server).await;

        authenticate(&tokens, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_forces_a_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.reminted",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (tokens, store) = cache_with_cached_token(&server).await;

        authenticate(&tokens, true).await.unwrap();

        assert_eq!(store.get().await.unwrap().access_token, "ya29.reminted");
    }

    #[tokio::test]
    async fn test_rejected_grant_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;
        let (tokens, _) = cache_with_cached_token(&server).await;

        let err = authenticate(&tokens, true).await.unwrap_err();

        match err {
            AppError::Sheets(e) => assert_eq!(e.code().as_str(), "TOKEN_EXCHANGE_FAILED"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
