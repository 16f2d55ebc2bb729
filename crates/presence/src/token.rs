//! Credential collaborator: trades the long-lived API key for a short-lived
//! streaming token. Any non-2xx is fatal for the attempt; the caller decides
//! whether to retry by re-initializing the presence session.

use async_trait::async_trait;
use rehearse_core::error::CredentialError;
use rehearse_core::presence::TokenProvider;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub struct TokenClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl TokenClient {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct TokenEnvelope {
    data: TokenData,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

#[async_trait]
impl TokenProvider for TokenClient {
    async fn issue(&self) -> Result<String, CredentialError> {
        let url = format!("{}/v1/streaming.create_token", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let reason = resp.text().await.unwrap_or_default();
            return Err(CredentialError::Denied { status, reason });
        }

        let envelope: TokenEnvelope =
            resp.json().await.map_err(|e| CredentialError::Malformed {
                message: e.to_string(),
            })?;
        tracing::debug!("streaming token issued");
        Ok(envelope.data.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_envelope_parses_nested_payload() {
        let envelope: TokenEnvelope =
            serde_json::from_str(r#"{"data":{"token":"abc123","expires_in":600}}"#).unwrap();
        assert_eq!(envelope.data.token, "abc123");
    }

    // Live call against the avatar service. Requires PRESENCE_API_KEY and
    // PRESENCE_API_URL; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn issue_returns_a_token_from_the_live_service() {
        dotenvy::dotenv_override().ok();
        let api_key = std::env::var("PRESENCE_API_KEY").expect("PRESENCE_API_KEY not set");
        let base_url = std::env::var("PRESENCE_API_URL").expect("PRESENCE_API_URL not set");
        let client = TokenClient::new(base_url, SecretString::from(api_key));

        let token = client.issue().await.expect("token issuance failed");
        assert!(!token.is_empty());
    }
}
