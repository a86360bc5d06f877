use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{ModerationError, Result};

/// Slack tokens keyed by name, as stored in one Secrets Manager JSON secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretBundle(HashMap<String, String>);

impl SecretBundle {
    pub fn parse(secret_id: &str, secret_string: &str) -> Result<Self> {
        serde_json::from_str(secret_string)
            .map(Self)
            .map_err(|e| ModerationError::SecretFetch {
                secret_id: secret_id.to_string(),
                reason: format!("secret is not a JSON object of strings: {e}"),
            })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, secret_id: &str) -> Result<SecretBundle>;
}

pub struct SecretsManagerSource {
    client: SecretsManagerClient,
}

impl SecretsManagerSource {
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: SecretsManagerClient::new(&config),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn fetch(&self, secret_id: &str) -> Result<SecretBundle> {
        let fetch_error = |reason: String| ModerationError::SecretFetch {
            secret_id: secret_id.to_string(),
            reason,
        };

        info!(secret_id, "fetching slack tokens");
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let secret_string = response
            .secret_string()
            .ok_or_else(|| fetch_error("secret has no string value".to_string()))?;
        SecretBundle::parse(secret_id, secret_string)
    }
}

/// Fetches the secret bundle on first use and keeps it for the life of the
/// process. A failed fetch leaves the cache empty.
pub struct CredentialCache<S> {
    source: S,
    secret_id: String,
    bundle: OnceCell<SecretBundle>,
}

impl<S: SecretSource> CredentialCache<S> {
    pub fn new(source: S, secret_id: impl Into<String>) -> Self {
        Self {
            source,
            secret_id: secret_id.into(),
            bundle: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&SecretBundle> {
        self.bundle
            .get_or_try_init(|| self.source.fetch(&self.secret_id))
            .await
    }
}
