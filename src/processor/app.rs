use serde_json::Value;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::dispatch::{self, Outcome, Workflow};
use crate::error::Result;
use crate::secrets::{CredentialCache, SecretSource};
use crate::slack::SlackClients;

/// Process-lifetime state, built once at cold start and shared by every
/// invocation. Credentials and clients are filled in on first use.
pub struct App<S> {
    config: Config,
    credentials: CredentialCache<S>,
    clients: OnceCell<SlackClients>,
}

impl<S: SecretSource> App<S> {
    pub fn new(config: Config, source: S) -> Self {
        let credentials = CredentialCache::new(source, config.secret_id.clone());
        Self {
            config,
            credentials,
            clients: OnceCell::new(),
        }
    }

    pub async fn clients(&self) -> Result<&SlackClients> {
        self.clients
            .get_or_try_init(|| async {
                let bundle = self.credentials.get().await?;
                SlackClients::from_bundle(&self.config, bundle)
            })
            .await
    }

    pub async fn handle(&self, payload: Value) -> Result<Outcome> {
        let slack = self.clients().await?;
        let wf = Workflow {
            config: &self.config,
            slack,
        };
        dispatch::handle_payload(&wf, payload).await
    }
}
