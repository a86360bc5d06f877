mod app;
mod compose;
mod config;
mod dispatch;
#[path = "../envelope.rs"]
mod envelope;
mod error;
mod handlers;
mod permalink;
mod secrets;
mod slack;
#[cfg(test)]
mod testing;
mod types;
mod workflow;

use std::sync::Arc;

use aws_lambda_events::event::sns::SnsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use app::App;
use config::Config;
use error::ModerationError;
use secrets::{SecretSource, SecretsManagerSource};

/// Decodes every record of an SNS delivery, in order.
fn decode_envelope(event: &SnsEvent) -> Result<Vec<Value>, ModerationError> {
    event
        .records
        .iter()
        .map(|record| envelope::decode_payload(&record.sns.message).map_err(ModerationError::from))
        .collect()
}

async fn function_handler<S: SecretSource>(
    event: LambdaEvent<SnsEvent>,
    app: &App<S>,
) -> Result<(), Error> {
    let payloads = decode_envelope(&event.payload)?;
    if payloads.is_empty() {
        warn!("SNS event carried no records");
    }

    for payload in payloads {
        debug!(%payload, "payload");
        match app.handle(payload).await {
            Ok(outcome) => info!(?outcome, "workflow complete"),
            Err(err) => {
                error!(error = %err, "workflow failed");
                return Err(err.into());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    info!(moderator_channel = %config.moderator_channel, "starting moderation processor");
    let app = Arc::new(App::new(config, SecretsManagerSource::from_env().await));

    run(service_fn(|event: LambdaEvent<SnsEvent>| {
        let app = app.clone();
        async move { function_handler(event, &app).await }
    }))
    .await
}
