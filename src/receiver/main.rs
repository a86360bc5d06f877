use std::sync::Arc;

use async_trait::async_trait;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::{info, warn};

#[path = "../envelope.rs"]
mod envelope;
mod slack;
mod types;

use types::{InteractionForm, InteractionSummary};

/// Where verified payloads go once they are encoded.
#[async_trait]
trait Publish: Send + Sync {
    async fn publish(&self, message: String) -> Result<(), Error>;
}

struct SnsPublisher {
    sns: aws_sdk_sns::Client,
    topic_arn: String,
}

#[async_trait]
impl Publish for SnsPublisher {
    async fn publish(&self, message: String) -> Result<(), Error> {
        self.sns
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message)
            .send()
            .await?;

        Ok(())
    }
}

struct Receiver<P> {
    publisher: P,
    signing_secret: String,
}

fn respond(status: u16, text: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Body::from(text.to_string()))?)
}

fn header<'a>(event: &'a Request, name: &str) -> &'a str {
    event
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn function_handler<P: Publish>(
    event: Request,
    receiver: &Receiver<P>,
) -> Result<Response<Body>, Error> {
    handle_at(&event, receiver, chrono::Utc::now().timestamp()).await
}

async fn handle_at<P: Publish>(
    event: &Request,
    receiver: &Receiver<P>,
    now: i64,
) -> Result<Response<Body>, Error> {
    let Ok(body_string) = std::str::from_utf8(event.body()) else {
        return respond(400, "Body is not UTF-8");
    };

    // Verify Slack signature
    if !slack::verify_slack_signature_at(
        &receiver.signing_secret,
        body_string,
        header(event, "X-Slack-Request-Timestamp"),
        header(event, "X-Slack-Signature"),
        now,
    )? {
        warn!("rejected request with invalid slack signature");
        return respond(401, "Unauthorized");
    }

    // Parse form data
    let Ok(form) = serde_urlencoded::from_str::<InteractionForm>(body_string) else {
        return respond(400, "Missing payload");
    };
    let Ok(summary) = serde_json::from_str::<InteractionSummary>(&form.payload) else {
        return respond(400, "Malformed payload");
    };
    info!(
        kind = summary.kind.as_deref().unwrap_or("unknown"),
        callback_id = summary.callback_id.as_deref().unwrap_or("unknown"),
        "forwarding interaction"
    );

    receiver
        .publisher
        .publish(envelope::encode_payload(&form.payload))
        .await?;

    // Dialog submissions must be acknowledged with an empty 200
    Ok(Response::builder().status(200).body(Body::Empty)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::load_from_env().await;
    let receiver = Arc::new(Receiver {
        publisher: SnsPublisher {
            sns: aws_sdk_sns::Client::new(&config),
            topic_arn: std::env::var("TOPIC_ARN")?,
        },
        signing_secret: std::env::var("SLACK_SIGNING_SECRET")?,
    });

    run(service_fn(|event: Request| {
        let receiver = receiver.clone();
        async move { function_handler(event, &receiver).await }
    }))
    .await
}
