use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Requests older than this are treated as replays.
const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

pub fn verify_slack_signature_at(
    signing_secret: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
    now: i64,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    // Replay protection
    let Ok(request_timestamp) = timestamp.parse::<i64>() else {
        return Ok(false);
    };
    if (now - request_timestamp).abs() > MAX_REQUEST_AGE_SECS {
        return Ok(false);
    }

    let Some(expected) = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
    else {
        return Ok(false);
    };

    let sig_basestring = format!("v0:{}:{}", timestamp, body);
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())?;
    mac.update(sig_basestring.as_bytes());

    Ok(mac.verify_slice(&expected).is_ok())
}
