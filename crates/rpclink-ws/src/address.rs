//! WebSocket address validation.

use rpclink_core::ConnectionError;
use url::Url;

/// Parse `raw` and check it is a `ws://` or `wss://` URL with a host.
pub fn validate_url(raw: &str) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => {}
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    Ok(parsed)
}

pub fn is_websocket_url(raw: &str) -> bool {
    validate_url(raw).is_ok()
}
