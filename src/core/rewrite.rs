//! Redirect rewriting for proxied responses.
//!
//! Backends behind the gateway issue redirects that point at their own
//! internal address (`Location: http://blogs-service:8081/...`), which is
//! unreachable from outside the network. For any response in the redirect
//! class whose `Location` contains the literal target host string, the first
//! occurrence of that exact substring is replaced with the gateway's public
//! address. Precondition: the match is an exact host substring; anything
//! else in the header is left byte-for-byte untouched.
use http::{HeaderMap, HeaderValue, StatusCode, header};
use url::Url;

/// The `host[:port]` of a target origin as it appears inside URLs, with the
/// port included only when the origin declared one explicitly.
pub fn host_with_port(origin: &Url) -> String {
    match (origin.host_str(), origin.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Rewrite the first occurrence of `target_host` in a `Location` value to
/// `public_addr`. Returns `None` when the value does not contain the target
/// host (the no-match case leaves the header alone).
pub fn rewrite_location(location: &str, target_host: &str, public_addr: &str) -> Option<String> {
    if target_host.is_empty() || !location.contains(target_host) {
        return None;
    }
    Some(location.replacen(target_host, public_addr, 1))
}

/// Apply the rewrite rule to a response's headers when the status falls in
/// the redirect class (300-399).
pub fn rewrite_redirect_headers(
    status: StatusCode,
    headers: &mut HeaderMap,
    target: &Url,
    public_addr: &str,
) {
    if !status.is_redirection() {
        return;
    }

    let target_host = host_with_port(target);
    let Some(location) = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()) else {
        return;
    };

    if let Some(rewritten) = rewrite_location(location, &target_host, public_addr) {
        match HeaderValue::from_str(&rewritten) {
            Ok(value) => {
                tracing::debug!(from = %location, to = %rewritten, "rewrote redirect Location");
                headers.insert(header::LOCATION, value);
            }
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "rewritten Location is not a valid header value, leaving original");
            }
        }
    }
}
