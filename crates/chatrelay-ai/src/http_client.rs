//! HTTP client shared by the streaming providers.

use std::time::Duration;

use reqwest::Client;

/// When set, system proxy settings are ignored for backend calls.
const DISABLE_SYSTEM_PROXY_ENV: &str = "CHATRELAY_DISABLE_SYSTEM_PROXY";

pub(crate) const USER_AGENT: &str = concat!("chatrelay/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Client for long-lived streaming responses.
///
/// Only connecting is bounded here. A completion may stream for minutes and
/// the relay enforces its own overall deadline per connection.
pub(crate) fn build_streaming_client() -> Client {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE);
    if system_proxy_disabled() {
        builder = builder.no_proxy();
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Failed to configure streaming HTTP client, using defaults");
        Client::new()
    })
}

fn system_proxy_disabled() -> bool {
    cfg!(test) || std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some()
}
