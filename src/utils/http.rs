use std::time::Duration;

use reqwest::Client;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared client for both upstream providers; the per-request deadline is
/// enforced separately by the pipeline.
pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("ui-palette-advisor/", env!("CARGO_PKG_VERSION")))
        .build()
}
