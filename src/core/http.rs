use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "BepInExManager/0.1.0";

/// Shared client for the release feed and asset downloads.
///
/// GitHub rejects API requests without a user agent, and identity encoding
/// keeps `Content-Length` meaningful for download progress.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Client for tests that talk to a stub server on loopback; ignores proxy env.
#[cfg(test)]
pub(crate) fn build_loopback_client() -> Client {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .no_proxy()
        .build()
        .unwrap()
}
