// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create the session client used for logins and list pages.
///
/// Cookies persist across requests so a login carries over to the lists.
pub fn create_session_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(
            config.connect_timeout_secs + config.read_timeout_secs,
        ))
        .build()?;
    Ok(client)
}

/// Create the client used for webhook delivery.
pub fn create_notify_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.notify_timeout_secs))
        .build()?;
    Ok(client)
}
