// src/services/fetcher.rs

//! Authenticated page fetching.
//!
//! One cookie-carrying session serves the logins and every list page, so a
//! portal login made at startup covers the whole run.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, info};
use url::Url;

use crate::error::{AuthError, FetchError, Result};
use crate::models::{ContentKind, HttpConfig, LoginConfig, normalize_content_type};
use crate::services::login::build_login_form;
use crate::utils::http;
use crate::utils::retry::{Attempt, BackoffPolicy, retry};

/// A successfully fetched list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// Media type without parameters, lowercased
    pub content_type: String,
    pub kind: ContentKind,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>, content_type: &str) -> Self {
        Self {
            url: url.into(),
            status,
            body,
            content_type: normalize_content_type(content_type),
            kind: ContentKind::from_content_type(content_type),
        }
    }
}

/// Session-aware page source.
#[async_trait]
pub trait AuthenticatedFetcher: Send + Sync {
    /// Log into a portal; disabled logins are no-ops.
    async fn login(&self, login: &LoginConfig) -> std::result::Result<(), AuthError>;

    /// Fetch a page, retrying transient failures.
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError>;
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    policy: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_session_client(config)?,
            policy: BackoffPolicy::from_config(config),
        })
    }

    /// One GET, classified for the retry loop.
    async fn attempt(
        &self,
        url: &str,
        attempt: u32,
    ) -> std::result::Result<FetchedPage, Attempt<FetchError>> {
        debug!(url, attempt, max_attempts = self.policy.max_attempts, "Fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(FetchError::from_transport(url, &e)))?;

        let status = response.status();
        let failure = FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
        if is_transient(status) {
            return Err(Attempt::Retryable(failure));
        }
        if !status.is_success() {
            return Err(Attempt::Fatal(failure));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| Attempt::Retryable(FetchError::from_transport(url, &e)))?;

        Ok(FetchedPage::new(
            final_url,
            status.as_u16(),
            body.to_vec(),
            &content_type,
        ))
    }
}

/// Server errors and rate limiting are worth another attempt.
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl AuthenticatedFetcher for HttpFetcher {
    async fn login(&self, login: &LoginConfig) -> std::result::Result<(), AuthError> {
        if !login.enabled {
            debug!(url = %login.url, "Login disabled, skipping");
            return Ok(());
        }

        info!(url = %login.url, "Logging in");
        let unreachable = |e: reqwest::Error| AuthError::Unreachable {
            url: login.url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&login.url)
            .send()
            .await
            .map_err(unreachable)?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                url: login.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let page_url: Url = response.url().clone();
        let html = response.text().await.map_err(unreachable)?;
        let form = build_login_form(&html, &page_url, login).ok_or_else(|| {
            AuthError::FormNotFound {
                url: page_url.to_string(),
            }
        })?;

        debug!(action = %form.action, fields = ?form.field_names(), "Submitting login form");
        let response = self
            .client
            .post(&form.action)
            .form(&form.fields)
            .send()
            .await
            .map_err(unreachable)?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                url: form.action.clone(),
                status: response.status().as_u16(),
            });
        }

        info!(url = %login.url, "Login submitted");
        Ok(())
    }

    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        retry(&self.policy, |attempt| self.attempt(url, attempt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_server::{Canned, MockServer};

    fn quick_retries(max_retries: u32) -> HttpFetcher {
        HttpFetcher::new(&HttpConfig {
            max_retries,
            initial_backoff_secs: 0.0,
            ..HttpConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::FORBIDDEN));
        assert!(!is_transient(StatusCode::OK));
    }

    #[test]
    fn test_fetched_page_resolves_kind_once() {
        let page = FetchedPage::new(
            "https://example.com/0",
            200,
            b"%PDF-1.4".to_vec(),
            "Application/PDF; name=liste.pdf",
        );
        assert_eq!(page.kind, ContentKind::Pdf);
        assert_eq!(page.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_attempt_classifies_statuses() {
        let server = MockServer::start(vec![
            Canned::new(503, "text/plain", "busy"),
            Canned::new(404, "text/plain", "gone"),
            Canned::new(200, "text/html; charset=utf-8", "<p>1 A1234</p>"),
        ])
        .await;
        let fetcher = quick_retries(3);
        let url = server.url("/liste/0");

        let busy = fetcher.attempt(&url, 1).await.unwrap_err();
        assert!(matches!(busy, Attempt::Retryable(FetchError::Status { status: 503, .. })));

        let gone = fetcher.attempt(&url, 1).await.unwrap_err();
        assert!(matches!(gone, Attempt::Fatal(FetchError::Status { status: 404, .. })));

        let page = fetcher.attempt(&url, 1).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.kind, ContentKind::Html);
        assert_eq!(page.content_type, "text/html");
        assert_eq!(page.body, b"<p>1 A1234</p>");
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let server = MockServer::start(vec![
            Canned::new(502, "text/plain", "bad gateway"),
            Canned::new(200, "application/pdf", "%PDF-1.4"),
        ])
        .await;
        let fetcher = quick_retries(3);

        let page = fetcher.fetch(&server.url("/liste/0")).await.unwrap();
        assert_eq!(page.kind, ContentKind::Pdf);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_gives_up() {
        let server = MockServer::start(vec![Canned::new(500, "text/plain", "down")]).await;
        let fetcher = quick_retries(2);
        let err = fetcher.fetch(&server.url("/liste/0")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(server.requests().len(), 2);

        let server = MockServer::start(vec![Canned::new(403, "text/plain", "no")]).await;
        let err = fetcher.fetch(&server.url("/liste/0")).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_login_is_noop() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let login = LoginConfig {
            url: "http://127.0.0.1:9/login".into(),
            username: "u".into(),
            password: "p".into(),
            enabled: false,
            extra: Default::default(),
        };
        assert!(fetcher.login(&login).await.is_ok());
    }
}
