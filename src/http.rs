//! Shared HTTP transport with retry, timeout and session cookies
//!
//! One [`ResilientHttpClient`] is built per remote service per pipeline run and
//! shared (behind `Arc`) by every concurrent worker of a stage. The underlying
//! `reqwest::Client` pools connections; the session token is swapped behind a
//! lock so workers always see the latest one.

use std::sync::RwLock;

use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::SessionToken;

/// Fully read response of a successful request
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8 (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Consume the response, keeping the body
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// HTTP client applying the configured retry policy to every GET
pub struct ResilientHttpClient {
    client: reqwest::Client,
    retry: RetryConfig,
    transient_statuses: Vec<u16>,
    session: RwLock<SessionToken>,
}

impl ResilientHttpClient {
    /// Build a client from transport and retry settings
    pub fn new(http: &HttpConfig, retry: &RetryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(language) = &http.accept_language {
            let value = HeaderValue::from_str(language)
                .map_err(|e| Error::config(format!("invalid accept language: {e}"), "http.accept_language"))?;
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .user_agent(http.user_agent.clone())
            .default_headers(headers)
            .pool_max_idle_per_host(http.pool_size)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: retry.clone(),
            transient_statuses: http.transient_statuses.clone(),
            session: RwLock::new(SessionToken::default()),
        })
    }

    /// Persist session cookies for all later requests of this run
    pub fn set_session(&self, token: &SessionToken) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = token.clone();
    }

    /// Current session cookies
    pub fn session(&self) -> SessionToken {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// GET with the stored session
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse> {
        let cookie = self.session().cookie_header();
        self.get_with_cookie(url, query, cookie.as_deref()).await
    }

    /// GET with an explicit, not yet persisted, session (used to validate a candidate token)
    pub async fn get_as(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &SessionToken,
    ) -> Result<HttpResponse> {
        let cookie = token.cookie_header();
        self.get_with_cookie(url, query, cookie.as_deref()).await
    }

    /// GET and parse the body as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.get(url, query).await?.json()
    }

    async fn get_with_cookie(
        &self,
        url: &str,
        query: &[(&str, String)],
        cookie: Option<&str>,
    ) -> Result<HttpResponse> {
        with_retry(&self.retry, || self.send_once(url, query, cookie)).await
    }

    async fn send_once(
        &self,
        url: &str,
        query: &[(&str, String)],
        cookie: Option<&str>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.get(url).query(query);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        tracing::debug!(url = %url, "GET");
        let response = request.send().await?;
        let status = response.status().as_u16();

        if self.transient_statuses.contains(&status) {
            return Err(Error::TransientStatus {
                status,
                url: url.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            url: final_url,
            status,
            body,
        })
    }
}
