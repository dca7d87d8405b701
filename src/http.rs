//! HTTP client wrapper for the portal's legacy endpoints

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::parser;

/// User agent matching the reference client; kept so the portal serves
/// the same login page variant it serves browsers.
const PORTAL_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Ubuntu Chromium/76.0.3809.100 Chrome/76.0.3809.100 Safari/537.36";

pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Build a client with the portal's expected headers. Certificate
    /// verification is disabled: campus portals routinely serve
    /// self-signed or expired certificates and the reference client
    /// ignores them too.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(PORTAL_USER_AGENT));

        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { inner: client })
    }

    /// GET a page body, requiring a success status.
    pub async fn get_text(&self, url: &str) -> reqwest::Result<String> {
        self.inner
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Issue a JSONP GET: append a generated callback parameter, strip
    /// the `callback(...)` envelope and parse the JSON body.
    pub async fn get_jsonp(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        let callback = jsonp_callback();
        let body = self
            .inner
            .get(url)
            .query(params)
            .query(&[("callback", callback.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parser::unwrap_jsonp(&body, &callback)?)
    }

    /// Reachability probe: true iff the URL answers 200 within the
    /// timeout.
    pub async fn probe(&self, url: &str) -> bool {
        match self.inner.get(url).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

/// Millisecond Unix timestamp, used for the `_` cache buster and the
/// JSONP callback name.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Callback names mirror the jQuery pattern the portal's own login page
/// generates.
fn jsonp_callback() -> String {
    format!("jQuery112406951885120277062_{}", unix_millis())
}
