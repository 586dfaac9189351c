use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use std::time::Duration;

use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking JSON client for one hosted service.
pub struct ApiClient {
    client: Client,
    service: &'static str,
}

impl ApiClient {
    /// Builds a client that sends `auth_header: auth_value` on every request.
    pub fn new(service: &'static str, auth_header: HeaderName, auth_value: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(auth_value)
            .map_err(|_| Error::InvalidConfig(format!("{} API key is not a valid header", service)))?;
        value.set_sensitive(true);
        headers.insert(auth_header, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(TIMEOUT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, service })
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.send(self.client.get(url), "GET", url)?;
        self.decode(&text)
    }

    pub fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let text = self.send(self.client.post(url).json(body), "POST", url)?;
        self.decode(&text)
    }

    /// Posts `body` and returns the raw response text, for endpoints that do not answer in JSON.
    pub fn post_text<B: Serialize>(&self, url: &str, body: &B) -> Result<String> {
        self.send(self.client.post(url).json(body), "POST", url)
    }

    fn send(&self, request: RequestBuilder, method: &str, url: &str) -> Result<String> {
        tracing::debug!(service = self.service, "{} {}", method, url);
        let resp = request.send()?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Service {
                service: self.service,
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        from_str::<T>(text).map_err(|source| Error::Decode {
            service: self.service,
            source,
            body: text.to_string(),
        })
    }
}
