//! Injectable network client.
//!
//! Report dispatch, scheduling, the device directory and route planning only
//! talk to the backend through [`Transport`]. [`HttpTransport`] is the reqwest
//! implementation; tests plug in their own.

use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigError};
use fleet_core::error::error_message_from_body;
use fleet_core::ReportError;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Request(String),
}

/// Representation the caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse a JSON body. An empty body reads as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|err| ClientError::Payload(err.to_string()))
    }

    /// Turn a non-success response into a network failure, preferring a
    /// structured `message` field over the raw body.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ReportError::NetworkFailure {
            status: self.status,
            message: error_message_from_body(&self.text()),
        }
        .into())
    }
}

pub trait Transport: Send + Sync {
    /// GET `path` with the given query pairs (keys may repeat).
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        accept: Accept,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// POST a JSON body to `path`.
    fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// Absolute URL for `path` and `query`, for hand-off to a browser or downloader.
    fn url(&self, path: &str, query: &[(String, String)]) -> Result<String, TransportError>;
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url, TransportError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|_| TransportError::InvalidUrl(raw.clone()))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_token.as_deref() {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, TransportError> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        accept: Accept,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.endpoint(path, query)?;
        tracing::debug!(%url, "GET");
        let mut request = self.client.get(url);
        if accept == Accept::Json {
            request = request.header(ACCEPT, "application/json");
        }
        self.execute(request).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.endpoint(path, &[])?;
        tracing::debug!(%url, "POST");
        let request = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(body);
        self.execute(request).await
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<String, TransportError> {
        self.endpoint(path, query).map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig::default().with_base_url(base)).unwrap()
    }

    #[test]
    fn url_keeps_repeated_keys_in_order() {
        let query = vec![
            ("deviceId".to_string(), "1".to_string()),
            ("deviceId".to_string(), "2".to_string()),
        ];
        let url = transport("http://fleet.local/").url("/api/reports/fuel/xlsx", &query).unwrap();
        assert_eq!(url, "http://fleet.local/api/reports/fuel/xlsx?deviceId=1&deviceId=2");
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let url = transport("http://fleet.local/tracker").url("/api/devices", &[]).unwrap();
        assert_eq!(url, "http://fleet.local/tracker/api/devices");
    }

    #[test]
    fn query_values_are_encoded() {
        let query = vec![("from".to_string(), "2024-01-01T00:00:00+03:00".to_string())];
        let url = transport("http://fleet.local").url("/api/reports/fuel", &query).unwrap();
        assert_eq!(url, "http://fleet.local/api/reports/fuel?from=2024-01-01T00%3A00%3A00%2B03%3A00");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTransport::new(&ClientConfig::default().with_base_url("not a url")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn error_for_status_prefers_message_field() {
        let err = HttpResponse::new(400, r#"{"message":"bad range"}"#)
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.user_message(), "bad range");
        assert_eq!(err.status(), Some(400));

        let err = HttpResponse::new(500, "oops").error_for_status().unwrap_err();
        assert_eq!(err.user_message(), "oops");
    }

    #[test]
    fn empty_body_reads_as_null() {
        let value: Option<Vec<u8>> = HttpResponse::new(200, "  ").json().unwrap();
        assert!(value.is_none());
    }
}
