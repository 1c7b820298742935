//! MSC3886 simple HTTP rendezvous transport.
//!
//! # Feature Flags
//!
//! Requires the `http-transport` feature (enabled by default).
//!
//! # Wire Contract
//!
//! | Operation  | Request                                  | Outcome                               |
//! |------------|------------------------------------------|---------------------------------------|
//! | `create`   | `POST base_url`                          | `Location` header names the resource  |
//! | `get`      | `GET url`, `If-None-Match: etag`         | 200 new data, 304 unchanged, 404 gone |
//! | `send`     | `PUT url`, `If-Match: etag`              | new `ETag`                            |
//! | `tear_down`| `DELETE url`                             | resource removed                      |
//!
//! # Example
//!
//! ```rust,ignore
//! use rendezvous_lib::transport::{HttpRendezvousTransport, HttpTransportConfig};
//!
//! let config = HttpTransportConfig::new("https://rz.example.org/rendezvous");
//!
//! // Creator: the URL is assigned by the server on create
//! let creator = HttpRendezvousTransport::new(config.clone())?;
//!
//! // Joiner: the URL comes from the creator's invite
//! let joiner = HttpRendezvousTransport::with_rendezvous_url(config, &invite_uri)?;
//! ```

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH,
    LOCATION,
};
use reqwest::{StatusCode, Url};
use serde::Serialize;

use super::config::HttpTransportConfig;
use super::traits::RendezvousTransport;
use crate::{TransportError, TransportResult};

const APPLICATION_JSON: &str = "application/json";

/// reqwest-backed [`RendezvousTransport`].
///
/// One instance per rendezvous attempt. Not meant for concurrent use: all
/// mutating operations take `&mut self`.
#[derive(Debug)]
pub struct HttpRendezvousTransport {
    config: HttpTransportConfig,
    base_url: Url,
    client: reqwest::Client,
    rendezvous_url: Option<Url>,
    current_etag: Option<String>,
}

impl HttpRendezvousTransport {
    /// Create a transport that will create its own rendezvous.
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| TransportError::RendezvousUrlInvalid)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            base_url,
            client,
            rendezvous_url: None,
            current_etag: None,
        })
    }

    /// Create a transport bound to an existing rendezvous, as a joiner does
    /// after reading the creator's invite.
    pub fn with_rendezvous_url(
        config: HttpTransportConfig,
        rendezvous_url: &str,
    ) -> TransportResult<Self> {
        let mut transport = Self::new(config)?;
        let url = transport
            .base_url
            .join(rendezvous_url)
            .map_err(|_| TransportError::RendezvousUrlInvalid)?;
        transport.set_rendezvous_url(Some(url));
        Ok(transport)
    }

    /// Get the configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Current cache validator, if any.
    pub fn current_etag(&self) -> Option<&str> {
        self.current_etag.as_deref()
    }

    /// Forget the rendezvous URL (and with it the ETag) without contacting
    /// the server.
    pub fn reset(&mut self) {
        self.set_rendezvous_url(None);
    }

    fn set_rendezvous_url(&mut self, url: Option<Url>) {
        self.rendezvous_url = url;
        self.current_etag = None;
    }

    fn require_url(&self) -> TransportResult<Url> {
        self.rendezvous_url
            .clone()
            .ok_or(TransportError::RendezvousUrlInvalid)
    }

    fn adopt_etag(&mut self, headers: &HeaderMap) {
        if let Some(etag) = header_string(headers, ETAG) {
            self.current_etag = Some(etag);
        }
    }

    fn encode<T: Serialize + ?Sized>(body: &T) -> TransportResult<Vec<u8>> {
        serde_json::to_vec(body).map_err(TransportError::from)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RendezvousTransport for HttpRendezvousTransport {
    fn rendezvous_url(&self) -> Option<&str> {
        self.rendezvous_url.as_ref().map(Url::as_str)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, body)))]
    async fn create<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let payload = Self::encode(body)?;

        let response = self
            .client
            .post(self.base_url.clone())
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let location = header_string(response.headers(), LOCATION)
            .ok_or_else(|| TransportError::Network("response has no Location header".into()))?;
        let url = self
            .base_url
            .join(&location)
            .map_err(|e| TransportError::Network(format!("invalid Location '{location}': {e}")))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(rendezvous_url = %url, "rendezvous created");

        self.set_rendezvous_url(Some(url));
        self.adopt_etag(response.headers());
        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn get(&mut self) -> TransportResult<Vec<u8>> {
        let url = self.require_url()?;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .header(CACHE_CONTROL, "no-cache");
            if let Some(etag) = &self.current_etag {
                request = request.header(IF_NONE_MATCH, etag.as_str());
            }

            let response = request.send().await.map_err(map_reqwest_error)?;

            match response.status() {
                StatusCode::NOT_MODIFIED => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("rendezvous unchanged, polling again");
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
                StatusCode::NOT_FOUND => return Err(TransportError::RendezvousCancelled),
                status if status.is_success() => {
                    let etag = header_string(response.headers(), ETAG);
                    let body = response.bytes().await.map_err(map_reqwest_error)?;
                    if etag.is_some() {
                        self.current_etag = etag;
                    }
                    return Ok(body.to_vec());
                }
                status => return Err(map_status_error(status)),
            }
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, body)))]
    async fn send<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = self.require_url()?;
        let payload = Self::encode(body)?;

        let mut request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .body(payload);
        if let Some(etag) = &self.current_etag {
            request = request.header(IF_MATCH, etag.as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        self.adopt_etag(response.headers());
        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn tear_down(&mut self) -> TransportResult<()> {
        let url = self.require_url()?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        self.reset();
        Ok(())
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value: &HeaderValue| value.to_str().ok())
        .map(str::to_string)
}

/// Map HTTP status codes to TransportError.
fn map_status_error(status: StatusCode) -> TransportError {
    match status {
        StatusCode::NOT_FOUND => TransportError::RendezvousCancelled,
        StatusCode::PRECONDITION_FAILED => {
            TransportError::Network("rendezvous was modified concurrently (412)".to_string())
        }
        _ => TransportError::Network(format!("unexpected response status {status}")),
    }
}

/// Map reqwest errors to TransportError.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Network(format!("request timed out: {e}"))
    } else if e.is_connect() {
        TransportError::Network(format!("connection failed: {e}"))
    } else {
        TransportError::Network(format!("request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_url_before_use() {
        let transport =
            HttpRendezvousTransport::new(HttpTransportConfig::new("https://rz.example.org/rz"))
                .unwrap();
        assert!(transport.rendezvous_url().is_none());
        assert_eq!(
            transport.require_url().unwrap_err(),
            TransportError::RendezvousUrlInvalid
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpRendezvousTransport::new(HttpTransportConfig::new("not a url"));
        assert_eq!(result.unwrap_err(), TransportError::RendezvousUrlInvalid);
    }

    #[test]
    fn test_joiner_url_resolution() {
        let config = HttpTransportConfig::new("https://rz.example.org/api/rendezvous");

        let absolute =
            HttpRendezvousTransport::with_rendezvous_url(config.clone(), "https://other.example/abc")
                .unwrap();
        assert_eq!(absolute.rendezvous_url(), Some("https://other.example/abc"));

        let relative =
            HttpRendezvousTransport::with_rendezvous_url(config, "/api/rendezvous/xyz").unwrap();
        assert_eq!(
            relative.rendezvous_url(),
            Some("https://rz.example.org/api/rendezvous/xyz")
        );
        assert!(relative.current_etag().is_none());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut transport = HttpRendezvousTransport::with_rendezvous_url(
            HttpTransportConfig::new("https://rz.example.org"),
            "https://rz.example.org/1",
        )
        .unwrap();
        transport.current_etag = Some("\"1\"".to_string());

        transport.reset();
        assert!(transport.rendezvous_url().is_none());
        assert!(transport.current_etag().is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_status_error(StatusCode::NOT_FOUND),
            TransportError::RendezvousCancelled
        );
        assert!(matches!(
            map_status_error(StatusCode::PRECONDITION_FAILED),
            TransportError::Network(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::INTERNAL_SERVER_ERROR),
            TransportError::Network(_)
        ));
    }
}
