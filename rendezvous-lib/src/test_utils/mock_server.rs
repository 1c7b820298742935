//! In-memory MSC3886 server and a transport that talks to it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{RendezvousTransport, TransportError, TransportResult};

/// Base URL rendezvous resources are created under.
pub const DEFAULT_BASE_URL: &str = "https://x";

/// Identifier of the first resource a fresh server hands out.
pub const FIRST_RESOURCE_ID: u64 = 1234;

/// HTTP method of a recorded request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestMethod {
    Post,
    Get,
    Put,
    Delete,
}

/// A request as seen by [`MockRendezvousServer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: RequestMethod,
    /// Target URL; the base URL for `POST`.
    pub url: String,
    /// `If-None-Match` for `GET`, `If-Match` for `PUT`.
    pub precondition: Option<String>,
    /// Status the server answered with.
    pub status: u16,
}

/// What the server answered.
#[derive(Clone, Debug, Default)]
struct MockResponse {
    status: u16,
    location: Option<String>,
    etag: Option<String>,
    body: Vec<u8>,
}

impl MockResponse {
    fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct Resource {
    data: Vec<u8>,
    etag: String,
}

#[derive(Debug)]
struct ServerState {
    next_id: u64,
    next_etag: u64,
    resources: HashMap<String, Resource>,
    requests: Vec<RecordedRequest>,
    injected_failures: VecDeque<u16>,
}

/// Simulated rendezvous server.
///
/// Assigns `<base>/<n>` URLs on `POST`, versions every write with a fresh
/// quoted ETag, answers `304` to a matching `If-None-Match`, `412` to a
/// stale `If-Match` and `404` for anything deleted or never created.
#[derive(Debug)]
pub struct MockRendezvousServer {
    base_url: String,
    state: Mutex<ServerState>,
}

impl MockRendezvousServer {
    /// Create a server under [`DEFAULT_BASE_URL`].
    pub fn new() -> Arc<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a server that assigns URLs under `base_url`.
    pub fn with_base_url(base_url: &str) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(ServerState {
                next_id: FIRST_RESOURCE_ID,
                next_etag: 1,
                resources: HashMap::new(),
                requests: Vec::new(),
                injected_failures: VecDeque::new(),
            }),
        })
    }

    /// Base URL new resources are created under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current payload at `url`, without recording a request.
    pub fn payload(&self, url: &str) -> Option<Vec<u8>> {
        self.state().resources.get(url).map(|r| r.data.clone())
    }

    /// Current ETag at `url`, without recording a request.
    pub fn etag(&self, url: &str) -> Option<String> {
        self.state().resources.get(url).map(|r| r.etag.clone())
    }

    /// Overwrite the payload at `url` out-of-band, as a third party would.
    ///
    /// Ignores preconditions and bumps the ETag. Returns `false` if the
    /// resource does not exist.
    pub fn put(&self, url: &str, data: &[u8]) -> bool {
        let mut state = self.state();
        let etag = state.fresh_etag();
        match state.resources.get_mut(url) {
            Some(resource) => {
                resource.data = data.to_vec();
                resource.etag = etag;
                true
            }
            None => false,
        }
    }

    /// Delete the resource at `url` out-of-band, as an expiring server would.
    pub fn cancel(&self, url: &str) -> bool {
        self.state().resources.remove(url).is_some()
    }

    /// Answer the next request with `status` instead of handling it.
    pub fn fail_next_request(&self, status: u16) {
        self.state().injected_failures.push_back(status);
    }

    /// Number of requests received through transports.
    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Requests with the given method, oldest first.
    pub fn requests_by(&self, method: RequestMethod) -> Vec<RecordedRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Number of live resources.
    pub fn resource_count(&self) -> usize {
        self.state().resources.len()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(
        &self,
        method: RequestMethod,
        url: &str,
        precondition: Option<String>,
        body: Vec<u8>,
    ) -> MockResponse {
        let mut state = self.state();

        let response = match state.injected_failures.pop_front() {
            Some(status) => MockResponse::status(status),
            None => match method {
                RequestMethod::Post => {
                    let location = format!("{}/{}", self.base_url, state.next_id);
                    state.next_id += 1;
                    let etag = state.fresh_etag();
                    state.resources.insert(
                        location.clone(),
                        Resource {
                            data: body,
                            etag: etag.clone(),
                        },
                    );
                    MockResponse {
                        status: 201,
                        location: Some(location),
                        etag: Some(etag),
                        body: Vec::new(),
                    }
                }
                RequestMethod::Get => match state.resources.get(url) {
                    None => MockResponse::status(404),
                    Some(resource) if precondition.as_deref() == Some(resource.etag.as_str()) => {
                        MockResponse::status(304)
                    }
                    Some(resource) => MockResponse {
                        status: 200,
                        location: None,
                        etag: Some(resource.etag.clone()),
                        body: resource.data.clone(),
                    },
                },
                RequestMethod::Put => {
                    let etag = state.fresh_etag();
                    match state.resources.get_mut(url) {
                        None => MockResponse::status(404),
                        Some(resource)
                            if precondition
                                .as_deref()
                                .is_some_and(|expected| expected != resource.etag) =>
                        {
                            MockResponse::status(412)
                        }
                        Some(resource) => {
                            resource.data = body;
                            resource.etag = etag.clone();
                            MockResponse {
                                status: 202,
                                location: None,
                                etag: Some(etag),
                                body: Vec::new(),
                            }
                        }
                    }
                }
                RequestMethod::Delete => match state.resources.remove(url) {
                    Some(_) => MockResponse::status(204),
                    None => MockResponse::status(404),
                },
            },
        };

        state.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
            precondition,
            status: response.status,
        });
        response
    }
}

impl ServerState {
    fn fresh_etag(&mut self) -> String {
        let etag = format!("\"{}\"", self.next_etag);
        self.next_etag += 1;
        etag
    }
}

/// [`RendezvousTransport`] backed by a [`MockRendezvousServer`].
///
/// Follows the same protocol as the HTTP transport: ETag adopted on create
/// and after every successful read or write, polling on `304`.
#[derive(Debug)]
pub struct MemoryRendezvousTransport {
    server: Arc<MockRendezvousServer>,
    poll_interval: Duration,
    rendezvous_url: Option<String>,
    current_etag: Option<String>,
}

impl MemoryRendezvousTransport {
    /// Create a transport with no rendezvous yet.
    pub fn new(server: Arc<MockRendezvousServer>) -> Self {
        Self {
            server,
            poll_interval: Duration::from_secs(1),
            rendezvous_url: None,
            current_etag: None,
        }
    }

    /// Create a transport bound to an existing rendezvous.
    pub fn with_rendezvous_url(server: Arc<MockRendezvousServer>, url: impl Into<String>) -> Self {
        let mut transport = Self::new(server);
        transport.set_rendezvous_url(Some(url.into()));
        transport
    }

    /// Set the delay between polls of an unchanged resource.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Point at a different rendezvous (or none); clears the ETag.
    pub fn set_rendezvous_url(&mut self, url: Option<String>) {
        self.rendezvous_url = url;
        self.current_etag = None;
    }

    /// Current cache validator, if any.
    pub fn current_etag(&self) -> Option<&str> {
        self.current_etag.as_deref()
    }

    /// The server this transport talks to.
    pub fn server(&self) -> &Arc<MockRendezvousServer> {
        &self.server
    }

    fn require_url(&self) -> TransportResult<String> {
        self.rendezvous_url
            .clone()
            .ok_or(TransportError::RendezvousUrlInvalid)
    }

    fn adopt_etag(&mut self, etag: Option<String>) {
        if etag.is_some() {
            self.current_etag = etag;
        }
    }
}

fn status_error(status: u16) -> TransportError {
    match status {
        404 => TransportError::RendezvousCancelled,
        412 => TransportError::Network("rendezvous was modified concurrently (412)".to_string()),
        _ => TransportError::Network(format!("unexpected response status {status}")),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl RendezvousTransport for MemoryRendezvousTransport {
    fn rendezvous_url(&self) -> Option<&str> {
        self.rendezvous_url.as_deref()
    }

    async fn create<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let payload = serde_json::to_vec(body)?;
        let base_url = self.server.base_url().to_string();
        let response = self
            .server
            .handle(RequestMethod::Post, &base_url, None, payload);
        if !is_success(response.status) {
            return Err(status_error(response.status));
        }

        let location = response
            .location
            .ok_or_else(|| TransportError::Network("response has no Location header".into()))?;
        self.set_rendezvous_url(Some(location));
        self.adopt_etag(response.etag);
        Ok(())
    }

    async fn get(&mut self) -> TransportResult<Vec<u8>> {
        let url = self.require_url()?;

        loop {
            let response =
                self.server
                    .handle(RequestMethod::Get, &url, self.current_etag.clone(), Vec::new());

            match response.status {
                304 => tokio::time::sleep(self.poll_interval).await,
                status if is_success(status) => {
                    self.adopt_etag(response.etag);
                    return Ok(response.body);
                }
                status => return Err(status_error(status)),
            }
        }
    }

    async fn send<T>(&mut self, body: &T) -> TransportResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = self.require_url()?;
        let payload = serde_json::to_vec(body)?;

        let response =
            self.server
                .handle(RequestMethod::Put, &url, self.current_etag.clone(), payload);
        if !is_success(response.status) {
            return Err(status_error(response.status));
        }

        self.adopt_etag(response.etag);
        Ok(())
    }

    async fn tear_down(&mut self) -> TransportResult<()> {
        let url = self.require_url()?;

        let response = self
            .server
            .handle(RequestMethod::Delete, &url, None, Vec::new());
        if !is_success(response.status) {
            return Err(status_error(response.status));
        }

        self.set_rendezvous_url(None);
        Ok(())
    }
}
