//! Hand-off of payloads to the companion app.
//!
//! ## Endpoints
//!
//! - `POST /single` - one intercepted download
//! - `POST /batch` - links extracted from a page
//!
//! Each payload gets exactly one attempt. If the companion app cannot be
//! reached the user sees one notification and the payload is dropped. Any HTTP
//! response counts as delivered; its status and body carry no contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ConfigCache;
use crate::error::{Result, TransportError};
use crate::notifications::{Notification, Notifier};

/// Default companion host (localhost only).
pub const DEFAULT_COMPANION_HOST: &str = "localhost";

/// Companion app endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// A single intercepted download.
    Single,
    /// A batch of extracted links.
    Batch,
}

impl Endpoint {
    /// Returns the URL path for this endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Single => "/single",
            Self::Batch => "/batch",
        }
    }
}

/// Builds `http://{host}:{port}{path}`.
pub fn endpoint_url(host: &str, port: u16, endpoint: Endpoint) -> String {
    format!("http://{}:{}{}", host, port, endpoint.path())
}

/// HTTP POST of a JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` to `url` and returns the response status.
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<u16, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client. No `User-Agent` is set;
    /// the browser's agent travels in the payload instead.
    pub fn new() -> std::result::Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<u16, TransportError> {
        let response = self.client.post(url).json(body).send().await?;
        Ok(response.status().as_u16())
    }
}

/// What happened to a forwarded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The companion app answered.
    Delivered {
        /// HTTP status of the answer.
        status: u16,
    },
    /// The companion app was not reachable; the user was notified.
    Unreachable,
}

impl SendOutcome {
    /// Returns true if the companion app answered.
    pub fn was_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }
}

/// Posts payloads to the companion app.
#[derive(Clone)]
pub struct Forwarder {
    config: ConfigCache,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    host: String,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("host", &self.host)
            .field("config", &self.config)
            .finish()
    }
}

impl Forwarder {
    /// Creates a forwarder targeting [`DEFAULT_COMPANION_HOST`].
    pub fn new(
        config: ConfigCache,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            transport,
            notifier,
            host: DEFAULT_COMPANION_HOST.to_string(),
        }
    }

    /// Sets the companion host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Returns the companion host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Sends `payload` to `endpoint`.
    ///
    /// Transport failures are reported to the user and come back as
    /// [`SendOutcome::Unreachable`]; only store and serialization failures are
    /// returned as errors.
    pub async fn send<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        endpoint: Endpoint,
    ) -> Result<SendOutcome> {
        let port = self.config.refresh_port().await?;
        let url = endpoint_url(&self.host, port, endpoint);
        let body = serde_json::to_value(payload)?;

        debug!(%url, "Forwarding payload to companion app");

        match self.transport.post_json(&url, &body).await {
            Ok(status) => {
                info!(%url, status, "Companion app accepted payload");
                Ok(SendOutcome::Delivered { status })
            }
            Err(e) => {
                warn!(%url, error = %e, "Companion app unreachable");
                let result = self.notifier.notify(&Notification::companion_unreachable());
                if !result.was_sent() {
                    warn!(?result, "Failed to show unreachable notification");
                }
                Ok(SendOutcome::Unreachable)
            }
        }
    }
}
