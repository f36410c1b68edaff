//! Download interception.
//!
//! Runs on every native download at the moment the browser asks for a final
//! filename. The decision is a short state machine:
//!
//! ```text
//! refresh enabled ─┬─ disabled / image ──────────────▶ PassThrough
//!                  └─ resolve URL ─┬─ not http(s) ───▶ PassThrough
//!                                  └─ suggest cancel
//!                                     cancel, erase
//!                                     POST /single ──▶ Intercepted
//! ```
//!
//! Once the cancel is issued there is no way back: the native download is
//! gone whether or not the companion app answers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConfigCache;
use crate::error::Result;
use crate::forwarder::{Endpoint, Forwarder, SendOutcome};
use crate::host::{DownloadHost, DownloadId, FilenameSuggestion};
use crate::protocol::is_supported_protocol;

/// Download as described by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub id: DownloadId,
    pub url: String,
    /// URL after redirects, when the host knows it.
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub filename: String,
    /// Size in bytes, `-1` when unknown.
    #[serde(default = "unknown_size")]
    pub file_size: i64,
    #[serde(default)]
    pub mime: String,
}

fn unknown_size() -> i64 {
    -1
}

impl DownloadItem {
    /// URL to hand off: the post-redirect URL if present, else the original.
    pub fn effective_url(&self) -> &str {
        self.final_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.url)
    }

    /// Returns true if the declared MIME type mentions an image.
    pub fn is_image(&self) -> bool {
        self.mime.to_ascii_lowercase().contains("image")
    }
}

/// Payload posted to the companion app for one download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDescriptor {
    pub url: String,
    pub filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub agent: String,
}

impl DownloadDescriptor {
    /// Builds the descriptor for `item`, using `url` as the resolved URL.
    pub fn from_item(item: &DownloadItem, url: &str, agent: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            filename: item.filename.clone(),
            file_size: item.file_size,
            mime_type: item.mime.clone(),
            agent: agent.into(),
        }
    }
}

/// Why a download was left to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Interception is turned off.
    Disabled,
    /// Images are always downloaded natively.
    Image,
    /// Not an http(s) URL.
    UnsupportedProtocol,
}

/// Terminal state of one interception attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The native download continues untouched.
    PassThrough(PassReason),
    /// The native download was cancelled and handed off.
    Intercepted(SendOutcome),
}

impl Interception {
    /// Returns true if the download was taken over.
    pub fn was_intercepted(&self) -> bool {
        matches!(self, Interception::Intercepted(_))
    }
}

/// Decides, per native download, whether to hand it off.
#[derive(Clone)]
pub struct DownloadInterceptor {
    config: ConfigCache,
    forwarder: Forwarder,
    host: Arc<dyn DownloadHost>,
}

impl DownloadInterceptor {
    /// Creates an interceptor.
    pub fn new(config: ConfigCache, forwarder: Forwarder, host: Arc<dyn DownloadHost>) -> Self {
        Self {
            config,
            forwarder,
            host,
        }
    }

    /// Handles the host's "determining filename" moment for `item`.
    pub async fn on_determining_filename(&self, item: &DownloadItem) -> Result<Interception> {
        if !self.config.refresh_enabled().await? {
            debug!(id = item.id, "Interception disabled, passing through");
            return Ok(Interception::PassThrough(PassReason::Disabled));
        }

        if item.is_image() {
            debug!(id = item.id, mime = %item.mime, "Image download, passing through");
            return Ok(Interception::PassThrough(PassReason::Image));
        }

        let url = item.effective_url();
        if !is_supported_protocol(Some(url)) {
            debug!(id = item.id, url, "Unsupported protocol, passing through");
            return Ok(Interception::PassThrough(PassReason::UnsupportedProtocol));
        }

        info!(id = item.id, url, "Taking over download");
        self.cancel_native(item).await;

        let descriptor = DownloadDescriptor::from_item(item, url, self.host.user_agent());
        let outcome = self.forwarder.send(&descriptor, Endpoint::Single).await?;
        Ok(Interception::Intercepted(outcome))
    }

    /// Best-effort cancel of the native download. Failures are logged only.
    async fn cancel_native(&self, item: &DownloadItem) {
        let suggestion = FilenameSuggestion::cancelled(item.filename.clone());
        if let Err(e) = self.host.suggest(item.id, suggestion).await {
            warn!(id = item.id, error = %e, "Failed to cancel filename suggestion");
        }

        if let Err(e) = self.host.cancel(item.id).await {
            warn!(id = item.id, error = %e, "Failed to cancel native download");
        }

        if let Err(e) = self.host.erase(item.id).await {
            debug!(id = item.id, error = %e, "Failed to erase download artifact");
        }
    }
}
