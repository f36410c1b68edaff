//! BitKip Connector Core - download interception and hand-off pipeline.
//!
//! This crate decides which browser downloads the BitKip companion app takes
//! over and forwards them to it:
//!
//! - Download interception (cancel natively, post to `/single`)
//! - Link-extraction relays from content scripts (post to `/batch`)
//! - Per-tab de-duplication of content-script signals
//! - Cached `port` / `enabled` settings backed by a key/value store
//! - The "Download this link" context menu
//!
//! The browser itself is reached only through the traits in [`host`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use connector_core::{Connector, DesktopNotifier, HttpTransport, MemoryStore};
//! # use connector_core::host::BrowserHost;
//! # async fn run(host: Arc<impl BrowserHost + 'static>) -> connector_core::Result<()> {
//! let connector = Connector::builder(Arc::new(MemoryStore::new()), host)
//!     .transport(Arc::new(HttpTransport::new().expect("HTTP client")))
//!     .notifier(Arc::new(DesktopNotifier::new()))
//!     .build()
//!     .await?;
//!
//! connector.menu().install().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forwarder;
pub mod host;
pub mod interceptor;
pub mod menu;
pub mod notifications;
pub mod protocol;
pub mod router;
pub mod store;
pub mod tabs;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use config::{ConfigCache, DEFAULT_ENABLED, DEFAULT_PORT};
pub use error::{CoreError, HostError, Result, StoreError, TransportError};
pub use forwarder::{Endpoint, Forwarder, HttpTransport, SendOutcome, Transport};
pub use host::{BrowserHost, DownloadId, FilenameSuggestion};
pub use interceptor::{DownloadDescriptor, DownloadInterceptor, DownloadItem, Interception, PassReason};
pub use menu::{ClickInfo, ClickOutcome, ContextMenuController, MenuAction, MenuItem};
pub use notifications::{DesktopNotifier, Notification, NotificationResult, Notifier};
pub use protocol::is_supported_protocol;
pub use router::{Command, ListenerResponse, MessageRouter, MessageSender};
pub use store::{KeyValueStore, MemoryStore, Namespace};
pub use tabs::{TabId, TabSignalTracker};

/// All pipeline components wired to one store and one browser host.
#[derive(Clone)]
pub struct Connector {
    config: ConfigCache,
    forwarder: Forwarder,
    interceptor: DownloadInterceptor,
    router: MessageRouter,
    menu: ContextMenuController,
}

impl Connector {
    /// Starts building a connector.
    pub fn builder<H>(store: Arc<dyn KeyValueStore>, host: Arc<H>) -> ConnectorBuilder<H>
    where
        H: BrowserHost + 'static,
    {
        ConnectorBuilder {
            store,
            host,
            transport: None,
            notifier: None,
            companion_host: None,
        }
    }

    /// Cached settings.
    pub fn config(&self) -> &ConfigCache {
        &self.config
    }

    /// Companion app client.
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Download interception.
    pub fn interceptor(&self) -> &DownloadInterceptor {
        &self.interceptor
    }

    /// Extension message dispatch.
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Context menu.
    pub fn menu(&self) -> &ContextMenuController {
        &self.menu
    }
}

/// Builder for [`Connector`].
pub struct ConnectorBuilder<H> {
    store: Arc<dyn KeyValueStore>,
    host: Arc<H>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    companion_host: Option<String>,
}

impl<H> ConnectorBuilder<H>
where
    H: BrowserHost + 'static,
{
    /// Sets the HTTP transport (default: [`HttpTransport`]).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the notifier (default: [`DesktopNotifier`]).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the companion host name (default: `localhost`).
    pub fn companion_host(mut self, host: impl Into<String>) -> Self {
        self.companion_host = Some(host.into());
        self
    }

    /// Hydrates the config from the store and wires every component.
    pub async fn build(self) -> Result<Connector> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(DesktopNotifier::new()));

        let config = ConfigCache::hydrate(self.store).await?;

        let mut forwarder = Forwarder::new(config.clone(), transport, notifier);
        if let Some(companion_host) = self.companion_host {
            forwarder = forwarder.with_host(companion_host);
        }

        let interceptor =
            DownloadInterceptor::new(config.clone(), forwarder.clone(), self.host.clone());
        let router = MessageRouter::new(
            TabSignalTracker::new(),
            config.clone(),
            forwarder.clone(),
            self.host.clone(),
        );
        let menu = ContextMenuController::new(self.host.clone(), self.host);

        Ok(Connector {
            config,
            forwarder,
            interceptor,
            router,
            menu,
        })
    }
}
