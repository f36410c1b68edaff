//! Dispatch of inbound extension messages.
//!
//! Content scripts and the settings popup talk to the background side with
//! JSON messages carrying a `type` tag. Each tag maps to one [`Command`]
//! variant; unknown or malformed messages are dropped without an answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{parse_port, ConfigCache};
use crate::error::Result;
use crate::forwarder::{Endpoint, Forwarder, SendOutcome};
use crate::host::TabsHost;
use crate::tabs::{TabId, TabSignalTracker};

/// Parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Content script passed a CAPTCHA; re-arm its tab.
    #[serde(rename = "captcha")]
    Captcha,

    /// Content script saw its first URL.
    #[serde(rename = "storeFirstUrl")]
    StoreFirstUrl,

    /// Popup asks the active tab for links similar to a selection.
    #[serde(rename = "extractSimilarLinks")]
    ExtractSimilarLinks,

    /// Popup asks the active tab for links matching a pattern.
    #[serde(rename = "extractLinksWithRegex")]
    ExtractLinksWithRegex,

    /// Settings popup changed the companion port. The value is validated on
    /// dispatch, since popups have sent it as a number and as a string.
    #[serde(rename = "setPort")]
    SetPort {
        #[serde(default)]
        value: Value,
    },

    /// Any other tag.
    #[serde(other)]
    Unknown,
}

impl Command {
    /// Parses a raw message. Anything that is not a well-formed command is
    /// [`Command::Unknown`].
    pub fn parse(message: &Value) -> Self {
        match Command::deserialize(message) {
            Ok(command) => command,
            Err(e) => {
                debug!(error = %e, "Unparsable extension message");
                Command::Unknown
            }
        }
    }
}

/// Where a message came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSender {
    /// Tab of the sending content script; `None` for extension pages.
    pub tab_id: Option<TabId>,
}

impl MessageSender {
    /// Sender in `tab`.
    pub fn tab(tab_id: TabId) -> Self {
        Self {
            tab_id: Some(tab_id),
        }
    }

    /// Sender outside any tab (popup, options page).
    pub fn extension() -> Self {
        Self { tab_id: None }
    }
}

/// Acknowledgment sent back to a content script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerResponse {
    pub is_ok_to_add_listener: bool,
}

/// Routes messages to the tracker, the forwarder, or the config.
#[derive(Clone)]
pub struct MessageRouter {
    tracker: TabSignalTracker,
    config: ConfigCache,
    forwarder: Forwarder,
    tabs: Arc<dyn TabsHost>,
}

impl MessageRouter {
    /// Creates a router.
    pub fn new(
        tracker: TabSignalTracker,
        config: ConfigCache,
        forwarder: Forwarder,
        tabs: Arc<dyn TabsHost>,
    ) -> Self {
        Self {
            tracker,
            config,
            forwarder,
            tabs,
        }
    }

    /// Returns the tab tracker.
    pub fn tracker(&self) -> &TabSignalTracker {
        &self.tracker
    }

    /// Handles one raw message. Returns the response to send back, if any.
    pub async fn dispatch(
        &self,
        sender: MessageSender,
        message: Value,
    ) -> Result<Option<ListenerResponse>> {
        let command = Command::parse(&message);

        match command {
            Command::Captcha => Ok(self.with_sender_tab(sender, "captcha", |tab| {
                self.tracker.on_captcha_signal(tab)
            })),
            Command::StoreFirstUrl => Ok(self.with_sender_tab(sender, "storeFirstUrl", |tab| {
                self.tracker.on_first_url_signal(tab)
            })),
            Command::ExtractSimilarLinks | Command::ExtractLinksWithRegex => {
                self.relay_extraction(message).await?;
                Ok(None)
            }
            Command::SetPort { value } => {
                match parse_port(&value) {
                    Some(port) => self.config.set_port(port).await?,
                    None => warn!(?value, "Ignoring setPort without a valid port"),
                }
                Ok(None)
            }
            Command::Unknown => {
                debug!("Ignoring unknown extension message");
                Ok(None)
            }
        }
    }

    /// Evicts tracker state for a closed tab.
    pub fn on_tab_removed(&self, tab: TabId) {
        if self.tracker.forget(tab) {
            debug!(tab, "Forgot closed tab");
        }
    }

    fn with_sender_tab(
        &self,
        sender: MessageSender,
        kind: &str,
        signal: impl FnOnce(TabId) -> bool,
    ) -> Option<ListenerResponse> {
        let Some(tab) = sender.tab_id else {
            warn!(kind, "Tab signal without a sender tab, dropping");
            return None;
        };
        Some(ListenerResponse {
            is_ok_to_add_listener: signal(tab),
        })
    }

    /// Asks the active tab to extract links and forwards its answer as a batch.
    async fn relay_extraction(&self, message: Value) -> Result<Option<SendOutcome>> {
        let tab = match self.tabs.query_active_tab().await {
            Ok(Some(tab)) => tab,
            Ok(None) => {
                warn!("No active tab to extract links from");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Failed to query active tab");
                return Ok(None);
            }
        };

        let links = match self.tabs.send_to_tab(tab, message).await {
            Ok(links) => links,
            Err(e) => {
                warn!(tab, error = %e, "Content script did not answer extraction request");
                return Ok(None);
            }
        };

        let outcome = self.forwarder.send(&links, Endpoint::Batch).await?;
        Ok(Some(outcome))
    }
}
