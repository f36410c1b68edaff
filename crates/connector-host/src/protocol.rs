//! JSON messages exchanged with the extension's background script.
//!
//! Events flow from the browser to the host and carry an `"event"` tag.
//! Commands flow from the host to the browser and carry a `"command"` tag.

use connector_core::{ClickInfo, DownloadId, DownloadItem, FilenameSuggestion, MenuItem, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlates a command that expects an answer with its `reply`.
pub type CallId = u64;

/// Correlates a runtime message with its `respond` command.
pub type RequestId = u64;

// ============================================================================
// Events (browser → host)
// ============================================================================

/// Events forwarded by the extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostEvent {
    /// Sent once after the port opens.
    Hello { user_agent: String },

    /// `downloads.onDeterminingFilename` fired.
    DeterminingFilename {
        item: DownloadItem,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },

    /// `runtime.onMessage` fired.
    Message {
        /// Set when the sender waits for a response.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
        message: Value,
    },

    /// `contextMenus.onClicked` fired.
    MenuClicked {
        menu_item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link_url: Option<String>,
    },

    /// `tabs.onRemoved` fired.
    TabRemoved { tab_id: TabId },

    /// Answer to a command that carried a `callId`.
    Reply {
        call_id: CallId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HostEvent {
    /// Event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::DeterminingFilename { .. } => "determiningFilename",
            Self::Message { .. } => "message",
            Self::MenuClicked { .. } => "menuClicked",
            Self::TabRemoved { .. } => "tabRemoved",
            Self::Reply { .. } => "reply",
        }
    }

    /// Click payload of a `menuClicked` event.
    pub fn click_info(&self) -> Option<ClickInfo> {
        match self {
            Self::MenuClicked {
                menu_item_id,
                link_url,
            } => Some(ClickInfo {
                menu_item_id: menu_item_id.clone(),
                link_url: link_url.clone(),
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Commands (host → browser)
// ============================================================================

/// Browser API calls requested by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostCommand {
    /// Completes the pending filename callback of a download.
    Suggest {
        download_id: DownloadId,
        suggestion: FilenameSuggestion,
    },

    /// `downloads.cancel`
    Cancel { download_id: DownloadId },

    /// `downloads.erase`
    Erase { download_id: DownloadId },

    /// `downloads.download`
    Download { url: String },

    /// `contextMenus.removeAll`
    RemoveAllMenus,

    /// `contextMenus.create`
    CreateMenu { item: MenuItem },

    /// `tabs.query` for the active tab of the last focused window.
    QueryActiveTab { call_id: CallId },

    /// `tabs.sendMessage`; the content script's answer comes back as a reply.
    SendToTab {
        call_id: CallId,
        tab_id: TabId,
        message: Value,
    },

    /// Response to a `message` event.
    Respond {
        request_id: RequestId,
        response: Value,
    },
}

impl HostCommand {
    /// Call id if the command awaits a reply.
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            Self::QueryActiveTab { call_id } | Self::SendToTab { call_id, .. } => Some(*call_id),
            _ => None,
        }
    }
}
