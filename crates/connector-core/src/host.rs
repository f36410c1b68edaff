//! Browser host capabilities consumed by the pipeline.
//!
//! The browser owns the download lifecycle, tabs, and context menus. The core
//! only talks to them through these traits, so the same pipeline runs against
//! the native-messaging bridge in production and against recording fakes in
//! tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;
use crate::menu::MenuItem;
use crate::tabs::TabId;

/// Browser download identifier.
pub type DownloadId = i64;

/// Answer to the host's "determining filename" callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameSuggestion {
    /// Abort the filename flow.
    pub cancel: bool,
    /// Filename the host proposed.
    pub filename: String,
}

impl FilenameSuggestion {
    /// Suggestion that cancels the flow, echoing the host's filename.
    pub fn cancelled(filename: impl Into<String>) -> Self {
        Self {
            cancel: true,
            filename: filename.into(),
        }
    }
}

/// Download lifecycle operations.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    /// Answers the filename-suggestion callback of download `id`.
    async fn suggest(&self, id: DownloadId, suggestion: FilenameSuggestion) -> Result<(), HostError>;

    /// Cancels native download `id`.
    async fn cancel(&self, id: DownloadId) -> Result<(), HostError>;

    /// Erases download `id` and any partial artifact from the history.
    async fn erase(&self, id: DownloadId) -> Result<(), HostError>;

    /// Starts a native download of `url`.
    async fn download(&self, url: &str) -> Result<(), HostError>;

    /// Current browser user agent string.
    fn user_agent(&self) -> String;
}

/// Tab querying and content-script messaging.
#[async_trait]
pub trait TabsHost: Send + Sync {
    /// Active tab of the current, last-focused window.
    async fn query_active_tab(&self) -> Result<Option<TabId>, HostError>;

    /// Sends `message` to the content script in `tab` and awaits its reply.
    async fn send_to_tab(&self, tab: TabId, message: Value) -> Result<Value, HostError>;
}

/// Context-menu registration.
#[async_trait]
pub trait MenuHost: Send + Sync {
    /// Removes every entry this extension registered.
    async fn remove_all_menus(&self) -> Result<(), HostError>;

    /// Registers one entry.
    async fn create_menu(&self, item: MenuItem) -> Result<(), HostError>;
}

/// Everything the connector needs from the browser.
pub trait BrowserHost: DownloadHost + TabsHost + MenuHost {}

impl<T: DownloadHost + TabsHost + MenuHost> BrowserHost for T {}
