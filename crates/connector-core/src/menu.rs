//! Right-click menu.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::{DownloadHost, MenuHost};
use crate::protocol::is_supported_protocol;

/// Where a menu entry is shown. The link entry is offered everywhere and
/// checks for a link at click time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    All,
}

/// A context-menu entry to register with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<MenuContext>,
}

/// Menu action triggered by a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Hand the clicked link to the download pipeline.
    DownloadLink,

    /// Open the batch extraction UI. Reserved; never registered.
    BatchExtract,
}

impl MenuAction {
    /// Returns the menu ID string for this action.
    pub fn id(&self) -> &'static str {
        match self {
            Self::DownloadLink => "extract_selected_link",
            Self::BatchExtract => "batch_extract",
        }
    }

    /// Returns the menu item label for this action.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DownloadLink => "Download this link",
            Self::BatchExtract => "Extract links",
        }
    }

    /// Creates a MenuAction from an ID string.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "extract_selected_link" => Some(Self::DownloadLink),
            "batch_extract" => Some(Self::BatchExtract),
            _ => None,
        }
    }

    /// Whether the entry is registered with the host.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::DownloadLink)
    }

    /// Builds the host registration for this action.
    pub fn item(&self) -> MenuItem {
        MenuItem {
            id: self.id().to_string(),
            title: self.label().to_string(),
            contexts: vec![MenuContext::All],
        }
    }
}

/// A click on one of our entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickInfo {
    pub menu_item_id: String,
    #[serde(default)]
    pub link_url: Option<String>,
}

/// What a click led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A native download was started; it re-enters the interceptor.
    DownloadStarted,
    /// The click carried no http(s) link.
    Unsupported,
    /// The reserved batch entry; nothing happens.
    Dormant,
    /// Not one of ours.
    Ignored,
}

/// Registers the menu and reacts to clicks.
#[derive(Clone)]
pub struct ContextMenuController {
    menus: Arc<dyn MenuHost>,
    downloads: Arc<dyn DownloadHost>,
}

impl ContextMenuController {
    /// Creates a controller.
    pub fn new(menus: Arc<dyn MenuHost>, downloads: Arc<dyn DownloadHost>) -> Self {
        Self { menus, downloads }
    }

    /// Clears existing entries and registers the active ones.
    pub async fn install(&self) -> Result<()> {
        self.menus.remove_all_menus().await?;

        for action in [MenuAction::DownloadLink, MenuAction::BatchExtract] {
            if action.is_active() {
                self.menus.create_menu(action.item()).await?;
            }
        }

        info!("Context menu installed");
        Ok(())
    }

    /// Handles a click.
    pub async fn on_clicked(&self, click: &ClickInfo) -> Result<ClickOutcome> {
        match MenuAction::from_id(&click.menu_item_id) {
            Some(MenuAction::DownloadLink) => {
                let Some(url) = click
                    .link_url
                    .as_deref()
                    .filter(|url| is_supported_protocol(Some(*url)))
                else {
                    debug!(link = ?click.link_url, "Clicked link is not downloadable");
                    return Ok(ClickOutcome::Unsupported);
                };

                if let Err(e) = self.downloads.download(url).await {
                    warn!(url, error = %e, "Failed to start native download");
                    return Ok(ClickOutcome::Unsupported);
                }
                Ok(ClickOutcome::DownloadStarted)
            }
            Some(MenuAction::BatchExtract) => Ok(ClickOutcome::Dormant),
            None => Ok(ClickOutcome::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HostCall, RecordingHost};

    fn controller() -> (ContextMenuController, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::new());
        (ContextMenuController::new(host.clone(), host.clone()), host)
    }

    fn click(id: &str, url: Option<&str>) -> ClickInfo {
        ClickInfo {
            menu_item_id: id.to_string(),
            link_url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_menu_action_roundtrip() {
        for action in [MenuAction::DownloadLink, MenuAction::BatchExtract] {
            assert_eq!(MenuAction::from_id(action.id()), Some(action));
            assert!(!action.label().is_empty());
        }
        assert_eq!(MenuAction::from_id(""), None);
    }

    #[test]
    fn test_item_serializes_like_host_registration() {
        let json = serde_json::to_value(MenuAction::DownloadLink.item()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "extract_selected_link",
                "title": "Download this link",
                "contexts": ["all"]
            })
        );
    }

    #[tokio::test]
    async fn test_install_clears_then_registers_one_entry() {
        let (menu, host) = controller();
        menu.install().await.unwrap();

        assert_eq!(
            host.calls(),
            vec![
                HostCall::RemoveAllMenus,
                HostCall::CreateMenu(MenuAction::DownloadLink.item()),
            ]
        );
    }

    #[tokio::test]
    async fn test_click_on_http_link_starts_download() {
        let (menu, host) = controller();
        let outcome = menu
            .on_clicked(&click("extract_selected_link", Some("https://host/a.zip")))
            .await
            .unwrap();

        assert_eq!(outcome, ClickOutcome::DownloadStarted);
        assert_eq!(host.calls(), vec![HostCall::Download("https://host/a.zip".into())]);
    }

    #[tokio::test]
    async fn test_click_without_supported_link_does_nothing() {
        let (menu, host) = controller();

        for url in [None, Some("ftp://host/a.zip"), Some("")] {
            let outcome = menu
                .on_clicked(&click("extract_selected_link", url))
                .await
                .unwrap();
            assert_eq!(outcome, ClickOutcome::Unsupported);
        }
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_entry_is_dormant() {
        let (menu, host) = controller();
        let outcome = menu
            .on_clicked(&click("batch_extract", Some("https://host/a.zip")))
            .await
            .unwrap();

        assert_eq!(outcome, ClickOutcome::Dormant);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_entry_is_ignored() {
        let (menu, _host) = controller();
        let outcome = menu.on_clicked(&click("other", None)).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Ignored);
    }
}
