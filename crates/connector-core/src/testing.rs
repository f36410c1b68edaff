//! Recording fakes shared by the unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{HostError, StoreError, TransportError};
use crate::forwarder::Transport;
use crate::host::{DownloadHost, DownloadId, FilenameSuggestion, MenuHost, TabsHost};
use crate::menu::MenuItem;
use crate::notifications::{Notification, NotificationResult, Notifier};
use crate::store::{KeyValueStore, Namespace};
use crate::tabs::TabId;

/// Store whose every read and write fails, like a locked or corrupt database.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _namespace: Namespace, _key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }

    async fn set(&self, _namespace: Namespace, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Backend("database is locked".to_string()))
    }
}

/// Transport that records posts and answers with a fixed status or failure.
#[derive(Debug)]
pub struct RecordingTransport {
    status: Option<u16>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn ok(status: u16) -> Self {
        Self {
            status: Some(status),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            status: None,
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<u16, TransportError> {
        self.posts.lock().push((url.to_string(), body.clone()));
        self.status
            .ok_or_else(|| TransportError::Unavailable("connection refused".to_string()))
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.shown.lock().len()
    }

    pub fn last(&self) -> Option<Notification> {
        self.shown.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> NotificationResult {
        self.shown.lock().push(notification.clone());
        NotificationResult::Sent
    }
}

/// One call made against [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Suggest(DownloadId, FilenameSuggestion),
    Cancel(DownloadId),
    Erase(DownloadId),
    Download(String),
    QueryActiveTab,
    SendToTab(TabId, Value),
    RemoveAllMenus,
    CreateMenu(MenuItem),
}

/// Browser host fake that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    active_tab: Mutex<Option<TabId>>,
    tab_replies: Mutex<VecDeque<Result<Value, HostError>>>,
    fail_cancel: Mutex<bool>,
}

pub const TEST_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Test/1.0";

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_tab(tab: TabId) -> Self {
        let host = Self::new();
        *host.active_tab.lock() = Some(tab);
        host
    }

    pub fn push_tab_reply(&self, reply: Result<Value, HostError>) {
        self.tab_replies.lock().push_back(reply);
    }

    pub fn fail_cancel(&self) {
        *self.fail_cancel.lock() = true;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DownloadHost for RecordingHost {
    async fn suggest(&self, id: DownloadId, suggestion: FilenameSuggestion) -> Result<(), HostError> {
        self.record(HostCall::Suggest(id, suggestion));
        Ok(())
    }

    async fn cancel(&self, id: DownloadId) -> Result<(), HostError> {
        self.record(HostCall::Cancel(id));
        if *self.fail_cancel.lock() {
            return Err(HostError::Call("download already complete".to_string()));
        }
        Ok(())
    }

    async fn erase(&self, id: DownloadId) -> Result<(), HostError> {
        self.record(HostCall::Erase(id));
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<(), HostError> {
        self.record(HostCall::Download(url.to_string()));
        Ok(())
    }

    fn user_agent(&self) -> String {
        TEST_USER_AGENT.to_string()
    }
}

#[async_trait]
impl TabsHost for RecordingHost {
    async fn query_active_tab(&self) -> Result<Option<TabId>, HostError> {
        self.record(HostCall::QueryActiveTab);
        Ok(*self.active_tab.lock())
    }

    async fn send_to_tab(&self, tab: TabId, message: Value) -> Result<Value, HostError> {
        self.record(HostCall::SendToTab(tab, message));
        self.tab_replies
            .lock()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

#[async_trait]
impl MenuHost for RecordingHost {
    async fn remove_all_menus(&self) -> Result<(), HostError> {
        self.record(HostCall::RemoveAllMenus);
        Ok(())
    }

    async fn create_menu(&self, item: MenuItem) -> Result<(), HostError> {
        self.record(HostCall::CreateMenu(item));
        Ok(())
    }
}
