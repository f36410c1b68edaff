//! Browser capabilities backed by the native messaging pipe.
//!
//! Fire-and-forget calls become a single outbound command. Calls that need an
//! answer get a fresh call id and park on a oneshot channel until the session
//! feeds the matching `reply` into [`NativeHost::resolve`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use connector_core::host::{DownloadHost, MenuHost, TabsHost};
use connector_core::{DownloadId, FilenameSuggestion, HostError, MenuItem, TabId};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::protocol::{CallId, HostCommand};

type Reply = Result<Value, String>;

/// [`connector_core::BrowserHost`] implementation that speaks to the extension.
pub struct NativeHost {
    commands: mpsc::UnboundedSender<HostCommand>,
    pending: Mutex<HashMap<CallId, oneshot::Sender<Reply>>>,
    next_call: AtomicU64,
    closed: AtomicBool,
    user_agent: RwLock<String>,
}

impl NativeHost {
    /// Creates a host and the receiver the writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let host = Self {
            commands,
            pending: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            user_agent: RwLock::new(String::new()),
        };
        (host, rx)
    }

    /// Records the browser user agent.
    pub fn set_user_agent(&self, agent: impl Into<String>) {
        *self.user_agent.write() = agent.into();
    }

    /// Queues a command for the browser.
    pub fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.commands
            .send(command)
            .map_err(|_| HostError::Disconnected)
    }

    /// Completes a pending call. Returns false for an unknown call id.
    pub fn resolve(&self, call_id: CallId, result: Option<Value>, error: Option<String>) -> bool {
        let Some(tx) = self.pending.lock().remove(&call_id) else {
            warn!(call_id, "Reply for unknown call");
            return false;
        };

        let reply = match error {
            Some(error) => Err(error),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        // The caller may have given up already.
        let _ = tx.send(reply);
        true
    }

    /// Fails every pending call with [`HostError::Disconnected`].
    ///
    /// Calls made afterwards fail the same way, since no reply can arrive once
    /// the browser has closed its end. Fire-and-forget commands still queue.
    pub fn fail_all(&self) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock();
            self.closed.store(true, Ordering::Release);
            pending.drain().collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "Failing pending host calls");
        }
    }

    /// Number of calls waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    async fn call(&self, command: impl FnOnce(CallId) -> HostCommand) -> Result<Value, HostError> {
        let call_id = self.next_call.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if self.closed.load(Ordering::Acquire) {
                return Err(HostError::Disconnected);
            }
            pending.insert(call_id, tx);
        }

        if let Err(e) = self.send(command(call_id)) {
            self.pending.lock().remove(&call_id);
            return Err(e);
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(HostError::Call(message)),
            Err(_) => Err(HostError::Disconnected),
        }
    }
}

#[async_trait]
impl DownloadHost for NativeHost {
    async fn suggest(&self, id: DownloadId, suggestion: FilenameSuggestion) -> Result<(), HostError> {
        self.send(HostCommand::Suggest {
            download_id: id,
            suggestion,
        })
    }

    async fn cancel(&self, id: DownloadId) -> Result<(), HostError> {
        self.send(HostCommand::Cancel { download_id: id })
    }

    async fn erase(&self, id: DownloadId) -> Result<(), HostError> {
        self.send(HostCommand::Erase { download_id: id })
    }

    async fn download(&self, url: &str) -> Result<(), HostError> {
        self.send(HostCommand::Download {
            url: url.to_string(),
        })
    }

    fn user_agent(&self) -> String {
        self.user_agent.read().clone()
    }
}

#[async_trait]
impl TabsHost for NativeHost {
    async fn query_active_tab(&self) -> Result<Option<TabId>, HostError> {
        let value = self
            .call(|call_id| HostCommand::QueryActiveTab { call_id })
            .await?;
        serde_json::from_value(value).map_err(|e| HostError::Protocol(e.to_string()))
    }

    async fn send_to_tab(&self, tab: TabId, message: Value) -> Result<Value, HostError> {
        self.call(|call_id| HostCommand::SendToTab {
            call_id,
            tab_id: tab,
            message,
        })
        .await
    }
}

#[async_trait]
impl MenuHost for NativeHost {
    async fn remove_all_menus(&self) -> Result<(), HostError> {
        self.send(HostCommand::RemoveAllMenus)
    }

    async fn create_menu(&self, item: MenuItem) -> Result<(), HostError> {
        self.send(HostCommand::CreateMenu { item })
    }
}
