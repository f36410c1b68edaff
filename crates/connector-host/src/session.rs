//! One native messaging session: from the browser opening the pipe to EOF.

use std::sync::Arc;

use connector_core::host::DownloadHost;
use connector_core::{Connector, DownloadItem, FilenameSuggestion, Interception, MessageSender};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bridge::NativeHost;
use crate::native::{read_frame, write_frame, FrameError};
use crate::protocol::{HostCommand, HostEvent, RequestId};

/// Runs the connector against one browser connection.
pub struct Session {
    connector: Connector,
    host: Arc<NativeHost>,
}

impl Session {
    /// Creates a session. `host` must be the host `connector` was built with.
    pub fn new(connector: Connector, host: Arc<NativeHost>) -> Self {
        Self { connector, host }
    }

    /// Serves events until the browser closes `reader`.
    ///
    /// Commands queued on `host` are written to `writer` by a separate task.
    /// Each event other than `hello`, `reply` and `tabRemoved` is handled on
    /// its own task, so a slow companion app never blocks call replies.
    ///
    /// On EOF the session waits for those tasks, so a hand-off that was
    /// already under way still reaches the companion app. Commands they queue
    /// are flushed before the writer stops.
    pub async fn run<R, W>(
        self,
        mut reader: R,
        writer: W,
        commands: mpsc::UnboundedReceiver<HostCommand>,
    ) -> Result<(), FrameError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (stop_writer, stop) = oneshot::channel();
        let writer_task = tokio::spawn(write_commands(writer, commands, stop));
        let mut handlers = JoinSet::new();

        if let Err(e) = self.connector.menu().install().await {
            warn!("Failed to install context menu: {}", e);
        }

        let result = loop {
            let frame = match read_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            // Reap finished handlers so a long session does not accumulate them.
            while let Some(joined) = handlers.try_join_next() {
                if let Err(e) = joined {
                    error!("Event task failed: {}", e);
                }
            }

            match serde_json::from_slice::<HostEvent>(&frame) {
                Ok(event) => self.handle(event, &mut handlers),
                Err(e) => warn!("Dropping malformed event: {}", e),
            }
        };

        info!("Browser disconnected");
        // Replies can no longer arrive, so calls must not hold up the drain.
        self.host.fail_all();

        if !handlers.is_empty() {
            debug!(count = handlers.len(), "Waiting for in-flight events");
        }
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                error!("Event task failed: {}", e);
            }
        }

        let _ = stop_writer.send(());
        if let Err(e) = writer_task.await {
            error!("Writer task failed: {}", e);
        }
        result
    }

    fn handle(&self, event: HostEvent, handlers: &mut JoinSet<()>) {
        debug!(event = event.name(), "Received event");

        match event {
            HostEvent::Hello { user_agent } => {
                info!("Extension connected");
                self.host.set_user_agent(user_agent);
            }
            HostEvent::Reply {
                call_id,
                result,
                error,
            } => {
                self.host.resolve(call_id, result, error);
            }
            HostEvent::TabRemoved { tab_id } => {
                self.connector.router().on_tab_removed(tab_id);
            }
            HostEvent::DeterminingFilename { item, user_agent } => {
                if let Some(agent) = user_agent {
                    self.host.set_user_agent(agent);
                }
                let connector = self.connector.clone();
                let host = self.host.clone();
                handlers.spawn(async move { on_download(&connector, &host, item).await });
            }
            HostEvent::Message {
                request_id,
                tab_id,
                message,
            } => {
                let connector = self.connector.clone();
                let host = self.host.clone();
                let sender = MessageSender { tab_id };
                handlers.spawn(async move {
                    on_message(&connector, &host, sender, request_id, message).await
                });
            }
            HostEvent::MenuClicked { .. } => {
                let Some(click) = event.click_info() else {
                    return;
                };
                let connector = self.connector.clone();
                handlers.spawn(async move {
                    match connector.menu().on_clicked(&click).await {
                        Ok(outcome) => debug!(?outcome, "Menu click handled"),
                        Err(e) => warn!("Menu click failed: {}", e),
                    }
                });
            }
        }
    }
}

/// Runs the interceptor and releases the filename callback when the browser
/// keeps the download.
async fn on_download(connector: &Connector, host: &NativeHost, item: DownloadItem) {
    let release = match connector.interceptor().on_determining_filename(&item).await {
        Ok(Interception::Intercepted(outcome)) => {
            info!(id = item.id, ?outcome, "Download handed off");
            false
        }
        Ok(Interception::PassThrough(reason)) => {
            debug!(id = item.id, ?reason, "Download left to the browser");
            true
        }
        Err(e) => {
            error!(id = item.id, "Interception failed: {}", e);
            true
        }
    };

    if release {
        let suggestion = FilenameSuggestion {
            cancel: false,
            filename: item.filename.clone(),
        };
        if let Err(e) = host.suggest(item.id, suggestion).await {
            warn!(id = item.id, "Failed to release download: {}", e);
        }
    }
}

async fn on_message(
    connector: &Connector,
    host: &NativeHost,
    sender: MessageSender,
    request_id: Option<RequestId>,
    message: Value,
) {
    let response = match connector.router().dispatch(sender, message).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Message handling failed: {}", e);
            None
        }
    };

    let (Some(request_id), Some(response)) = (request_id, response) else {
        return;
    };

    let response = match serde_json::to_value(response) {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            return;
        }
    };

    if let Err(e) = host.send(HostCommand::Respond {
        request_id,
        response,
    }) {
        debug!(request_id, "Could not respond: {}", e);
    }
}

/// Writes queued commands until `stop` fires, then flushes what is left.
async fn write_commands<W>(
    mut writer: W,
    mut commands: mpsc::UnboundedReceiver<HostCommand>,
    mut stop: oneshot::Receiver<()>,
) where
    W: AsyncWrite + Unpin,
{
    let mut stopping = false;
    loop {
        let command = tokio::select! {
            biased;
            command = commands.recv() => command,
            _ = &mut stop, if !stopping => {
                stopping = true;
                commands.close();
                continue;
            }
        };
        let Some(command) = command else {
            break;
        };

        match write_frame(&mut writer, &command).await {
            Ok(()) => {}
            Err(FrameError::TooLarge { len, max }) => {
                warn!(len, max, "Dropping oversized command");
            }
            Err(e) => {
                error!("Failed to write to browser: {}", e);
                break;
            }
        }
    }
}
