//! Desktop notification when the companion app cannot be reached.
//!
//! This is the only error ever surfaced to the user. One notification is
//! raised per failed send; there is no rate limiting and no detail about the
//! underlying failure.

use serde::{Deserialize, Serialize};

/// Notification title.
pub const UNREACHABLE_TITLE: &str = "BitKip Extension";

/// Notification body.
pub const UNREACHABLE_MESSAGE: &str =
    "Can't send url to BitKip, Is application running on the same port?";

/// Icon reference shown with the notification.
pub const UNREACHABLE_ICON: &str = "resources/icons/logo.png";

/// Notification template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Title, message and icon.
    #[default]
    Basic,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub icon_url: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    /// The "companion app not running" notification.
    pub fn companion_unreachable() -> Self {
        Self {
            title: UNREACHABLE_TITLE.to_string(),
            message: UNREACHABLE_MESSAGE.to_string(),
            icon_url: UNREACHABLE_ICON.to_string(),
            kind: NotificationKind::Basic,
        }
    }
}

/// Result of attempting to show a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// Notification was shown.
    Sent,
    /// Handed to a blocking thread; a platform failure is logged there.
    Queued,
    /// The platform refused it.
    Failed(String),
}

impl NotificationResult {
    /// Returns true unless the platform refused the notification.
    pub fn was_sent(&self) -> bool {
        matches!(self, NotificationResult::Sent | NotificationResult::Queued)
    }
}

/// Something that can show a notification. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Shows `notification`.
    fn notify(&self, notification: &Notification) -> NotificationResult;
}

/// Shows notifications through the platform notification service.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    /// Creates a notifier reporting under the extension title.
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DesktopNotifier {
    /// Inside a tokio runtime the platform call runs on the blocking pool, so
    /// a slow notification daemon never stalls the single-threaded host.
    #[cfg(feature = "notifications")]
    fn notify(&self, notification: &Notification) -> NotificationResult {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let notification = notification.clone();
                runtime.spawn_blocking(move || {
                    if let NotificationResult::Failed(e) = show(&notification) {
                        tracing::warn!(error = %e, "Failed to show notification");
                    }
                });
                NotificationResult::Queued
            }
            Err(_) => show(notification),
        }
    }

    /// Fallback when notifications are compiled out: log instead.
    #[cfg(not(feature = "notifications"))]
    fn notify(&self, notification: &Notification) -> NotificationResult {
        tracing::warn!(
            app = UNREACHABLE_TITLE,
            title = %notification.title,
            "{}",
            notification.message
        );
        NotificationResult::Sent
    }
}

/// Blocks until the platform accepts or refuses the notification.
#[cfg(feature = "notifications")]
fn show(notification: &Notification) -> NotificationResult {
    use notify_rust::Notification as Toast;

    match Toast::new()
        .summary(&notification.title)
        .body(&notification.message)
        .icon(&notification.icon_url)
        .appname(UNREACHABLE_TITLE)
        .timeout(notify_rust::Timeout::Milliseconds(5000))
        .show()
    {
        Ok(_) => NotificationResult::Sent,
        Err(e) => NotificationResult::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_notification_is_fixed() {
        let n = Notification::companion_unreachable();
        assert_eq!(n.title, "BitKip Extension");
        assert!(n.message.contains("same port"));
        assert_eq!(n.kind, NotificationKind::Basic);
    }

    #[test]
    fn test_notification_serializes_like_browser_options() {
        let json = serde_json::to_value(Notification::companion_unreachable()).unwrap();
        assert_eq!(json["type"], "basic");
        assert_eq!(json["iconUrl"], UNREACHABLE_ICON);
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_result_helpers() {
        assert!(NotificationResult::Sent.was_sent());
        assert!(NotificationResult::Queued.was_sent());
        assert!(!NotificationResult::Failed("no dbus".into()).was_sent());
    }

    #[cfg(feature = "notifications")]
    #[tokio::test(flavor = "current_thread")]
    async fn test_desktop_notify_leaves_runtime_thread() {
        let result = DesktopNotifier::new().notify(&Notification::companion_unreachable());
        assert_eq!(result, NotificationResult::Queued);
    }
}
