//! Per-tab de-duplication of content-script signals.
//!
//! A content script reports the first URL it sees on a page so the background
//! side can attach its listener exactly once. A CAPTCHA interstitial re-arms
//! the tab, because the URL seen behind the interstitial does not count.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Browser tab identifier.
pub type TabId = i64;

/// Tracks whether each tab has already reported its first URL since it was
/// last armed.
///
/// Clonable; all clones share state.
#[derive(Debug, Clone, Default)]
pub struct TabSignalTracker {
    signalled: Arc<Mutex<HashMap<TabId, bool>>>,
}

impl TabSignalTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arms `tab` so its next first-URL signal is accepted.
    ///
    /// Always reports that the listener may be added.
    pub fn on_captcha_signal(&self, tab: TabId) -> bool {
        self.signalled.lock().insert(tab, false);
        trace!(tab, "Tab armed");
        true
    }

    /// Accepts the first URL signal for `tab` since it was armed.
    ///
    /// Returns true the first time, false for every repeat until the tab is
    /// re-armed. A tab never seen before counts as armed.
    pub fn on_first_url_signal(&self, tab: TabId) -> bool {
        let mut signalled = self.signalled.lock();
        let seen = signalled.entry(tab).or_insert(false);
        if *seen {
            return false;
        }
        *seen = true;
        trace!(tab, "First URL accepted");
        true
    }

    /// Drops state for a closed tab.
    pub fn forget(&self, tab: TabId) -> bool {
        self.signalled.lock().remove(&tab).is_some()
    }

    /// Number of tabs with state.
    pub fn len(&self) -> usize {
        self.signalled.lock().len()
    }

    /// Returns true if no tab has state.
    pub fn is_empty(&self) -> bool {
        self.signalled.lock().is_empty()
    }
}
