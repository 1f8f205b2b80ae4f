//! Reminder delivery seam.

use std::sync::Mutex;

use crate::status::NotifyCounts;

/// Title of the daily reminder.
pub const SUMMARY_TITLE: &str = "Membership summary";

/// Delivers a reminder to the gym owner.
///
/// Fire-and-forget: delivery problems are the implementation's to log,
/// never the caller's to handle.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Title and body for a notification about `counts`.
pub fn summary_message(counts: NotifyCounts) -> (String, String) {
    let body = format!(
        "Today you have {} memberships expiring soon and {} expired.",
        counts.expiring_soon, counts.expired
    );
    (SUMMARY_TITLE.to_string(), body)
}

/// Emits notifications as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(title, body)` pairs in delivery order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push((title.to_string(), body.to_string()));
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}
