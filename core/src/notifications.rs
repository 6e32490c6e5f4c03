//! Ephemeral notification feed.
//!
//! Unlike the stores, nothing here touches the KV substrate: the feed is
//! rebuilt from demo data every time the services are constructed.

use crate::{
    clock::SharedClock,
    error::{LumaError, LumaResult},
    rng::{record_id, StoreRng},
    types::{EntityId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntityId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: Timestamp,
    pub read: bool,
}

pub struct NotificationCenter {
    items: Vec<Notification>,
    clock: SharedClock,
    rng: StoreRng,
}

impl NotificationCenter {
    pub fn new(clock: SharedClock, rng: StoreRng) -> Self {
        let items = seed_notifications(clock.now());
        Self { items, clock, rng }
    }

    /// Newest first.
    pub fn push(&mut self, kind: NotificationKind, title: &str, message: &str) -> Notification {
        let now = self.clock.now();
        let n = Notification {
            id: record_id("notif", now.timestamp_millis(), &mut self.rng),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            created_at: now,
            read: false,
        };
        self.items.insert(0, n.clone());
        n
    }

    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn mark_read(&mut self, id: &str) -> LumaResult<()> {
        let n = self
            .items
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| LumaError::not_found("Notification", id))?;
        n.read = true;
        Ok(())
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        changed
    }

    pub fn dismiss(&mut self, id: &str) -> LumaResult<Notification> {
        let idx = self
            .items
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| LumaError::not_found("Notification", id))?;
        Ok(self.items.remove(idx))
    }
}

fn seed_notifications(now: Timestamp) -> Vec<Notification> {
    let demo = |id: &str, kind, title: &str, message: &str, ago: Duration, read| Notification {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        created_at: now - ago,
        read,
    };
    vec![
        demo("notif_seed_001", NotificationKind::Success, "Transfer completed",
            "Your transfer of 1,250.00 USD to sarah.chen@example.com has completed.",
            Duration::hours(2), false),
        demo("notif_seed_002", NotificationKind::Warning, "Transfer pending",
            "A GBP card payment is still pending confirmation.",
            Duration::days(2), false),
        demo("notif_seed_003", NotificationKind::Info, "New feature",
            "Instant EUR payouts are now available on your plan.",
            Duration::days(1), true),
    ]
}
