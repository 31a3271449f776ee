//! Toast notifications
//!
//! Time is passed in as epoch milliseconds (`Date.now()` in the browser)
//! so the lifecycle is deterministic under test. Toasts are not queued:
//! each push is visible immediately and overlapping ones stack.

use crate::config::ToastTiming;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

impl NotificationLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
            NotificationLevel::Info => "ℹ",
        }
    }

    /// CSS class suffix, e.g. `notification-error`
    pub fn class_name(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "notification-success",
            NotificationLevel::Error => "notification-error",
            NotificationLevel::Info => "notification-info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPhase {
    /// Inserted, `show` class not applied yet
    Entering,
    Shown,
    /// `show` removed, waiting for the transition before removal
    Leaving,
    Gone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at_ms: f64,
}

impl Notification {
    pub fn phase(&self, now_ms: f64, timing: &ToastTiming) -> ToastPhase {
        let elapsed = now_ms - self.created_at_ms;
        let enter = timing.enter_delay_ms as f64;
        let hide = timing.visible_ms as f64;
        let remove = hide + timing.transition_ms as f64;

        if elapsed < enter {
            ToastPhase::Entering
        } else if elapsed < hide {
            ToastPhase::Shown
        } else if elapsed < remove {
            ToastPhase::Leaving
        } else {
            ToastPhase::Gone
        }
    }
}

#[derive(Debug)]
pub struct NotificationCenter {
    timing: ToastTiming,
    next_id: u64,
    live: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new(timing: ToastTiming) -> Self {
        Self {
            timing,
            next_id: 1,
            live: Vec::new(),
        }
    }

    pub fn timing(&self) -> &ToastTiming {
        &self.timing
    }

    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>, now_ms: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();
        tracing::debug!(id, ?level, %message, "notification");
        self.live.push(Notification {
            id,
            level,
            message,
            created_at_ms: now_ms,
        });
        id
    }

    /// Toasts that are still on screen at `now_ms`, oldest first
    pub fn visible(&self, now_ms: f64) -> impl Iterator<Item = &Notification> {
        self.live
            .iter()
            .filter(move |n| n.phase(now_ms, &self.timing) != ToastPhase::Gone)
    }

    /// Drop toasts whose removal transition has finished
    pub fn prune(&mut self, now_ms: f64) {
        let timing = self.timing;
        self.live
            .retain(|n| n.phase(now_ms, &timing) != ToastPhase::Gone);
    }

    /// Earliest time after `now_ms` at which some toast changes phase
    pub fn next_change_ms(&self, now_ms: f64) -> Option<f64> {
        let t = &self.timing;
        let offsets = [
            t.enter_delay_ms as f64,
            t.visible_ms as f64,
            t.visible_ms as f64 + t.transition_ms as f64,
        ];
        self.live
            .iter()
            .flat_map(|n| offsets.iter().map(move |o| n.created_at_ms + o))
            .filter(|at| *at > now_ms)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.live.last()
    }

    /// Everything pushed so far that has not been pruned
    pub fn all(&self) -> &[Notification] {
        &self.live
    }
}
