//! Scan event bus.
//!
//! The scanner publishes lifecycle and per-issue events here; a web layer
//! subscribes and forwards them (for example over SSE). A short history is
//! kept so a client that connects mid-scan can replay what it missed.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::comic::ScanCounts;
use crate::ids::{IssueId, ScanRunId, SeriesId};

/// Events kept for replay.
const HISTORY_LEN: usize = 100;

/// Audience category for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Scan lifecycle and diagnostics.
    Admin,
    /// Library changes readers care about.
    User,
}

/// Payload describing what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- Scan lifecycle ------------------------------------------------------
    ScanStarted {
        run_id: ScanRunId,
        mode: String,
    },
    ScanProgress {
        run_id: ScanRunId,
        root: String,
        roots_done: u64,
        roots_total: u64,
        counts: ScanCounts,
    },
    ScanCompleted {
        run_id: ScanRunId,
        counts: ScanCounts,
    },
    ScanFailed {
        run_id: ScanRunId,
        error: String,
    },
    ScanCancelled {
        run_id: ScanRunId,
    },
    ScanFileError {
        run_id: ScanRunId,
        file_path: String,
        message: String,
    },

    // -- Issue lifecycle -----------------------------------------------------
    IssueAdded {
        issue_id: IssueId,
        series_id: SeriesId,
        file_path: String,
    },
    IssueUpdated {
        issue_id: IssueId,
    },
    IssueRetired {
        issue_id: IssueId,
    },
}

/// One published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    pub payload: EventPayload,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
    // Oldest at the front.
    history: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// `channel_capacity` bounds how far a slow subscriber may lag before it
    /// starts missing events; the replay history is fixed.
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            history: RwLock::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, category: EventCategory, payload: EventPayload) {
        let event = Event {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            payload,
        };

        {
            let mut history = self.history.write();
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // Err only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    /// Up to `n` most recent events, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        self.history.read().iter().rev().take(n).cloned().collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .field("history", &self.history.read().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
