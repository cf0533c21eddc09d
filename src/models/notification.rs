// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app notification inbox records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewRequest,
    RequestAccepted,
    RequestRejected,
    PassengerCheckedIn,
    PassengerCheckedOut,
    RequestCancelled,
    RideReminder,
    RatingPrompt,
    #[default]
    General,
}

/// Title and body shown on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    /// Ride request this message refers to, if any
    pub request_id: Option<String>,
}

/// Stored notification record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct Notification {
    /// Document ID, also the handle used to cancel a scheduled notification
    pub id: String,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub request_id: Option<String>,
    /// Delivery time for scheduled reminders (ISO 8601)
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Whether the record belongs in the inbox at `now`.
    ///
    /// Scheduled reminders stay hidden until their delivery time. An
    /// unreadable `scheduled_for` is treated as due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_for.as_deref() {
            None => true,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(true),
        }
    }
}
