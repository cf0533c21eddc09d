// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push notification dispatch.
//!
//! Every notification gets an inbox record in the `notifications`
//! collection; immediate ones are also pushed to the recipient's device
//! through the Expo push gateway. Nothing here retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::db::RideStore;
use crate::error::{AppError, Result};
use crate::models::{Notification, PushMessage};
use crate::time_utils::format_utc_rfc3339;

/// Sends, schedules and cancels notifications.
///
/// Returned identifiers are opaque and only meaningful to `cancel`.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver `message` now.
    ///
    /// An error means the device push failed. The inbox record may already
    /// exist in that case and is kept.
    async fn send_now(&self, recipient_id: &str, message: &PushMessage) -> Result<String>;

    async fn schedule_at(
        &self,
        recipient_id: &str,
        message: &PushMessage,
        at: DateTime<Utc>,
    ) -> Result<String>;

    async fn cancel(&self, notification_id: &str) -> Result<()>;
}

/// Body of an Expo push request.
#[derive(Debug, Serialize)]
struct ExpoPushRequest<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'static str,
    data: serde_json::Value,
}

/// Dispatcher backed by the document store and an Expo-style push gateway.
pub struct PushDispatcher {
    http: reqwest::Client,
    push_api_url: String,
    store: Arc<dyn RideStore>,
}

impl PushDispatcher {
    pub fn new(push_api_url: String, timeout_secs: u64, store: Arc<dyn RideStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            push_api_url,
            store,
        })
    }

    fn inbox_record(
        recipient_id: &str,
        message: &PushMessage,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Notification {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            title: message.title.clone(),
            body: message.body.clone(),
            kind: message.kind,
            request_id: message.request_id.clone(),
            scheduled_for: scheduled_for.map(format_utc_rfc3339),
            created_at: format_utc_rfc3339(Utc::now()),
            read: false,
        }
    }

    /// Push to the device, if the recipient registered one.
    async fn push(&self, recipient_id: &str, message: &PushMessage) -> Result<()> {
        let token = self
            .store
            .get_user(recipient_id)
            .await?
            .and_then(|u| u.push_token)
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            tracing::debug!(recipient_id, "No push token registered, inbox only");
            return Ok(());
        };

        let body = ExpoPushRequest {
            to: &token,
            title: &message.title,
            body: &message.body,
            sound: "default",
            data: serde_json::json!({
                "kind": message.kind,
                "request_id": message.request_id,
            }),
        };

        let response = self
            .http
            .post(&self.push_api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Push request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Notification(format!("HTTP {}: {}", status, text)));
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for PushDispatcher {
    async fn send_now(&self, recipient_id: &str, message: &PushMessage) -> Result<String> {
        let record = Self::inbox_record(recipient_id, message, None);
        self.store.set_notification(&record).await?;
        if let Err(e) = self.push(recipient_id, message).await {
            tracing::warn!(
                recipient_id,
                notification_id = %record.id,
                error = %e,
                "Push failed, inbox record kept"
            );
            return Err(e);
        }

        tracing::info!(
            recipient_id,
            notification_id = %record.id,
            kind = ?message.kind,
            "Notification sent"
        );
        Ok(record.id)
    }

    async fn schedule_at(
        &self,
        recipient_id: &str,
        message: &PushMessage,
        at: DateTime<Utc>,
    ) -> Result<String> {
        let record = Self::inbox_record(recipient_id, message, Some(at));
        self.store.set_notification(&record).await?;

        tracing::info!(
            recipient_id,
            notification_id = %record.id,
            at = %format_utc_rfc3339(at),
            "Notification scheduled"
        );
        Ok(record.id)
    }

    async fn cancel(&self, notification_id: &str) -> Result<()> {
        self.store.delete_notification(notification_id).await?;
        tracing::info!(notification_id, "Scheduled notification cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NotificationKind;

    fn message() -> PushMessage {
        PushMessage {
            title: "Reminder".to_string(),
            body: "Your ride leaves soon".to_string(),
            kind: NotificationKind::RideReminder,
            request_id: Some("req-1".to_string()),
        }
    }

    fn dispatcher(store: &MemoryStore) -> PushDispatcher {
        PushDispatcher::new(
            "http://127.0.0.1:9/push".to_string(),
            1,
            Arc::new(store.clone()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_without_push_token_writes_inbox_only() {
        let store = MemoryStore::new();
        let dispatcher = dispatcher(&store);

        let id = dispatcher.send_now("nobody", &message()).await.unwrap();

        let inbox = store.notifications_for_user("nobody", 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, id);
        assert!(inbox[0].scheduled_for.is_none());
    }

    #[tokio::test]
    async fn test_push_failure_keeps_inbox_record() {
        let store = MemoryStore::new();
        store
            .upsert_user(&crate::models::User {
                push_token: Some("ExponentPushToken[abc]".to_string()),
                ..crate::models::User::placeholder("u1")
            })
            .await
            .unwrap();
        let dispatcher = dispatcher(&store);

        let err = dispatcher.send_now("u1", &message()).await.unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));

        let inbox = store.notifications_for_user("u1", 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "Reminder");
    }

    #[tokio::test]
    async fn test_schedule_then_cancel() {
        let store = MemoryStore::new();
        let dispatcher = dispatcher(&store);
        let at = DateTime::from_timestamp(1_900_000_000, 0).unwrap();

        let id = dispatcher.schedule_at("u1", &message(), at).await.unwrap();
        let inbox = store.notifications_for_user("u1", 10).await.unwrap();
        assert_eq!(inbox[0].scheduled_for.as_deref(), Some(format_utc_rfc3339(at).as_str()));

        dispatcher.cancel(&id).await.unwrap();
        assert_eq!(store.notification_count(), 0);
    }
}
