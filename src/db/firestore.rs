// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles with optional driver record)
//! - Rides and ride requests
//! - Notifications (in-app inbox and scheduled reminders)
//! - Location sharing

use crate::db::{collections, RideStore};
use crate::error::AppError;
use crate::models::{LocationShare, Notification, Ride, RideRequest, User};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials, so skip the metadata lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, doc_id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_doc<T>(&self, collection: &str, doc_id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RideStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, user_id).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.put_doc(collections::USERS, &user.id, user).await
    }

    // ─── Ride Operations ─────────────────────────────────────────

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        self.get_doc(collections::RIDES, ride_id).await
    }

    async fn set_ride(&self, ride: &Ride) -> Result<(), AppError> {
        self.put_doc(collections::RIDES, &ride.id, ride).await
    }

    async fn rides_for_driver(&self, driver_id: &str, limit: u32) -> Result<Vec<Ride>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(|q| q.field("driver_id").eq(driver_id))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Ride Request Operations ─────────────────────────────────

    async fn get_request(&self, request_id: &str) -> Result<Option<RideRequest>, AppError> {
        self.get_doc(collections::RIDE_REQUESTS, request_id).await
    }

    async fn set_request(&self, request: &RideRequest) -> Result<(), AppError> {
        self.put_doc(collections::RIDE_REQUESTS, &request.id, request)
            .await
    }

    async fn requests_for_ride(&self, ride_id: &str) -> Result<Vec<RideRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDE_REQUESTS)
            .filter(|q| q.field("ride_id").eq(ride_id))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn requests_for_passenger(
        &self,
        passenger_id: &str,
        limit: u32,
    ) -> Result<Vec<RideRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDE_REQUESTS)
            .filter(|q| q.field("passenger_id").eq(passenger_id))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn requests_for_pair(
        &self,
        ride_id: &str,
        passenger_id: &str,
    ) -> Result<Vec<RideRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDE_REQUESTS)
            .filter(|q| {
                q.for_all([
                    q.field("ride_id").eq(ride_id),
                    q.field("passenger_id").eq(passenger_id),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Notification Operations ─────────────────────────────────

    async fn set_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.put_doc(collections::NOTIFICATIONS, &notification.id, notification)
            .await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::NOTIFICATIONS)
            .document_id(notification_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        recipient_id: &str,
        limit: u32,
    ) -> Result<Vec<Notification>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(|q| q.field("recipient_id").eq(recipient_id))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Location Sharing Operations ─────────────────────────────

    async fn get_location_share(
        &self,
        sharer_id: &str,
        recipient_id: &str,
    ) -> Result<Option<LocationShare>, AppError> {
        let doc_id = LocationShare::doc_id(sharer_id, recipient_id);
        self.get_doc(collections::LOCATION_SHARING, &doc_id).await
    }

    async fn set_location_share(&self, share: &LocationShare) -> Result<(), AppError> {
        let doc_id = LocationShare::doc_id(&share.sharer_id, &share.recipient_id);
        self.put_doc(collections::LOCATION_SHARING, &doc_id, share)
            .await
    }

    async fn shares_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<LocationShare>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LOCATION_SHARING)
            .filter(|q| {
                q.for_all([
                    q.field("recipient_id").eq(recipient_id),
                    q.field("active").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
