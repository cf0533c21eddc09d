//! Database layer (Firestore, plus an in-process store for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{LocationShare, Notification, Ride, RideRequest, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const RIDES: &str = "rides";
    pub const RIDE_REQUESTS: &str = "ride_requests";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const LOCATION_SHARING: &str = "location_sharing";
}

/// Typed access to the document collections.
///
/// There are no multi-document transactions: every method is a single
/// read or a single write, and callers sequence them best-effort.
#[async_trait]
pub trait RideStore: Send + Sync {
    // ─── Users ──────────────────────────────────────────────────
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Rides ──────────────────────────────────────────────────
    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError>;
    async fn set_ride(&self, ride: &Ride) -> Result<(), AppError>;
    /// Most recently created rides of a driver, newest first.
    async fn rides_for_driver(&self, driver_id: &str, limit: u32) -> Result<Vec<Ride>, AppError>;

    // ─── Ride Requests ──────────────────────────────────────────
    async fn get_request(&self, request_id: &str) -> Result<Option<RideRequest>, AppError>;
    async fn set_request(&self, request: &RideRequest) -> Result<(), AppError>;
    async fn requests_for_ride(&self, ride_id: &str) -> Result<Vec<RideRequest>, AppError>;
    /// Most recent requests of a passenger, newest first.
    async fn requests_for_passenger(
        &self,
        passenger_id: &str,
        limit: u32,
    ) -> Result<Vec<RideRequest>, AppError>;
    async fn requests_for_pair(
        &self,
        ride_id: &str,
        passenger_id: &str,
    ) -> Result<Vec<RideRequest>, AppError>;

    // ─── Notifications ──────────────────────────────────────────
    async fn set_notification(&self, notification: &Notification) -> Result<(), AppError>;
    async fn delete_notification(&self, notification_id: &str) -> Result<(), AppError>;
    /// Newest first.
    async fn notifications_for_user(
        &self,
        recipient_id: &str,
        limit: u32,
    ) -> Result<Vec<Notification>, AppError>;

    // ─── Location Sharing ───────────────────────────────────────
    async fn get_location_share(
        &self,
        sharer_id: &str,
        recipient_id: &str,
    ) -> Result<Option<LocationShare>, AppError>;
    async fn set_location_share(&self, share: &LocationShare) -> Result<(), AppError>;
    /// Active shares addressed to `recipient_id`.
    async fn shares_for_recipient(&self, recipient_id: &str)
        -> Result<Vec<LocationShare>, AppError>;
}
