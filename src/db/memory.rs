// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store.
//!
//! Mirrors the Firestore collections with one `DashMap` each, so handlers
//! and the lifecycle controller can run without credentials.

use crate::db::RideStore;
use crate::error::AppError;
use crate::models::{LocationShare, Notification, Ride, RideRequest, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory store. Clones share the same collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    rides: Arc<DashMap<String, Ride>>,
    requests: Arc<DashMap<String, RideRequest>>,
    notifications: Arc<DashMap<String, Notification>>,
    location_shares: Arc<DashMap<String, LocationShare>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored ride requests (all statuses).
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// All notifications, including scheduled ones.
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

/// Collect matching values, newest `created_at` first, capped at `limit`.
fn newest_first<T: Clone>(
    map: &DashMap<String, T>,
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> &str,
    limit: Option<u32>,
) -> Vec<T> {
    let mut items: Vec<T> = map
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    items.sort_by(|a, b| created_at(b).cmp(created_at(a)));
    if let Some(limit) = limit {
        items.truncate(limit as usize);
    }
    items
}

#[async_trait]
impl RideStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        Ok(self.rides.get(ride_id).map(|r| r.clone()))
    }

    async fn set_ride(&self, ride: &Ride) -> Result<(), AppError> {
        self.rides.insert(ride.id.clone(), ride.clone());
        Ok(())
    }

    async fn rides_for_driver(&self, driver_id: &str, limit: u32) -> Result<Vec<Ride>, AppError> {
        Ok(newest_first(
            &self.rides,
            |r| r.driver_id == driver_id,
            |r| r.created_at.as_str(),
            Some(limit),
        ))
    }

    async fn get_request(&self, request_id: &str) -> Result<Option<RideRequest>, AppError> {
        Ok(self.requests.get(request_id).map(|r| r.clone()))
    }

    async fn set_request(&self, request: &RideRequest) -> Result<(), AppError> {
        self.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn requests_for_ride(&self, ride_id: &str) -> Result<Vec<RideRequest>, AppError> {
        let mut requests = newest_first(
            &self.requests,
            |r| r.ride_id == ride_id,
            |r| r.created_at.as_str(),
            None,
        );
        requests.reverse();
        Ok(requests)
    }

    async fn requests_for_passenger(
        &self,
        passenger_id: &str,
        limit: u32,
    ) -> Result<Vec<RideRequest>, AppError> {
        Ok(newest_first(
            &self.requests,
            |r| r.passenger_id == passenger_id,
            |r| r.created_at.as_str(),
            Some(limit),
        ))
    }

    async fn requests_for_pair(
        &self,
        ride_id: &str,
        passenger_id: &str,
    ) -> Result<Vec<RideRequest>, AppError> {
        Ok(newest_first(
            &self.requests,
            |r| r.ride_id == ride_id && r.passenger_id == passenger_id,
            |r| r.created_at.as_str(),
            None,
        ))
    }

    async fn set_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<(), AppError> {
        self.notifications.remove(notification_id);
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        recipient_id: &str,
        limit: u32,
    ) -> Result<Vec<Notification>, AppError> {
        Ok(newest_first(
            &self.notifications,
            |n| n.recipient_id == recipient_id,
            |n| n.created_at.as_str(),
            Some(limit),
        ))
    }

    async fn get_location_share(
        &self,
        sharer_id: &str,
        recipient_id: &str,
    ) -> Result<Option<LocationShare>, AppError> {
        let doc_id = LocationShare::doc_id(sharer_id, recipient_id);
        Ok(self.location_shares.get(&doc_id).map(|s| s.clone()))
    }

    async fn set_location_share(&self, share: &LocationShare) -> Result<(), AppError> {
        let doc_id = LocationShare::doc_id(&share.sharer_id, &share.recipient_id);
        self.location_shares.insert(doc_id, share.clone());
        Ok(())
    }

    async fn shares_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<LocationShare>, AppError> {
        Ok(newest_first(
            &self.location_shares,
            |s| s.active && s.recipient_id == recipient_id,
            |s| s.updated_at.as_str(),
            None,
        ))
    }
}
