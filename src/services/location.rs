// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live location sharing between two users.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::db::RideStore;
use crate::error::{AppError, Result};
use crate::models::{GeoPoint, LocationShare};
use crate::time_utils::format_utc_rfc3339;

fn check_position(position: &GeoPoint) -> Result<()> {
    if !position.is_valid() {
        return Err(AppError::Validation("coordinates out of range".to_string()));
    }
    Ok(())
}

/// Reads and writes `location_sharing` documents.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn RideStore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Create the share, or reactivate it with a fresh position.
    pub async fn start_share(
        &self,
        sharer_id: &str,
        recipient_id: &str,
        position: GeoPoint,
    ) -> Result<LocationShare> {
        check_position(&position)?;
        if sharer_id == recipient_id {
            return Err(AppError::Validation(
                "cannot share a location with yourself".to_string(),
            ));
        }

        let share = LocationShare {
            sharer_id: sharer_id.to_string(),
            recipient_id: recipient_id.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
            updated_at: format_utc_rfc3339(Utc::now()),
            active: true,
        };
        self.store.set_location_share(&share).await?;

        tracing::info!(sharer_id, recipient_id, "Location sharing started");
        Ok(share)
    }

    /// Write a new position to an active share.
    pub async fn update_position(
        &self,
        sharer_id: &str,
        recipient_id: &str,
        position: GeoPoint,
    ) -> Result<LocationShare> {
        check_position(&position)?;

        let mut share = self
            .store
            .get_location_share(sharer_id, recipient_id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active location share from {} to {}",
                    sharer_id, recipient_id
                ))
            })?;

        share.latitude = position.latitude;
        share.longitude = position.longitude;
        share.updated_at = format_utc_rfc3339(Utc::now());
        self.store.set_location_share(&share).await?;

        tracing::debug!(sharer_id, recipient_id, "Location updated");
        Ok(share)
    }

    /// Deactivate a share. Stopping a share that never existed is a no-op.
    pub async fn stop_share(&self, sharer_id: &str, recipient_id: &str) -> Result<()> {
        let Some(mut share) = self
            .store
            .get_location_share(sharer_id, recipient_id)
            .await?
        else {
            return Ok(());
        };

        share.active = false;
        share.updated_at = format_utc_rfc3339(Utc::now());
        self.store.set_location_share(&share).await?;

        tracing::info!(sharer_id, recipient_id, "Location sharing stopped");
        Ok(())
    }

    /// Active shares addressed to `recipient_id`.
    pub async fn shares_for_recipient(&self, recipient_id: &str) -> Result<Vec<LocationShare>> {
        self.store.shares_for_recipient(recipient_id).await
    }
}

/// Where the ticker gets the sharer's current position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint>;
}

/// Background task pushing positions on a fixed interval.
///
/// Dropping the ticker does not stop it; call [`LocationTicker::stop`].
pub struct LocationTicker {
    handle: JoinHandle<()>,
}

impl LocationTicker {
    pub fn start(
        service: LocationService,
        source: Arc<dyn PositionSource>,
        sharer_id: String,
        recipient_id: String,
        every: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;

                let position = match source.current_position().await {
                    Ok(position) => position,
                    Err(e) => {
                        tracing::warn!(sharer_id, error = %e, "Could not read position");
                        continue;
                    }
                };

                if let Err(e) = service
                    .update_position(&sharer_id, &recipient_id, position)
                    .await
                {
                    tracing::warn!(sharer_id, recipient_id, error = %e, "Location tick failed");
                }
            }
        });

        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn point(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    fn service() -> (LocationService, MemoryStore) {
        let store = MemoryStore::new();
        (LocationService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_update_requires_active_share() {
        let (service, _store) = service();

        let err = service
            .update_position("a", "b", point(1.0, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        service.start_share("a", "b", point(1.0, 2.0)).await.unwrap();
        let moved = service
            .update_position("a", "b", point(3.0, 4.0))
            .await
            .unwrap();
        assert_eq!((moved.latitude, moved.longitude), (3.0, 4.0));

        service.stop_share("a", "b").await.unwrap();
        assert!(service
            .update_position("a", "b", point(5.0, 6.0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_recipient_sees_only_active_shares() {
        let (service, _store) = service();
        service.start_share("a", "r", point(1.0, 1.0)).await.unwrap();
        service.start_share("b", "r", point(2.0, 2.0)).await.unwrap();
        service.stop_share("b", "r").await.unwrap();

        let shares = service.shares_for_recipient("r").await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].sharer_id, "a");

        // Restarting reactivates the same document.
        service.start_share("b", "r", point(2.5, 2.5)).await.unwrap();
        assert_eq!(service.shares_for_recipient("r").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_position_rejected() {
        let (service, _store) = service();
        assert!(matches!(
            service.start_share("a", "b", point(91.0, 0.0)).await,
            Err(AppError::Validation(_))
        ));
    }

    struct CountingSource(AtomicU32);

    #[async_trait]
    impl PositionSource for CountingSource {
        async fn current_position(&self) -> Result<GeoPoint> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(point(n as f64, 0.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_writes_until_stopped() {
        let (service, store) = service();
        service.start_share("a", "b", point(0.0, 0.0)).await.unwrap();

        let source = Arc::new(CountingSource(AtomicU32::new(0)));
        let ticker = LocationTicker::start(
            service.clone(),
            source.clone(),
            "a".to_string(),
            "b".to_string(),
            Duration::from_secs(5),
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(ticker.is_running());
        ticker.stop();
        let ticks = source.0.load(Ordering::SeqCst);
        assert!(ticks >= 2, "expected at least two ticks, got {}", ticks);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.0.load(Ordering::SeqCst), ticks);

        let share = store.get_location_share("a", "b").await.unwrap().unwrap();
        assert!(share.latitude >= 2.0);
    }
}
