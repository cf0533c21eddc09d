// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! RideLink: carpooling backend
//!
//! This crate provides the backend API for offering rides, booking seats,
//! moving bookings through their lifecycle and sharing live locations.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RideStore;
use services::{
    LifecycleSettings, LocationService, NotificationDispatcher, RideCache, RideLifecycle, TripFeed,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RideStore>,
    pub lifecycle: RideLifecycle,
    pub trips: TripFeed,
    pub locations: LocationService,
}

impl AppState {
    /// Wire the services around a store and a notification dispatcher.
    pub fn new(
        config: Config,
        store: Arc<dyn RideStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let cache = RideCache::new(config.ride_cache_ttl_secs);
        let lifecycle = RideLifecycle::new(
            store.clone(),
            notifier,
            cache.clone(),
            LifecycleSettings::from_config(&config),
        );
        let trips = TripFeed::new(
            store.clone(),
            cache,
            config.trip_page_size,
            config.trip_utc_offset_minutes,
        );
        let locations = LocationService::new(store.clone());

        Self {
            config,
            store,
            lifecycle,
            trips,
            locations,
        }
    }
}
