// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod lifecycle;
pub mod location;
pub mod notifications;
pub mod trips;

pub use cache::RideCache;
pub use lifecycle::{LifecycleSettings, NewRide, RideLifecycle, SideEffect, TransitionOutcome};
pub use location::{LocationService, LocationTicker, PositionSource};
pub use notifications::{NotificationDispatcher, PushDispatcher};
pub use trips::{TripFeed, TripFilter, TripList};
