// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod location_share;
pub mod notification;
pub mod ride;
pub mod ride_request;
pub mod user;

pub use location_share::LocationShare;
pub use notification::{Notification, NotificationKind, PushMessage};
pub use ride::{GeoPoint, Place, RequiredGender, Ride, RideRules, RideStatus, Waypoint};
pub use ride_request::{Actor, RequestStatus, RideRequest};
pub use user::{ApprovalStatus, DriverProfile, Gender, User};
