// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride request lifecycle.
//!
//! Handles the booking workflow:
//! 1. Validate preconditions (ownership, status table, gender, seats)
//! 2. Write the new status to the store
//! 3. Plan side effects for the transition
//! 4. Dispatch them at most once, logging failures
//!
//! The store has no multi-document transactions, so a status write that
//! succeeds can be followed by a notification that fails. The outcome
//! reports each effect so callers can tell.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::db::RideStore;
use crate::error::{AppError, Result};
use crate::models::{
    Actor, ApprovalStatus, GeoPoint, NotificationKind, Place, PushMessage, RequestStatus,
    RequiredGender, Ride, RideRequest, RideRules, RideStatus, User, Waypoint,
};
use crate::services::cache::{ride_key, RideCache};
use crate::services::notifications::NotificationDispatcher;
use crate::time_utils::{format_utc_rfc3339, validate_departure, wall_clock_now};

const MAX_CONCURRENT_EFFECTS: usize = 8;

/// Largest seat capacity a ride may advertise.
pub const MAX_SEATS: u32 = 8;

// ─── Side Effects ────────────────────────────────────────────────

/// Something a transition asks the outside world to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    /// Immediate push plus inbox record
    Notify {
        recipient_id: String,
        message: PushMessage,
    },
    /// Reminder before departure; the id is stored on the request
    ScheduleReminder {
        recipient_id: String,
        role: Actor,
        message: PushMessage,
        at: DateTime<Utc>,
    },
    CancelReminder { notification_id: String },
    /// Ask the passenger to rate the trip
    RatingPrompt {
        passenger_id: String,
        request_id: String,
    },
    /// Refresh the seat counter shown on the ride
    SeatCount {
        ride_id: String,
        available_seats: u32,
        accepted: u32,
    },
}

/// What happened when a side effect was dispatched.
#[derive(Debug, Clone, Serialize)]
pub struct EffectReport {
    pub effect: SideEffect,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a lifecycle operation.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub request: RideRequest,
    pub effects: Vec<EffectReport>,
}

impl TransitionOutcome {
    pub fn rating_prompt(&self) -> bool {
        self.effects
            .iter()
            .any(|r| matches!(r.effect, SideEffect::RatingPrompt { .. }))
    }
}

fn message(kind: NotificationKind, title: &str, body: String, request_id: &str) -> PushMessage {
    PushMessage {
        title: title.to_string(),
        body,
        kind,
        request_id: Some(request_id.to_string()),
    }
}

fn route(ride: &Ride) -> String {
    format!("{} → {}", ride.origin.address, ride.destination.address)
}

/// Plan the side effects of moving `request` into `to`.
///
/// `request` is the state before the move. `reminder_at` is when the
/// departure reminder should fire, if one applies.
pub fn plan_side_effects(
    request: &RideRequest,
    to: RequestStatus,
    ride: &Ride,
    accepted: u32,
    reminder_at: Option<DateTime<Utc>>,
) -> Vec<SideEffect> {
    let id = request.id.as_str();
    let notify = |recipient: &str, kind: NotificationKind, title: &str, body: String| {
        SideEffect::Notify {
            recipient_id: recipient.to_string(),
            message: message(kind, title, body, id),
        }
    };
    let seat_count = SideEffect::SeatCount {
        ride_id: ride.id.clone(),
        available_seats: ride.available_seats,
        accepted,
    };

    match to {
        RequestStatus::Waiting => vec![notify(
            &request.driver_id,
            NotificationKind::NewRequest,
            "New ride request",
            format!("A passenger wants to join {}", route(ride)),
        )],
        RequestStatus::Accepted => {
            let mut effects = vec![
                notify(
                    &request.passenger_id,
                    NotificationKind::RequestAccepted,
                    "Request accepted",
                    format!("Your seat on {} is confirmed", route(ride)),
                ),
                seat_count,
            ];
            if let Some(at) = reminder_at {
                for (recipient, role) in [
                    (&request.passenger_id, Actor::Passenger),
                    (&request.driver_id, Actor::Driver),
                ] {
                    effects.push(SideEffect::ScheduleReminder {
                        recipient_id: recipient.clone(),
                        role,
                        message: message(
                            NotificationKind::RideReminder,
                            "Ride reminder",
                            format!("{} departs at {}", route(ride), ride.trip_date),
                            id,
                        ),
                        at,
                    });
                }
            }
            effects
        }
        RequestStatus::Rejected => vec![notify(
            &request.passenger_id,
            NotificationKind::RequestRejected,
            "Request declined",
            format!("The driver declined your request for {}", route(ride)),
        )],
        RequestStatus::CheckedIn => vec![notify(
            &request.driver_id,
            NotificationKind::PassengerCheckedIn,
            "Passenger on board",
            format!("A passenger checked in on {}", route(ride)),
        )],
        RequestStatus::CheckedOut => vec![
            SideEffect::RatingPrompt {
                passenger_id: request.passenger_id.clone(),
                request_id: request.id.clone(),
            },
            notify(
                &request.driver_id,
                NotificationKind::PassengerCheckedOut,
                "Passenger dropped off",
                format!("A passenger checked out of {}", route(ride)),
            ),
        ],
        RequestStatus::Cancelled => {
            let mut effects: Vec<SideEffect> = [
                request.notification_id.as_ref(),
                request.driver_notification_id.as_ref(),
            ]
            .into_iter()
            .flatten()
            .map(|nid| SideEffect::CancelReminder {
                notification_id: nid.clone(),
            })
            .collect();
            effects.push(notify(
                &request.driver_id,
                NotificationKind::RequestCancelled,
                "Booking cancelled",
                format!("A passenger cancelled their seat on {}", route(ride)),
            ));
            if matches!(
                request.status,
                RequestStatus::Accepted | RequestStatus::CheckedIn
            ) {
                effects.push(seat_count);
            }
            effects
        }
    }
}

// ─── Inputs ──────────────────────────────────────────────────────

/// Form submitted by a driver to offer a ride.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRide {
    #[validate(length(min = 1, message = "origin address is required"))]
    pub origin_address: String,
    pub origin: GeoPoint,
    #[validate(length(min = 1, message = "destination address is required"))]
    pub destination_address: String,
    pub destination: GeoPoint,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[validate(length(min = 1, message = "trip date is required"))]
    pub trip_date: String,
    #[serde(default)]
    pub recurrence_days: Vec<String>,
    #[validate(range(min = 1, max = 8, message = "seats must be between 1 and 8"))]
    pub available_seats: u32,
    #[serde(default)]
    pub rules: RideRules,
    #[serde(default)]
    pub required_gender: RequiredGender,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: Option<f64>,
}

/// Tunables taken from config.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    pub reminder_lead_minutes: i64,
    pub min_lead_minutes: i64,
    pub trip_utc_offset_minutes: i32,
}

impl LifecycleSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            reminder_lead_minutes: config.reminder_lead_minutes,
            min_lead_minutes: config.min_lead_minutes,
            trip_utc_offset_minutes: config.trip_utc_offset_minutes,
        }
    }

    /// Convert a wall-clock trip time to UTC.
    fn to_utc(&self, wall_clock: NaiveDateTime) -> DateTime<Utc> {
        FixedOffset::east_opt(self.trip_utc_offset_minutes * 60)
            .and_then(|offset| offset.from_local_datetime(&wall_clock).single())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&wall_clock))
    }
}

// ─── Controller ──────────────────────────────────────────────────

/// Drives rides and ride requests through their status machines.
#[derive(Clone)]
pub struct RideLifecycle {
    store: Arc<dyn RideStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    cache: RideCache,
    settings: LifecycleSettings,
}

impl RideLifecycle {
    pub fn new(
        store: Arc<dyn RideStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        cache: RideCache,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            cache,
            settings,
        }
    }

    fn now_wall_clock(&self) -> NaiveDateTime {
        wall_clock_now(Utc::now(), self.settings.trip_utc_offset_minutes)
    }

    // ─── Rides ───────────────────────────────────────────────────

    /// Create a ride offered by `driver_id`.
    pub async fn create_ride(&self, driver_id: &str, form: NewRide) -> Result<Ride> {
        form.validate()?;

        if !form.origin.is_valid() || !form.destination.is_valid() {
            return Err(AppError::Validation("coordinates out of range".to_string()));
        }
        if form.waypoints.iter().any(|w| !w.location.is_valid()) {
            return Err(AppError::Validation(
                "waypoint coordinates out of range".to_string(),
            ));
        }

        let driver = self
            .store
            .get_user(driver_id)
            .await?
            .and_then(|u| u.driver)
            .ok_or_else(|| AppError::Forbidden("driver profile required".to_string()))?;

        if driver.approval_status != ApprovalStatus::Approved {
            return Err(AppError::Forbidden("driver is not approved yet".to_string()));
        }
        if driver.seat_count > 0 && form.available_seats > driver.seat_count {
            return Err(AppError::Validation(format!(
                "car has only {} seats",
                driver.seat_count
            )));
        }

        if form.recurrence_days.is_empty() {
            validate_departure(
                &form.trip_date,
                self.now_wall_clock(),
                self.settings.min_lead_minutes,
            )?;
        } else if crate::time_utils::parse_trip_datetime(&form.trip_date).is_none() {
            return Err(AppError::Validation(format!(
                "trip date '{}' is not a valid date and time",
                form.trip_date
            )));
        }

        let now = format_utc_rfc3339(Utc::now());
        let ride = Ride {
            id: uuid::Uuid::new_v4().to_string(),
            driver_id: driver_id.to_string(),
            origin: Place {
                address: form.origin_address.trim().to_string(),
                location: form.origin,
            },
            destination: Place {
                address: form.destination_address.trim().to_string(),
                location: form.destination,
            },
            waypoints: form.waypoints,
            trip_date: form.trip_date.trim().to_string(),
            recurrence_days: form.recurrence_days,
            available_seats: form.available_seats,
            status: RideStatus::Available,
            rules: form.rules,
            required_gender: form.required_gender,
            price: form.price,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.set_ride(&ride).await?;
        self.cache.invalidate_ride(&ride.id, &[driver_id]);

        tracing::info!(ride_id = %ride.id, driver_id, "Ride created");
        Ok(ride)
    }

    /// Read a ride through the cache.
    pub async fn get_ride(&self, ride_id: &str) -> Result<Ride> {
        self.cache
            .rides()
            .get_or_fetch(&ride_key(ride_id), Utc::now(), || async {
                self.store
                    .get_ride(ride_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))
            })
            .await
    }

    /// Live read, bypassing the cache, for precondition checks.
    async fn load_ride(&self, ride_id: &str) -> Result<Ride> {
        self.store
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))
    }

    async fn load_owned_ride(&self, driver_id: &str, ride_id: &str) -> Result<Ride> {
        let ride = self.load_ride(ride_id).await?;
        if ride.driver_id != driver_id {
            return Err(AppError::Forbidden(format!(
                "ride {} belongs to another driver",
                ride_id
            )));
        }
        Ok(ride)
    }

    /// Move a ride to a new status.
    pub async fn set_ride_status(
        &self,
        driver_id: &str,
        ride_id: &str,
        status: RideStatus,
    ) -> Result<Ride> {
        let mut ride = self.load_owned_ride(driver_id, ride_id).await?;

        if !ride.status.can_transition_to(status) {
            return Err(AppError::Validation(format!(
                "ride cannot move from {} to {}",
                ride.status, status
            )));
        }

        let from = ride.status;
        ride.status = status;
        ride.updated_at = format_utc_rfc3339(Utc::now());
        self.store.set_ride(&ride).await?;
        self.invalidate_for_ride(&ride).await;

        tracing::info!(ride_id, %from, to = %status, "Ride status changed");
        Ok(ride)
    }

    /// Change the advertised seat count.
    pub async fn update_seats(&self, driver_id: &str, ride_id: &str, seats: u32) -> Result<Ride> {
        if seats > MAX_SEATS {
            return Err(AppError::Validation(format!(
                "seats must be between 0 and {}",
                MAX_SEATS
            )));
        }

        let mut ride = self.load_owned_ride(driver_id, ride_id).await?;
        if ride.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "ride is {} and can no longer change",
                ride.status
            )));
        }

        ride.available_seats = seats;
        ride.updated_at = format_utc_rfc3339(Utc::now());
        self.store.set_ride(&ride).await?;
        self.invalidate_for_ride(&ride).await;

        tracing::info!(ride_id, seats, "Ride seats updated");
        Ok(ride)
    }

    /// All requests on a ride, for its driver.
    pub async fn requests_for_ride(&self, driver_id: &str, ride_id: &str) -> Result<Vec<RideRequest>> {
        self.load_owned_ride(driver_id, ride_id).await?;
        self.store.requests_for_ride(ride_id).await
    }

    /// Drop cached copies of the ride and of every affected trip list.
    async fn invalidate_for_ride(&self, ride: &Ride) {
        let mut users: Vec<String> = vec![ride.driver_id.clone()];
        match self.store.requests_for_ride(&ride.id).await {
            Ok(requests) => users.extend(requests.into_iter().map(|r| r.passenger_id)),
            Err(e) => tracing::warn!(ride_id = %ride.id, error = %e, "Could not list passengers for cache invalidation"),
        }
        let refs: Vec<&str> = users.iter().map(String::as_str).collect();
        self.cache.invalidate_ride(&ride.id, &refs);
    }

    // ─── Requests ────────────────────────────────────────────────

    /// Book a seat: `none → waiting`.
    pub async fn request_booking(
        &self,
        passenger_id: &str,
        ride_id: &str,
        waypoint: Option<Waypoint>,
    ) -> Result<TransitionOutcome> {
        let ride = self.load_ride(ride_id).await?;

        if ride.id.is_empty() || ride.driver_id.is_empty() {
            return Err(AppError::Validation("ride has no driver".to_string()));
        }
        if ride.driver_id == passenger_id {
            return Err(AppError::Validation("cannot book your own ride".to_string()));
        }
        if ride.status != RideStatus::Available {
            return Err(AppError::Validation(format!(
                "ride is {} and not open for booking",
                ride.status
            )));
        }
        if ride.available_seats == 0 {
            return Err(AppError::Validation("ride has no free seats".to_string()));
        }

        let passenger = self
            .store
            .get_user(passenger_id)
            .await?
            .unwrap_or_else(|| User::placeholder(passenger_id));
        if !ride.required_gender.admits(passenger.gender) {
            tracing::info!(ride_id, passenger_id, "Booking refused: gender restriction");
            return Err(AppError::Validation(
                "this ride is restricted to another gender".to_string(),
            ));
        }

        if let Some(waypoint) = &waypoint {
            if !ride.has_waypoint(waypoint) {
                return Err(AppError::Validation(
                    "chosen stop is not on this ride".to_string(),
                ));
            }
        }

        let existing = self.store.requests_for_pair(ride_id, passenger_id).await?;
        if let Some(live) = existing.iter().find(|r| r.status.is_live()) {
            return Err(AppError::Conflict(format!(
                "request {} for this ride is already {}",
                live.id, live.status
            )));
        }

        let now = format_utc_rfc3339(Utc::now());
        let request = RideRequest {
            id: uuid::Uuid::new_v4().to_string(),
            ride_id: ride.id.clone(),
            passenger_id: passenger_id.to_string(),
            driver_id: ride.driver_id.clone(),
            status: RequestStatus::Waiting,
            rating: None,
            waypoint,
            notification_id: None,
            driver_notification_id: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.set_request(&request).await?;
        self.cache
            .invalidate_ride(&ride.id, &[passenger_id, ride.driver_id.as_str()]);

        tracing::info!(
            request_id = %request.id,
            ride_id,
            passenger_id,
            "Booking requested"
        );

        let effects = plan_side_effects(&request, RequestStatus::Waiting, &ride, 0, None);
        let effects = self.dispatch(effects).await;
        Ok(TransitionOutcome { request, effects })
    }

    pub async fn accept(&self, driver_id: &str, request_id: &str) -> Result<TransitionOutcome> {
        self.transition(driver_id, request_id, RequestStatus::Accepted)
            .await
    }

    pub async fn reject(&self, driver_id: &str, request_id: &str) -> Result<TransitionOutcome> {
        self.transition(driver_id, request_id, RequestStatus::Rejected)
            .await
    }

    pub async fn check_in(&self, passenger_id: &str, request_id: &str) -> Result<TransitionOutcome> {
        self.transition(passenger_id, request_id, RequestStatus::CheckedIn)
            .await
    }

    pub async fn check_out(&self, passenger_id: &str, request_id: &str) -> Result<TransitionOutcome> {
        self.transition(passenger_id, request_id, RequestStatus::CheckedOut)
            .await
    }

    pub async fn cancel(&self, passenger_id: &str, request_id: &str) -> Result<TransitionOutcome> {
        self.transition(passenger_id, request_id, RequestStatus::Cancelled)
            .await
    }

    async fn load_request(&self, request_id: &str) -> Result<RideRequest> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))
    }

    fn check_actor(request: &RideRequest, actor: Actor, user_id: &str) -> Result<()> {
        let owner = match actor {
            Actor::Driver => &request.driver_id,
            Actor::Passenger => &request.passenger_id,
        };
        if owner != user_id {
            return Err(AppError::Forbidden(format!(
                "only the {} can do this",
                actor.as_str()
            )));
        }
        Ok(())
    }

    /// When the departure reminder for `ride` should fire.
    ///
    /// Recurring rides and rides whose departure has passed get none. A
    /// reminder whose lead time already elapsed fires immediately.
    fn reminder_time(&self, ride: &Ride) -> Option<DateTime<Utc>> {
        if ride.is_recurring() {
            return None;
        }
        let departure = self.settings.to_utc(ride.departure()?);
        let now = Utc::now();
        if departure <= now {
            return None;
        }
        Some((departure - Duration::minutes(self.settings.reminder_lead_minutes)).max(now))
    }

    async fn transition(
        &self,
        user_id: &str,
        request_id: &str,
        to: RequestStatus,
    ) -> Result<TransitionOutcome> {
        let before = self.load_request(request_id).await?;
        Self::check_actor(&before, to.actor(), user_id)?;

        if !before.status.can_transition_to(to) {
            return Err(AppError::InvalidTransition {
                from: before.status,
                to,
            });
        }

        let ride = match self.store.get_ride(&before.ride_id).await? {
            Some(ride) => ride,
            None => {
                tracing::warn!(ride_id = %before.ride_id, "Ride missing, continuing with placeholder");
                Ride {
                    driver_id: before.driver_id.clone(),
                    ..Ride::placeholder(&before.ride_id)
                }
            }
        };

        let mut request = before.clone();
        request.status = to;
        request.updated_at = format_utc_rfc3339(Utc::now());
        if to == RequestStatus::Cancelled {
            request.notification_id = None;
            request.driver_notification_id = None;
        }

        self.store.set_request(&request).await?;
        self.cache
            .invalidate_ride(&ride.id, &[request.passenger_id.as_str(), request.driver_id.as_str()]);

        tracing::info!(
            request_id,
            ride_id = %request.ride_id,
            from = %before.status,
            to = %to,
            "Request status changed"
        );

        let accepted = match to {
            RequestStatus::Accepted | RequestStatus::Cancelled => {
                self.accepted_count(&ride.id).await
            }
            _ => 0,
        };
        let reminder_at = if to == RequestStatus::Accepted {
            self.reminder_time(&ride)
        } else {
            None
        };

        let effects = plan_side_effects(&before, to, &ride, accepted, reminder_at);
        let effects = self.dispatch(effects).await;

        if to == RequestStatus::Accepted {
            self.store_reminder_ids(&mut request, &effects).await;
        }

        Ok(TransitionOutcome { request, effects })
    }

    /// Passengers currently holding a seat, after the write.
    async fn accepted_count(&self, ride_id: &str) -> u32 {
        match self.store.requests_for_ride(ride_id).await {
            Ok(requests) => requests
                .iter()
                .filter(|r| matches!(r.status, RequestStatus::Accepted | RequestStatus::CheckedIn))
                .count() as u32,
            Err(e) => {
                tracing::warn!(ride_id, error = %e, "Could not count accepted requests");
                0
            }
        }
    }

    /// Persist scheduled reminder ids on the request. Best-effort second write.
    ///
    /// The request is re-read first: if it left `Accepted` while the
    /// reminders were being scheduled, the stored status wins and the fresh
    /// reminders are cancelled instead of attached.
    async fn store_reminder_ids(&self, request: &mut RideRequest, effects: &[EffectReport]) {
        let mut passenger_reminder = None;
        let mut driver_reminder = None;
        for report in effects {
            if let SideEffect::ScheduleReminder { role, .. } = &report.effect {
                match role {
                    Actor::Passenger => passenger_reminder = report.notification_id.clone(),
                    Actor::Driver => driver_reminder = report.notification_id.clone(),
                }
            }
        }

        if passenger_reminder.is_none() && driver_reminder.is_none() {
            return;
        }

        let current = match self.store.get_request(&request.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                tracing::warn!(request_id = %request.id, "Request vanished before reminder ids were stored");
                self.cancel_reminders([passenger_reminder, driver_reminder]).await;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "Failed to re-read request; reminder cannot be cancelled later"
                );
                return;
            }
        };

        if current.status != RequestStatus::Accepted {
            tracing::info!(
                request_id = %request.id,
                status = %current.status,
                "Request changed while scheduling reminders, dropping them"
            );
            self.cancel_reminders([passenger_reminder, driver_reminder]).await;
            *request = current;
            return;
        }

        let mut updated = current;
        updated.notification_id = passenger_reminder;
        updated.driver_notification_id = driver_reminder;

        if let Err(e) = self.store.set_request(&updated).await {
            tracing::warn!(
                request_id = %request.id,
                error = %e,
                "Failed to store reminder id; reminder cannot be cancelled later"
            );
        }
        *request = updated;
    }

    async fn cancel_reminders(&self, ids: [Option<String>; 2]) {
        for id in ids.into_iter().flatten() {
            if let Err(e) = self.notifier.cancel(&id).await {
                tracing::warn!(notification_id = %id, error = %e, "Failed to cancel orphaned reminder");
            }
        }
    }

    /// Rate a finished trip.
    pub async fn submit_rating(
        &self,
        passenger_id: &str,
        request_id: &str,
        rating: u8,
    ) -> Result<RideRequest> {
        if !crate::models::ride_request::RATING_RANGE.contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let mut request = self.load_request(request_id).await?;
        Self::check_actor(&request, Actor::Passenger, passenger_id)?;

        if request.status != RequestStatus::CheckedOut {
            return Err(AppError::Validation(format!(
                "only finished trips can be rated; request is {}",
                request.status
            )));
        }

        request.rating = Some(rating);
        request.updated_at = format_utc_rfc3339(Utc::now());
        self.store.set_request(&request).await?;

        tracing::info!(request_id, rating, "Trip rated");
        Ok(request)
    }

    // ─── Dispatch ────────────────────────────────────────────────

    /// Run side effects concurrently, at most once each, preserving order.
    async fn dispatch(&self, effects: Vec<SideEffect>) -> Vec<EffectReport> {
        stream::iter(effects)
            .map(|effect| async move { self.dispatch_one(effect).await })
            .buffered(MAX_CONCURRENT_EFFECTS)
            .collect()
            .await
    }

    async fn dispatch_one(&self, effect: SideEffect) -> EffectReport {
        let result = match &effect {
            SideEffect::Notify {
                recipient_id,
                message,
            } => self.notifier.send_now(recipient_id, message).await.map(Some),
            SideEffect::ScheduleReminder {
                recipient_id,
                message,
                at,
                ..
            } => self
                .notifier
                .schedule_at(recipient_id, message, *at)
                .await
                .map(Some),
            SideEffect::CancelReminder { notification_id } => {
                self.notifier.cancel(notification_id).await.map(|_| None)
            }
            SideEffect::RatingPrompt {
                passenger_id,
                request_id,
            } => {
                let prompt = message(
                    NotificationKind::RatingPrompt,
                    "How was your trip?",
                    "Rate your driver from 1 to 5".to_string(),
                    request_id,
                );
                self.notifier.send_now(passenger_id, &prompt).await.map(Some)
            }
            // Display-only; the client renders it from the outcome.
            SideEffect::SeatCount { .. } => Ok(None),
        };

        match result {
            Ok(notification_id) => EffectReport {
                effect,
                delivered: true,
                notification_id,
                error: None,
            },
            Err(e) => {
                tracing::warn!(effect = ?effect, error = %e, "Side effect failed, not retrying");
                EffectReport {
                    effect,
                    delivered: false,
                    notification_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
