// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    ApprovalStatus, DriverProfile, GeoPoint, Gender, LocationShare, Notification, Ride,
    RideRequest, RideStatus, User, Waypoint,
};
use crate::services::lifecycle::{NewRide, TransitionOutcome};
use crate::services::trips::{TripFilter, TripList};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const NOTIFICATION_PAGE_SIZE: u32 = 50;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/rides", post(create_ride))
        .route("/api/rides/{ride_id}", get(get_ride))
        .route("/api/rides/{ride_id}/status", patch(update_ride_status))
        .route("/api/rides/{ride_id}/seats", patch(update_ride_seats))
        .route(
            "/api/rides/{ride_id}/requests",
            get(list_ride_requests).post(book_ride),
        )
        .route("/api/requests/{request_id}/accept", post(accept_request))
        .route("/api/requests/{request_id}/reject", post(reject_request))
        .route("/api/requests/{request_id}/check-in", post(check_in))
        .route("/api/requests/{request_id}/check-out", post(check_out))
        .route("/api/requests/{request_id}/cancel", post(cancel_request))
        .route("/api/requests/{request_id}/rating", post(rate_trip))
        .route("/api/trips", get(get_trips))
        .route("/api/notifications", get(get_notifications))
        .route("/api/location-shares", get(get_location_shares))
        .route(
            "/api/location-shares/{recipient_id}",
            put(share_location).delete(stop_sharing),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile. A user without a profile document gets a placeholder.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    let profile = state
        .store
        .get_user(&user.user_id)
        .await?
        .unwrap_or_else(|| User::placeholder(&user.user_id));
    Ok(Json(profile))
}

/// Driver details a user may submit. Approval is set by an administrator.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct DriverProfileInput {
    #[validate(length(min = 1, max = 100, message = "car type is required"))]
    pub car_type: String,
    #[validate(range(min = 1, max = 8, message = "seat count must be between 1 and 8"))]
    pub seat_count: u32,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Profile update body.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    /// `male`/`female`, or the Arabic labels
    pub gender: Option<String>,
    pub push_token: Option<String>,
    #[validate(nested)]
    pub driver: Option<DriverProfileInput>,
}

/// Create or update the caller's profile.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    body.validate()?;

    let gender = body
        .gender
        .as_deref()
        .map(|raw| {
            Gender::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown gender '{}'", raw)))
        })
        .transpose()?;

    // Fetch-modify-write to keep fields the body does not carry
    let existing = state.store.get_user(&user.user_id).await?;
    let now = format_utc_rfc3339(chrono::Utc::now());
    let mut profile = existing
        .clone()
        .unwrap_or_else(|| User::placeholder(&user.user_id));

    profile.name = body.name.trim().to_string();
    profile.email = body.email.or(profile.email);
    profile.phone = body.phone.or(profile.phone);
    profile.gender = gender.or(profile.gender);
    profile.push_token = body.push_token.or(profile.push_token);

    if let Some(driver) = body.driver {
        // Changing the car sends the driver back through approval.
        let approval_status = match &profile.driver {
            Some(current)
                if current.car_type == driver.car_type
                    && current.seat_count == driver.seat_count =>
            {
                current.approval_status
            }
            _ => ApprovalStatus::Pending,
        };
        profile.driver = Some(DriverProfile {
            car_type: driver.car_type,
            seat_count: driver.seat_count,
            approval_status,
            image_urls: driver.image_urls,
        });
    }

    if existing.is_none() {
        profile.created_at = now.clone();
    }
    profile.updated_at = now;

    state.store.upsert_user(&profile).await?;
    tracing::info!(user_id = %user.user_id, "Profile updated");

    Ok(Json(profile))
}

// ─── Rides ───────────────────────────────────────────────────

async fn create_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewRide>,
) -> Result<(StatusCode, Json<Ride>)> {
    let ride = state.lifecycle.create_ride(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<String>,
) -> Result<Json<Ride>> {
    Ok(Json(state.lifecycle.get_ride(&ride_id).await?))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct RideStatusUpdate {
    pub status: RideStatus,
}

async fn update_ride_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<String>,
    Json(body): Json<RideStatusUpdate>,
) -> Result<Json<Ride>> {
    let ride = state
        .lifecycle
        .set_ride_status(&user.user_id, &ride_id, body.status)
        .await?;
    Ok(Json(ride))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct SeatsUpdate {
    pub available_seats: u32,
}

async fn update_ride_seats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<String>,
    Json(body): Json<SeatsUpdate>,
) -> Result<Json<Ride>> {
    let ride = state
        .lifecycle
        .update_seats(&user.user_id, &ride_id, body.available_seats)
        .await?;
    Ok(Json(ride))
}

// ─── Requests ────────────────────────────────────────────────

async fn list_ride_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<String>,
) -> Result<Json<Vec<RideRequest>>> {
    let requests = state
        .lifecycle
        .requests_for_ride(&user.user_id, &ride_id)
        .await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct BookingRequest {
    /// Stop where the passenger joins; omit to board at the origin
    #[serde(default)]
    pub waypoint: Option<Waypoint>,
}

async fn book_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(ride_id): Path<String>,
    body: Option<Json<BookingRequest>>,
) -> Result<(StatusCode, Json<TransitionOutcome>)> {
    let waypoint = body.and_then(|Json(body)| body.waypoint);
    let outcome = state
        .lifecycle
        .request_booking(&user.user_id, &ride_id, waypoint)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.lifecycle.accept(&user.user_id, &request_id).await?))
}

async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.lifecycle.reject(&user.user_id, &request_id).await?))
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(
        state.lifecycle.check_in(&user.user_id, &request_id).await?,
    ))
}

async fn check_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(
        state.lifecycle.check_out(&user.user_id, &request_id).await?,
    ))
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.lifecycle.cancel(&user.user_id, &request_id).await?))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct RatingRequest {
    pub rating: u8,
}

async fn rate_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Json(body): Json<RatingRequest>,
) -> Result<Json<RideRequest>> {
    let request = state
        .lifecycle
        .submit_rating(&user.user_id, &request_id, body.rating)
        .await?;
    Ok(Json(request))
}

// ─── Trips ───────────────────────────────────────────────────

/// List the caller's trips as driver and passenger.
async fn get_trips(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<TripList>> {
    tracing::debug!(user_id = %user.user_id, scope = ?filter.scope, "Fetching trips");
    Ok(Json(state.trips.list_trips(&user.user_id, &filter).await?))
}

// ─── Notifications ───────────────────────────────────────────

/// The caller's inbox. Scheduled reminders appear once their delivery time
/// has passed; the app polls this endpoint to surface them.
async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Notification>>> {
    let now = chrono::Utc::now();
    let notifications = state
        .store
        .notifications_for_user(&user.user_id, NOTIFICATION_PAGE_SIZE)
        .await?
        .into_iter()
        .filter(|n| n.is_due(now))
        .collect();
    Ok(Json(notifications))
}

// ─── Location Sharing ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct LocationSharesResponse {
    pub shares: Vec<LocationShare>,
}

/// Active shares addressed to the caller.
async fn get_location_shares(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LocationSharesResponse>> {
    let shares = state.locations.shares_for_recipient(&user.user_id).await?;
    Ok(Json(LocationSharesResponse { shares }))
}

/// Start sharing with `recipient_id`, or move an active share.
async fn share_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(recipient_id): Path<String>,
    Json(position): Json<GeoPoint>,
) -> Result<Json<LocationShare>> {
    let share = match state
        .locations
        .update_position(&user.user_id, &recipient_id, position)
        .await
    {
        Err(AppError::NotFound(_)) => {
            state
                .locations
                .start_share(&user.user_id, &recipient_id, position)
                .await?
        }
        other => other?,
    };
    Ok(Json(share))
}

async fn stop_sharing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(recipient_id): Path<String>,
) -> Result<StatusCode> {
    state
        .locations
        .stop_share(&user.user_id, &recipient_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
