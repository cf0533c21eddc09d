// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use ridelink::config::Config;
use ridelink::db::{FirestoreDb, MemoryStore, RideStore};
use ridelink::models::{ApprovalStatus, DriverProfile, GeoPoint, Place, Ride, User};
use ridelink::routes::create_router;
use ridelink::services::PushDispatcher;
use ridelink::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Unique id for test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Create a test app backed by an in-memory store.
/// Push calls go to an unroutable address, so every push fails fast.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let config = Config::test_default();
    let store = MemoryStore::new();
    let shared: Arc<dyn RideStore> = Arc::new(store.clone());

    let notifier = Arc::new(
        PushDispatcher::new(
            config.push_api_url.clone(),
            config.push_timeout_secs,
            shared.clone(),
        )
        .unwrap(),
    );

    let state = Arc::new(AppState::new(config, shared, notifier));
    (create_router(state.clone()), state, store)
}

/// Create a test app whose store fails every call.
#[allow(dead_code)]
pub fn create_offline_app() -> axum::Router {
    let config = Config::test_default();
    let store: Arc<dyn RideStore> = Arc::new(test_db_offline());
    let notifier = Arc::new(
        PushDispatcher::new(
            config.push_api_url.clone(),
            config.push_timeout_secs,
            store.clone(),
        )
        .unwrap(),
    );
    create_router(Arc::new(AppState::new(config, store, notifier)))
}

/// Create a session token for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    ridelink::middleware::auth::create_jwt(user_id, &Config::test_default().jwt_signing_key)
        .unwrap()
}

/// Authenticated request with an optional JSON body.
#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, user_id: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user_id)),
        );

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// An approved driver with a four-seat car.
#[allow(dead_code)]
pub fn approved_driver(id: &str) -> User {
    User {
        name: "Driver".to_string(),
        driver: Some(DriverProfile {
            car_type: "Sedan".to_string(),
            seat_count: 4,
            approval_status: ApprovalStatus::Approved,
            image_urls: vec![],
        }),
        ..User::placeholder(id)
    }
}

/// Trip date `hours` from now in the day-first format the app sends.
#[allow(dead_code)]
pub fn trip_date_in(hours: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::hours(hours))
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// A bookable ride owned by `driver_id`.
#[allow(dead_code)]
pub fn test_ride(id: &str, driver_id: &str) -> Ride {
    Ride {
        driver_id: driver_id.to_string(),
        origin: Place {
            address: "King Fahd Rd".to_string(),
            location: GeoPoint {
                latitude: 24.71,
                longitude: 46.67,
            },
        },
        destination: Place {
            address: "Airport".to_string(),
            location: GeoPoint {
                latitude: 24.96,
                longitude: 46.70,
            },
        },
        trip_date: trip_date_in(24),
        available_seats: 4,
        created_at: ridelink::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        ..Ride::placeholder(id)
    }
}
