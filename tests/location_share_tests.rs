// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location sharing endpoint tests.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{authed, body_json, create_test_app};

#[tokio::test]
async fn test_share_update_and_stop() {
    let (app, _, _) = create_test_app();

    // Start
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/api/location-shares/friend",
            "me",
            Some(json!({ "latitude": 24.7, "longitude": 46.7 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["active"], true);

    // Move
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/api/location-shares/friend",
            "me",
            Some(json!({ "latitude": 24.8, "longitude": 46.8 })),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["latitude"], 24.8);

    // The recipient sees it
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/location-shares", "friend", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["shares"].as_array().unwrap().len(), 1);
    assert_eq!(body["shares"][0]["sharer_id"], "me");

    // Stop
    let response = app
        .clone()
        .oneshot(authed("DELETE", "/api/location-shares/friend", "me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(authed("GET", "/api/location-shares", "friend", None))
        .await
        .unwrap();
    assert!(body_json(response).await["shares"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_invalid_position_rejected() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(authed(
            "PUT",
            "/api/location-shares/friend",
            "me",
            Some(json!({ "latitude": 24.7, "longitude": 200.0 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
