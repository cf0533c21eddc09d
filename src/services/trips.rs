// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip lists: a user's rides as driver and bookings as passenger.
//!
//! A bounded page of each side is fetched, passenger bookings are joined
//! with their rides, and the result is split into upcoming and past.
//! Status and kind filters run in memory over that page, so the page size
//! bounds what a filter can return.

use chrono::{NaiveDateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::RideStore;
use crate::error::Result;
use crate::models::{Ride, RideRequest};
use crate::services::cache::{ride_key, trips_key, RideCache};
use crate::time_utils::wall_clock_now;

const MAX_CONCURRENT_RIDE_READS: usize = 10;

/// The user's part in a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripRole {
    Driver,
    Passenger,
}

/// One row of a trip list.
#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub role: TripRole,
    pub ride: Ride,
    /// The user's booking, for passenger trips
    pub request: Option<RideRequest>,
}

impl Trip {
    pub fn departure(&self) -> Option<NaiveDateTime> {
        self.ride.departure()
    }

    /// Status shown for this row: the booking's for passengers, the ride's for drivers.
    pub fn status(&self) -> &'static str {
        match &self.request {
            Some(request) => request.status.as_str(),
            None => self.ride.status.as_str(),
        }
    }
}

/// Whether a ride belongs in the upcoming list.
///
/// Recurring rides are always upcoming; unreadable dates count as past.
pub fn is_upcoming(ride: &Ride, now: NaiveDateTime) -> bool {
    if ride.is_recurring() {
        return true;
    }
    ride.departure().is_some_and(|departure| departure >= now)
}

/// Split trips into upcoming (soonest first) and past (latest first).
pub fn partition(trips: Vec<Trip>, now: NaiveDateTime) -> (Vec<Trip>, Vec<Trip>) {
    let (mut upcoming, mut past): (Vec<Trip>, Vec<Trip>) =
        trips.into_iter().partition(|t| is_upcoming(&t.ride, now));

    // `None` sorts first; recurring rides without a date lead the upcoming list.
    upcoming.sort_by_key(|t| t.departure());
    past.sort_by_key(|t| std::cmp::Reverse(t.departure()));
    (upcoming, past)
}

/// Which side of the user's trips to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripKind {
    #[default]
    All,
    Driver,
    Passenger,
}

/// Which half of the partition to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripScope {
    #[default]
    All,
    Upcoming,
    Past,
}

/// In-memory filter over a fetched page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripFilter {
    /// Matches the booking status for passenger rows and the ride status for driver rows
    pub status: Option<String>,
    #[serde(default)]
    pub kind: TripKind,
    #[serde(default)]
    pub scope: TripScope,
}

impl TripFilter {
    pub fn matches(&self, trip: &Trip) -> bool {
        let kind_ok = match self.kind {
            TripKind::All => true,
            TripKind::Driver => trip.role == TripRole::Driver,
            TripKind::Passenger => trip.role == TripRole::Passenger,
        };
        let status_ok = self
            .status
            .as_deref()
            .map_or(true, |status| status == "all" || trip.status() == status);
        kind_ok && status_ok
    }
}

/// Partitioned, filtered trip list.
#[derive(Debug, Clone, Serialize)]
pub struct TripList {
    pub upcoming: Vec<Trip>,
    pub past: Vec<Trip>,
}

/// Filter, partition and scope a fetched page.
pub fn build_trip_list(trips: Vec<Trip>, filter: &TripFilter, now: NaiveDateTime) -> TripList {
    let filtered: Vec<Trip> = trips.into_iter().filter(|t| filter.matches(t)).collect();
    let (upcoming, past) = partition(filtered, now);

    match filter.scope {
        TripScope::All => TripList { upcoming, past },
        TripScope::Upcoming => TripList {
            upcoming,
            past: vec![],
        },
        TripScope::Past => TripList {
            upcoming: vec![],
            past,
        },
    }
}

/// Reads trip lists through the cache.
#[derive(Clone)]
pub struct TripFeed {
    store: Arc<dyn RideStore>,
    cache: RideCache,
    page_size: u32,
    utc_offset_minutes: i32,
}

impl TripFeed {
    pub fn new(
        store: Arc<dyn RideStore>,
        cache: RideCache,
        page_size: u32,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            store,
            cache,
            page_size,
            utc_offset_minutes,
        }
    }

    /// List a user's trips, filtered and split into upcoming and past.
    pub async fn list_trips(&self, user_id: &str, filter: &TripFilter) -> Result<TripList> {
        let now = Utc::now();
        let trips = self
            .cache
            .trips()
            .get_or_fetch(&trips_key(user_id), now, || self.fetch_page(user_id))
            .await?;

        tracing::debug!(
            user_id,
            fetched = trips.len(),
            kind = ?filter.kind,
            status = ?filter.status,
            "Building trip list"
        );

        Ok(build_trip_list(
            trips,
            filter,
            wall_clock_now(now, self.utc_offset_minutes),
        ))
    }

    /// Fetch one page of driver rides and passenger bookings.
    async fn fetch_page(&self, user_id: &str) -> Result<Vec<Trip>> {
        let (rides, requests) = tokio::try_join!(
            self.store.rides_for_driver(user_id, self.page_size),
            self.store.requests_for_passenger(user_id, self.page_size),
        )?;

        let mut trips: Vec<Trip> = rides
            .into_iter()
            .map(|ride| Trip {
                role: TripRole::Driver,
                ride,
                request: None,
            })
            .collect();

        let passenger_trips = stream::iter(requests)
            .map(|request| async move {
                let ride = self.ride_for(&request.ride_id).await?;
                Ok::<_, crate::error::AppError>(Trip {
                    role: TripRole::Passenger,
                    ride,
                    request: Some(request),
                })
            })
            .buffered(MAX_CONCURRENT_RIDE_READS)
            .collect::<Vec<Result<Trip>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Trip>>>()?;

        trips.extend(passenger_trips);
        Ok(trips)
    }

    async fn ride_for(&self, ride_id: &str) -> Result<Ride> {
        self.cache
            .rides()
            .get_or_fetch(&ride_key(ride_id), Utc::now(), || async {
                Ok(self
                    .store
                    .get_ride(ride_id)
                    .await?
                    .unwrap_or_else(|| Ride::placeholder(ride_id)))
            })
            .await
    }
}
