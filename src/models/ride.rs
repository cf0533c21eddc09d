// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride offering model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::user::Gender;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// True if both coordinates are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named location on a ride's route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct Place {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub location: GeoPoint,
}

/// An intermediate stop. Same shape as the endpoints.
pub type Waypoint = Place;

/// Ride status as stored in the `rides` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    #[default]
    Available,
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Available => "available",
            RideStatus::Pending => "pending",
            RideStatus::Active => "active",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses a driver may move a ride to from `self`.
    pub fn next_states(&self) -> &'static [RideStatus] {
        use RideStatus::*;
        match self {
            Available => &[Pending, Active, Cancelled],
            Pending => &[Available, Active, Cancelled],
            Active => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(RideStatus::Available),
            "pending" => Ok(RideStatus::Pending),
            "active" => Ok(RideStatus::Active),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            other => Err(format!("unknown ride status '{}'", other)),
        }
    }
}

/// Which passengers a ride accepts.
///
/// Stored values come from an Arabic-first client, so both the Arabic labels
/// and their English equivalents are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum RequiredGender {
    #[default]
    Both,
    Male,
    Female,
}

impl RequiredGender {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" | "both" | "كلاهما" => Some(RequiredGender::Both),
            "male" | "ذكر" => Some(RequiredGender::Male),
            "female" | "أنثى" => Some(RequiredGender::Female),
            _ => None,
        }
    }

    /// Whether a passenger with the given recorded gender may book.
    pub fn admits(&self, gender: Option<Gender>) -> bool {
        match self {
            RequiredGender::Both => true,
            RequiredGender::Male => gender == Some(Gender::Male),
            RequiredGender::Female => gender == Some(Gender::Female),
        }
    }
}

impl<'de> Deserialize<'de> for RequiredGender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // Unknown values fall back to no restriction, like every other missing field.
        Ok(RequiredGender::parse(&raw).unwrap_or_default())
    }
}

/// Driver-set rule flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct RideRules {
    #[serde(default)]
    pub no_smoking: bool,
    #[serde(default)]
    pub no_children: bool,
    #[serde(default)]
    pub no_music: bool,
}

/// Stored ride record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct Ride {
    /// Document ID
    pub id: String,
    /// Owning driver (identity-provider subject)
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub origin: Place,
    #[serde(default)]
    pub destination: Place,
    /// Ordered intermediate stops
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    /// Trip date-time as entered, `DD/MM/YYYY HH:MM` or ISO
    #[serde(default)]
    pub trip_date: String,
    /// Weekday names for recurring rides; empty for one-off trips
    #[serde(default)]
    pub recurrence_days: Vec<String>,
    #[serde(default)]
    pub available_seats: u32,
    #[serde(default)]
    pub status: RideStatus,
    #[serde(default)]
    pub rules: RideRules,
    #[serde(default)]
    pub required_gender: RequiredGender,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Ride {
    /// Stand-in for a ride document that no longer exists.
    pub fn placeholder(ride_id: &str) -> Self {
        Self {
            id: ride_id.to_string(),
            driver_id: String::new(),
            origin: Place::default(),
            destination: Place::default(),
            waypoints: vec![],
            trip_date: String::new(),
            recurrence_days: vec![],
            available_seats: 0,
            status: RideStatus::default(),
            rules: RideRules::default(),
            required_gender: RequiredGender::default(),
            price: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        !self.recurrence_days.is_empty()
    }

    /// Parsed trip date-time, if the stored string is readable.
    pub fn departure(&self) -> Option<chrono::NaiveDateTime> {
        crate::time_utils::parse_trip_datetime(&self.trip_date)
    }

    pub fn has_waypoint(&self, waypoint: &Waypoint) -> bool {
        self.waypoints.iter().any(|w| w == waypoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ride_status_table() {
        assert!(RideStatus::Available.can_transition_to(RideStatus::Active));
        assert!(RideStatus::Pending.can_transition_to(RideStatus::Available));
        assert!(RideStatus::Active.can_transition_to(RideStatus::Completed));
        assert!(!RideStatus::Available.can_transition_to(RideStatus::Completed));
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_required_gender_accepts_arabic_labels() {
        assert_eq!(RequiredGender::parse("ذكر"), Some(RequiredGender::Male));
        assert_eq!(RequiredGender::parse("أنثى"), Some(RequiredGender::Female));
        assert_eq!(RequiredGender::parse("كلاهما"), Some(RequiredGender::Both));
        assert_eq!(RequiredGender::parse(""), Some(RequiredGender::Both));
        assert_eq!(RequiredGender::parse("robot"), None);
    }

    #[test]
    fn test_required_gender_admits() {
        assert!(RequiredGender::Both.admits(None));
        assert!(RequiredGender::Male.admits(Some(Gender::Male)));
        assert!(!RequiredGender::Male.admits(Some(Gender::Female)));
        assert!(!RequiredGender::Female.admits(None));
    }

    #[test]
    fn test_ride_deserializes_with_missing_fields() {
        let ride: Ride = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "required_gender": "ذكر"
        }))
        .unwrap();

        assert_eq!(ride.status, RideStatus::Available);
        assert_eq!(ride.required_gender, RequiredGender::Male);
        assert_eq!(ride.available_seats, 0);
        assert!(ride.waypoints.is_empty());
        assert!(!ride.is_recurring());
    }
}
