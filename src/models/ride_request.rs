// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride request model and its status machine.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ride::Waypoint;

/// Lowest and highest accepted rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Status of a passenger's booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Waiting,
    Accepted,
    Rejected,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Waiting => "waiting",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::CheckedIn => "checked_in",
            RequestStatus::CheckedOut => "checked_out",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable in one step from `self`.
    pub fn next_states(&self) -> &'static [RequestStatus] {
        use RequestStatus::*;
        match self {
            Waiting => &[Accepted, Rejected],
            Accepted => &[CheckedIn, Cancelled],
            CheckedIn => &[CheckedOut, Cancelled],
            Rejected | CheckedOut | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// A live request blocks another booking for the same (ride, passenger).
    pub fn is_live(&self) -> bool {
        !matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled)
    }

    /// Who may drive the transition into `self`.
    pub fn actor(&self) -> Actor {
        match self {
            RequestStatus::Accepted | RequestStatus::Rejected => Actor::Driver,
            _ => Actor::Passenger,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RequestStatus::Waiting),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            "checked_in" => Ok(RequestStatus::CheckedIn),
            "checked_out" => Ok(RequestStatus::CheckedOut),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// Party allowed to perform a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Driver,
    Passenger,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Driver => "driver",
            Actor::Passenger => "passenger",
        }
    }
}

/// Stored ride request record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct RideRequest {
    /// Document ID
    pub id: String,
    #[serde(default)]
    pub ride_id: String,
    #[serde(default)]
    pub passenger_id: String,
    /// Copied from the ride at booking time so the driver can query directly
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub status: RequestStatus,
    /// 1-5, set after check-out
    #[serde(default)]
    pub rating: Option<u8>,
    /// Where the passenger joins, if not at the origin
    #[serde(default)]
    pub waypoint: Option<Waypoint>,
    /// Passenger's outstanding reminder, cancelled if the booking is cancelled
    #[serde(default)]
    pub notification_id: Option<String>,
    /// Driver's copy of the same reminder
    #[serde(default)]
    pub driver_notification_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    const ALL: [RequestStatus; 6] = [Waiting, Accepted, Rejected, CheckedIn, CheckedOut, Cancelled];

    #[test]
    fn test_waiting_only_reaches_accept_or_reject() {
        let reachable: Vec<_> = ALL.iter().filter(|s| Waiting.can_transition_to(**s)).collect();
        assert_eq!(reachable, vec![&Accepted, &Rejected]);
    }

    #[test]
    fn test_accepted_and_checked_in_successors() {
        let from_accepted: Vec<_> = ALL.iter().filter(|s| Accepted.can_transition_to(**s)).collect();
        assert_eq!(from_accepted, vec![&CheckedIn, &Cancelled]);

        let from_checked_in: Vec<_> = ALL.iter().filter(|s| CheckedIn.can_transition_to(**s)).collect();
        assert_eq!(from_checked_in, vec![&CheckedOut, &Cancelled]);
    }

    #[test]
    fn test_terminal_states() {
        for status in [Rejected, CheckedOut, Cancelled] {
            assert!(status.is_terminal(), "{} should be terminal", status);
            assert!(ALL.iter().all(|s| !status.can_transition_to(*s)));
        }
        assert!(!Waiting.is_terminal());
    }

    #[test]
    fn test_liveness_and_actor() {
        assert!(Waiting.is_live());
        assert!(CheckedOut.is_live());
        assert!(!Rejected.is_live());
        assert!(!Cancelled.is_live());

        assert_eq!(Accepted.actor(), Actor::Driver);
        assert_eq!(Rejected.actor(), Actor::Driver);
        assert_eq!(CheckedIn.actor(), Actor::Passenger);
        assert_eq!(Cancelled.actor(), Actor::Passenger);
    }

    #[test]
    fn test_status_string_round_trip_matches_serde() {
        for status in ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }
}
