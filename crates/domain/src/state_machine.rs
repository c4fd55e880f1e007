//! The dispatch core's single source of truth for valid state transitions.
//!
//! Pure and stateless: `validate` takes the entity kind, current state, and
//! target state, and returns `Ok(())` or a typed `InvalidTransition` carrying
//! enough detail for the HTTP layer to report `{entity, from, to, allowed}`.
//! Every repository write that changes a ride/driver/trip status is required
//! to call `validate` inside the transaction, after the row lock is acquired
//! and the current state is read — `persistence` enforces this by only
//! exposing status-changing queries through `validate_and_record`, never a
//! bare `UPDATE`.

use std::fmt;

use crate::models::driver::DriverStatus;
use crate::models::ride::RideStatus;
use crate::models::trip::TripStatus;

/// The three entity kinds the state machine governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ride,
    Driver,
    Trip,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Ride => "ride",
            EntityKind::Driver => "driver",
            EntityKind::Trip => "trip",
        };
        write!(f, "{s}")
    }
}

/// A rejected transition, carrying everything the HTTP layer needs to
/// report `{entity, from, to, allowed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub entity: EntityKind,
    pub from: String,
    pub to: String,
    pub allowed: Vec<String>,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} transition: {} -> {} (allowed: [{}])",
            self.entity,
            self.from,
            self.to,
            self.allowed.join(", ")
        )
    }
}

impl std::error::Error for InvalidTransition {}

fn ride_allowed(from: RideStatus) -> &'static [RideStatus] {
    use RideStatus::*;
    match from {
        Requested => &[Matching, Cancelled, Expired],
        Matching => &[DriverAssigned, Cancelled, Expired],
        DriverAssigned => &[Completed, Cancelled],
        Completed | Cancelled | Expired => &[],
    }
}

fn driver_allowed(from: DriverStatus) -> &'static [DriverStatus] {
    use DriverStatus::*;
    match from {
        Offline => &[Available],
        Available => &[Offline, OnTrip],
        OnTrip => &[Available, Offline],
    }
}

fn trip_allowed(from: TripStatus) -> &'static [TripStatus] {
    use TripStatus::*;
    match from {
        Created => &[Started, Cancelled],
        Started => &[Paused, Ended, Cancelled],
        Paused => &[Started, Ended, Cancelled],
        Ended | Cancelled => &[],
    }
}

/// Validates a ride status transition against the allowed-transitions table.
///
/// `DRIVER_ASSIGNED -> DRIVER_ASSIGNED` ("idempotent re-assignment") is
/// deliberately absent from the allowed set and rejected as
/// `InvalidTransition` (see DESIGN.md for the reasoning).
pub fn validate_ride(from: RideStatus, to: RideStatus) -> Result<(), InvalidTransition> {
    if ride_allowed(from).contains(&to) {
        Ok(())
    } else {
        Err(InvalidTransition {
            entity: EntityKind::Ride,
            from: format!("{from:?}"),
            to: format!("{to:?}"),
            allowed: ride_allowed(from).iter().map(|s| format!("{s:?}")).collect(),
        })
    }
}

/// Validates a driver status transition against the allowed-transitions table.
pub fn validate_driver(from: DriverStatus, to: DriverStatus) -> Result<(), InvalidTransition> {
    if driver_allowed(from).contains(&to) {
        Ok(())
    } else {
        Err(InvalidTransition {
            entity: EntityKind::Driver,
            from: format!("{from:?}"),
            to: format!("{to:?}"),
            allowed: driver_allowed(from)
                .iter()
                .map(|s| format!("{s:?}"))
                .collect(),
        })
    }
}

/// Validates a trip status transition against the allowed-transitions table.
pub fn validate_trip(from: TripStatus, to: TripStatus) -> Result<(), InvalidTransition> {
    if trip_allowed(from).contains(&to) {
        Ok(())
    } else {
        Err(InvalidTransition {
            entity: EntityKind::Trip,
            from: format!("{from:?}"),
            to: format!("{to:?}"),
            allowed: trip_allowed(from).iter().map(|s| format!("{s:?}")).collect(),
        })
    }
}

/// True when no outbound transition exists for the given ride status.
pub fn is_ride_terminal(status: RideStatus) -> bool {
    ride_allowed(status).is_empty()
}

/// True when no outbound transition exists for the given trip status.
pub fn is_trip_terminal(status: TripStatus) -> bool {
    trip_allowed(status).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use DriverStatus::*;
    use RideStatus::*;
    use TripStatus::*;

    #[test]
    fn ride_transition_table_is_exhaustively_covered() {
        let all = [Requested, Matching, DriverAssigned, Completed, Cancelled, Expired];
        for from in all {
            for to in all {
                let expect_ok = ride_allowed(from).contains(&to);
                assert_eq!(validate_ride(from, to).is_ok(), expect_ok, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn driver_assigned_to_driver_assigned_is_rejected() {
        assert!(validate_ride(DriverAssigned, DriverAssigned).is_err());
    }

    #[test]
    fn ride_terminal_states_have_no_outbound_transitions() {
        assert!(is_ride_terminal(Completed));
        assert!(is_ride_terminal(Cancelled));
        assert!(is_ride_terminal(Expired));
        assert!(!is_ride_terminal(Matching));
    }

    #[test]
    fn driver_transition_table_is_exhaustively_covered() {
        let all = [Offline, Available, OnTrip];
        for from in all {
            for to in all {
                let expect_ok = driver_allowed(from).contains(&to);
                assert_eq!(validate_driver(from, to).is_ok(), expect_ok, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn driver_has_no_terminal_state() {
        // Drivers cycle OFFLINE <-> AVAILABLE <-> ON_TRIP indefinitely.
        assert!(!driver_allowed(Offline).is_empty());
        assert!(!driver_allowed(Available).is_empty());
        assert!(!driver_allowed(OnTrip).is_empty());
    }

    #[test]
    fn trip_transition_table_is_exhaustively_covered() {
        let all = [Created, Started, Paused, Ended, Cancelled];
        for from in all {
            for to in all {
                let expect_ok = trip_allowed(from).contains(&to);
                assert_eq!(validate_trip(from, to).is_ok(), expect_ok, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn trip_terminal_states_have_no_outbound_transitions() {
        assert!(is_trip_terminal(Ended));
        assert!(is_trip_terminal(Cancelled));
        assert!(!is_trip_terminal(Started));
    }

    #[test]
    fn invalid_transition_display_includes_allowed_set() {
        let err = validate_ride(Completed, Matching).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ride"));
        assert!(msg.contains("Completed"));
        assert!(msg.contains("Matching"));
    }
}
