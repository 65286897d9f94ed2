//! Proximity discovery: where the caller is, which meetups are near them,
//! and whether they may join one.

pub mod location;
pub mod participation;
pub mod proximity;

pub use location::{Location, LocationError, LocationResolver, PositionOptions, ReportedPosition};
pub use participation::{AuthUser, JoinOutcome, ParticipationError, ParticipationGate};
pub use proximity::{filter_by_radius, UNLIMITED_RADIUS_KM};
