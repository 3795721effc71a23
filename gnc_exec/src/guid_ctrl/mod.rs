//! # Guidance control module
//!
//! GuidCtrl is the guidance state machine for the staged rendezvous-and-landing manoeuvre onto
//! the moving platform. It consumes the vehicle's own odometry plus the RTK relative position,
//! heading and velocity of the platform, and produces one high level command setpoint per
//! odometry sample. The mission is sequenced through four phases:
//!
//! - `FollowingMission` - fly the configured waypoint list.
//! - `Rendezvous` - station keep at the rendezvous height above the platform's antenna.
//! - `Descend` - close to the landing height above the antenna.
//! - `Land` - commit to touchdown by driving below the platform deck.
//!
//! Phase progression is strictly one way. Once the vehicle has committed to the landing there is
//! no path back to waypoint flight, matching the irreversibility of the physical manoeuvre.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Commanded depth below the platform antenna during the `Land` phase.
///
/// The vehicle deliberately targets a point this far through the deck so that the final approach
/// is a firm, committed descent rather than an asymptotic hover.
///
/// Units: meters, down +ve.
pub const LAND_COMMIT_DEPTH_M: f64 = 5.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The phases of the landing mission.
///
/// Under nominal operation the phase only ever advances in the order given here. Each phase is
/// handled by a `phase_xyz` function on [`GuidCtrl`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MissionPhase {
    /// Flying the configured waypoint list
    FollowingMission,

    /// Closing on the station keeping point above the platform
    Rendezvous,

    /// Descending towards the platform antenna
    Descend,

    /// Committed to touchdown, terminal
    Land,
}

/// Potential errors that could occur during initialisation of the module.
#[derive(Debug, thiserror::Error)]
pub enum GuidCtrlInitError {
    #[error("Could not load GuidCtrl parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The waypoint list is empty, at least one waypoint is required")]
    NoWaypoints,

    #[error("Parameter {0} is not finite")]
    NonFiniteParam(&'static str),
}

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum GuidCtrlError {
    /// The waypoint index left the bounds of the waypoint list. The transition logic keeps the
    /// index in bounds, so this is a programming error rather than a runtime condition.
    #[error("Waypoint index {index} is out of bounds for a list of {num_waypoints} waypoints")]
    WaypointIndexOutOfBounds { index: usize, num_waypoints: usize },
}

impl Default for MissionPhase {
    fn default() -> Self {
        MissionPhase::FollowingMission
    }
}
