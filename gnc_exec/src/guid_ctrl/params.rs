//! Parameters structure for GuidCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Guidance control.
///
/// All positions are in the local NED frame (down +ve) except where the frame suffix says
/// otherwise.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Params {
    // ---- MISSION ----

    /// The waypoints of the mission, flown in order.
    ///
    /// Units: meters,
    /// Frame: Local
    pub waypoints_m_lm: Vec<[f64; 3]>,

    /// Lever arm from the platform's reference point to its RTK antenna.
    ///
    /// Units: meters,
    /// Frame: Platform body
    pub antenna_offset_m_pb: [f64; 3],

    // ---- THRESHOLDS ----

    /// Distance from the current waypoint at which it counts as reached.
    ///
    /// Units: meters
    pub mission_threshold_m: f64,

    /// Error norm below which the rendezvous is considered converged.
    ///
    /// Units: meters
    pub rendezvous_threshold_m: f64,

    /// Error norm below which the descent is considered converged.
    ///
    /// Units: meters
    pub landing_threshold_m: f64,

    // ---- APPROACH HEIGHTS ----

    /// Height offset above the platform antenna held during rendezvous.
    ///
    /// Units: meters, down +ve (a hover above the platform is negative)
    pub rendezvous_height_m: f64,

    /// Height offset above the platform antenna targeted during descent.
    ///
    /// Units: meters, down +ve
    pub landing_height_m: f64,

    // ---- BEHAVIOUR FLAGS ----

    /// If true the mission transitions into the landing routine once the waypoint list is
    /// exhausted.
    pub auto_land: bool,

    /// If true the waypoint index wraps at the end of the list rather than holding the final
    /// waypoint.
    pub cyclical_path: bool,
}
