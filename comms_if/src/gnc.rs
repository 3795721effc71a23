//! # GNC wire messages
//!
//! Message definitions for the data flowing between the sensing processes, the guidance
//! executable, and the downstream flight controller. All messages are serialised as JSON so that
//! non-rust processes (the RTK driver and the flight control stack) can produce and consume them.
//!
//! Frames and units follow the NED convention used throughout the software: the local frame's
//! down axis is positive towards the ground, all positions are in meters, velocities in meters
//! per second and angles in radians.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Vehicle odometry sample.
///
/// The attitude is carried for downstream consumers, guidance itself only uses the position.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct VehicleOdom {
    /// Position of the vehicle in the local frame
    pub position_m_lm: [f64; 3],

    /// Attitude of the vehicle in the local frame, as a quaternion rotating the local frame into
    /// the vehicle body frame
    pub attitude_q_lm: [f64; 4],
}

/// RTK relative position fix, the vector from the vehicle to the platform's antenna.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct RelPos {
    /// Vehicle to platform antenna vector in the local frame
    pub rel_pos_m: [f64; 3],
}

/// Heading of the landing platform.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct PlatformHeading {
    /// Yaw of the platform body frame relative to the local frame, about the down axis
    pub heading_rad: f64,
}

/// Velocity of the landing platform.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct PlatformVel {
    /// Velocity of the platform in the local frame
    pub velocity_ms: [f64; 3],
}

/// High level command setpoint sent to the flight controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct HlcSetpoint {
    /// Target position in the local frame
    pub position_m_lm: [f64; 3],

    /// Feed forward velocity, the platform's own velocity so the vehicle tracks a moving target
    /// rather than a static point
    pub velocity_ms: [f64; 3],
}

/// One-shot signal commanding the rest of the vehicle to begin the landing routine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct LandingRoutineSignal {
    pub begin: bool,
}
