//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation3, Vector3};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the rotation taking a vector from a body frame into the local frame
/// for a body at the given heading (yaw, radians, about the local down axis).
///
/// Only the heading is modelled, roll and pitch of the body are not.
pub fn heading_rotation(heading_rad: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), heading_rad)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_heading_rotation() {
        // A quarter turn takes the body x axis onto the local y axis
        let rot = heading_rotation(FRAC_PI_2);
        let rotated = rot * Vector3::new(1.0, 0.0, 0.0);

        assert!((rotated - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-9);

        // Rotation about the vertical never changes the down component
        let rotated = rot * Vector3::new(0.3, -0.2, 0.7);
        assert!((rotated[2] - 0.7).abs() < 1e-12);
    }
}
