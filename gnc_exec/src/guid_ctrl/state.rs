//! Guidance control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use nalgebra::{Rotation3, Vector3};

// Internal
use super::*;
use comms_if::gnc::HlcSetpoint;
use serde::Serialize;
use util::{maths::heading_rotation, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The guidance state machine.
///
/// One instance of this struct owns the whole mission state: the immutable parameters, the
/// current phase, the waypoint index and the last-value-wins cache of navigation inputs. The
/// odometry sample delivered through [`State::proc`] is the single event that produces a command,
/// the other inputs are cached through the `set_*` functions and picked up on the next proc.
pub struct GuidCtrl {
    params: Params,

    /// Current mission phase
    phase: MissionPhase,

    /// Index of the waypoint currently being flown to.
    ///
    /// Only meaningful while in `FollowingMission`. Kept within the bounds of the waypoint list
    /// by the transition logic.
    current_waypoint_index: usize,

    /// True once the begin-landing-routine signal has been raised. Never reset.
    landing_routine_signaled: bool,

    // ---- CACHED INPUTS ----
    /// Vehicle position in the local frame, refreshed on every proc call
    vehicle_pos_m_lm: Vector3<f64>,

    /// RTK relative position, vehicle to platform antenna, in the local frame
    rel_pos_m: Vector3<f64>,

    /// Rotation taking platform body frame vectors into the local frame, rebuilt from each
    /// heading sample
    platform_rot: Rotation3<f64>,

    /// Platform velocity used as the feed forward term of the setpoint
    platform_vel_ms: Vector3<f64>,

    // ---- CYCLE DATA ----
    output_data: OutputData,
    report: StatusReport,
}

/// Input data to the module, one odometry sample.
#[derive(Copy, Clone)]
pub struct InputData {
    /// Vehicle position in the local frame
    pub vehicle_pos_m_lm: Vector3<f64>,
}

/// Data output by the module on each proc call.
#[derive(Default, Copy, Clone)]
pub struct OutputData {
    /// The high level command setpoint for the flight controller
    pub setpoint: HlcSetpoint,

    /// True only on the tick the autoland transition fires. The caller publishes the one-shot
    /// begin-landing-routine signal when it sees this edge.
    pub begin_landing_routine: bool,
}

/// The status report containing monitoring quantities for telemetry.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// The phase after any transition taken this tick
    pub phase: Option<MissionPhase>,

    /// The waypoint index after any advance taken this tick
    pub waypoint_index: usize,

    /// The norm of the guidance error evaluated this tick.
    ///
    /// In `FollowingMission` this is the distance to the current waypoint, in the approach
    /// phases it is the norm of the approach error.
    pub error_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GuidCtrl {
    fn default() -> Self {
        Self {
            params: Params::default(),
            phase: MissionPhase::default(),
            current_waypoint_index: 0,
            landing_routine_signaled: false,
            vehicle_pos_m_lm: Vector3::zeros(),
            rel_pos_m: Vector3::zeros(),
            platform_rot: Rotation3::identity(),
            platform_vel_ms: Vector3::zeros(),
            output_data: OutputData::default(),
            report: StatusReport::default(),
        }
    }
}

impl State for GuidCtrl {
    type InitData = &'static str;
    type InitError = GuidCtrlInitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = GuidCtrlError;

    /// Initialise the GuidCtrl module.
    ///
    /// Expected init data is a path to the parameter file. An invalid mission configuration
    /// (empty waypoint list, non-finite values) is rejected here so that it can never reach the
    /// guidance laws.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        // Load the parameters
        let params: Params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(GuidCtrlInitError::ParamLoadError(e)),
        };

        validate_params(&params)?;
        self.params = params;

        Ok(())
    }

    /// Process one odometry sample into a high level command setpoint.
    ///
    /// Processing involves:
    ///  1. Caching the vehicle position.
    ///  2. Executing the guidance law of the current phase, which may advance the phase and/or
    ///     the waypoint index.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Setup cycle data
        self.vehicle_pos_m_lm = input_data.vehicle_pos_m_lm;
        self.output_data = OutputData::default();
        self.report = StatusReport::default();

        // Phase execution. Each of the phase functions fills in the output data and may advance
        // the phase for the next tick.
        match self.phase {
            MissionPhase::FollowingMission => self.phase_fly_mission(),
            MissionPhase::Rendezvous => self.phase_rendezvous(),
            MissionPhase::Descend => self.phase_descend(),
            MissionPhase::Land => self.phase_land(),
        }?;

        // Report the state as it stands after any transitions this tick
        self.report.phase = Some(self.phase);
        self.report.waypoint_index = self.current_waypoint_index;

        Ok((self.output_data, self.report))
    }
}

impl GuidCtrl {
    /// Build a GuidCtrl directly from a parameter struct.
    ///
    /// Used where the parameters are obtained from somewhere other than a parameter file. The
    /// same mission validation as [`State::init`] applies.
    pub fn from_params(params: Params) -> Result<Self, GuidCtrlInitError> {
        validate_params(&params)?;

        Ok(Self {
            params,
            ..Self::default()
        })
    }

    /// The current mission phase.
    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    /// True once the begin-landing-routine signal has been raised.
    pub fn landing_routine_signaled(&self) -> bool {
        self.landing_routine_signaled
    }

    /// Cache a new RTK relative position sample.
    ///
    /// Takes effect on the next proc call.
    pub fn set_relative_position(&mut self, rel_pos_m: Vector3<f64>) {
        self.rel_pos_m = rel_pos_m;
    }

    /// Cache a new platform heading sample.
    ///
    /// Rebuilds the platform body to local rotation. Only the heading is modelled, roll and
    /// pitch of the platform are not.
    pub fn set_platform_heading(&mut self, heading_rad: f64) {
        self.platform_rot = heading_rotation(heading_rad);
    }

    /// Cache a new platform velocity sample.
    ///
    /// Takes effect as the feed forward term on the next proc call.
    pub fn set_platform_velocity(&mut self, velocity_ms: Vector3<f64>) {
        self.platform_vel_ms = velocity_ms;
    }

    /// Phase following mission.
    ///
    /// Flies the waypoint list in order. The setpoint issued on the tick a waypoint is reached
    /// is still that waypoint, the index advance takes effect from the next tick.
    fn phase_fly_mission(&mut self) -> Result<(), GuidCtrlError> {
        let num_waypoints = self.params.waypoints_m_lm.len();

        // ---- TARGET MANAGEMENT ----

        let waypoint = match self.params.waypoints_m_lm.get(self.current_waypoint_index) {
            Some(wp) => Vector3::from(*wp),
            None => {
                return Err(GuidCtrlError::WaypointIndexOutOfBounds {
                    index: self.current_waypoint_index,
                    num_waypoints,
                })
            }
        };

        let error_m = (waypoint - self.vehicle_pos_m_lm).norm();

        if error_m < self.params.mission_threshold_m {
            info!("Reached waypoint {}", self.current_waypoint_index + 1);
            self.current_waypoint_index += 1;

            // Exhausting the list with autoland enabled commits the mission to the landing
            // routine. The signal is raised exactly once.
            if self.current_waypoint_index == num_waypoints && self.params.auto_land {
                self.phase = MissionPhase::Rendezvous;
                info!("All waypoints reached, entering Rendezvous phase");

                if !self.landing_routine_signaled {
                    self.landing_routine_signaled = true;
                    self.output_data.begin_landing_routine = true;
                }
            }

            if self.params.cyclical_path {
                self.current_waypoint_index %= num_waypoints;
            } else if self.current_waypoint_index == num_waypoints {
                // Hold at the final waypoint indefinitely
                self.current_waypoint_index -= 1;
            }
        }

        // ---- COMMAND GENERATION ----

        self.output_data.setpoint = HlcSetpoint {
            position_m_lm: waypoint.into(),
            velocity_ms: [0.0; 3],
        };
        self.report.error_m = error_m;

        Ok(())
    }

    /// Phase rendezvous.
    ///
    /// Station keeps at the rendezvous height above the platform antenna, feeding the platform's
    /// own velocity forward so a moving platform is tracked rather than chased. Converging to
    /// within the rendezvous threshold starts the descent.
    fn phase_rendezvous(&mut self) -> Result<(), GuidCtrlError> {
        let error = self.approach_error(self.params.rendezvous_height_m);

        if error.norm() < self.params.rendezvous_threshold_m {
            self.phase = MissionPhase::Descend;
            info!("Rendezvous converged, entering Descend phase");
        }

        self.set_approach_setpoint(error);

        Ok(())
    }

    /// Phase descend.
    ///
    /// Same law as rendezvous but targeting the landing height. Converging to within the landing
    /// threshold commits the vehicle to touchdown.
    fn phase_descend(&mut self) -> Result<(), GuidCtrlError> {
        let error = self.approach_error(self.params.landing_height_m);

        if error.norm() < self.params.landing_threshold_m {
            self.phase = MissionPhase::Land;
            info!("Descent converged, entering Land phase");
        }

        self.set_approach_setpoint(error);

        Ok(())
    }

    /// Phase land, terminal.
    ///
    /// Targets a point [`LAND_COMMIT_DEPTH_M`] below the antenna, through the deck, to drive a
    /// firm final descent. There is no further transition.
    fn phase_land(&mut self) -> Result<(), GuidCtrlError> {
        let error = self.approach_error(LAND_COMMIT_DEPTH_M);

        self.set_approach_setpoint(error);

        Ok(())
    }

    /// The approach error for the given height offset above the platform antenna.
    ///
    /// This is the vector from the vehicle to the target point: the relative position to the
    /// antenna, plus the height offset on the down axis, plus the antenna lever arm rotated from
    /// the platform body frame into the local frame.
    fn approach_error(&self, height_offset_m: f64) -> Vector3<f64> {
        self.rel_pos_m
            + Vector3::new(0.0, 0.0, height_offset_m)
            + self.platform_rot * Vector3::from(self.params.antenna_offset_m_pb)
    }

    /// Fill in the output setpoint for an approach phase.
    ///
    /// The target is the vehicle's own position displaced by the approach error, with the
    /// platform velocity as the feed forward term.
    fn set_approach_setpoint(&mut self, error: Vector3<f64>) {
        let target = self.vehicle_pos_m_lm + error;

        self.output_data.setpoint = HlcSetpoint {
            position_m_lm: target.into(),
            velocity_ms: self.platform_vel_ms.into(),
        };
        self.report.error_m = error.norm();
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: MissionPhase) {
        self.phase = phase;
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that a mission configuration is flyable.
fn validate_params(params: &Params) -> Result<(), GuidCtrlInitError> {
    if params.waypoints_m_lm.is_empty() {
        return Err(GuidCtrlInitError::NoWaypoints);
    }

    if !params.waypoints_m_lm.iter().flatten().all(|v| v.is_finite()) {
        return Err(GuidCtrlInitError::NonFiniteParam("waypoints_m_lm"));
    }
    if !params.antenna_offset_m_pb.iter().all(|v| v.is_finite()) {
        return Err(GuidCtrlInitError::NonFiniteParam("antenna_offset_m_pb"));
    }

    let scalars = [
        (params.mission_threshold_m, "mission_threshold_m"),
        (params.rendezvous_threshold_m, "rendezvous_threshold_m"),
        (params.landing_threshold_m, "landing_threshold_m"),
        (params.rendezvous_height_m, "rendezvous_height_m"),
        (params.landing_height_m, "landing_height_m"),
    ];

    for &(value, name) in scalars.iter() {
        if !value.is_finite() {
            return Err(GuidCtrlInitError::NonFiniteParam(name));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// Default mission used by most tests, values from the reference mission profile.
    fn test_params() -> Params {
        Params {
            waypoints_m_lm: vec![[0.0, 0.0, -2.0]],
            antenna_offset_m_pb: [0.0; 3],
            mission_threshold_m: 0.3,
            rendezvous_threshold_m: 0.3,
            landing_threshold_m: 0.1,
            rendezvous_height_m: -2.0,
            landing_height_m: -0.15,
            auto_land: false,
            cyclical_path: false,
        }
    }

    /// Step the machine with one odometry sample.
    fn step(guid: &mut GuidCtrl, pos: [f64; 3]) -> (OutputData, StatusReport) {
        guid.proc(&InputData {
            vehicle_pos_m_lm: Vector3::from(pos),
        })
        .unwrap()
    }

    #[test]
    fn reject_empty_waypoint_list() {
        let mut params = test_params();
        params.waypoints_m_lm.clear();

        assert!(matches!(
            GuidCtrl::from_params(params),
            Err(GuidCtrlInitError::NoWaypoints)
        ));
    }

    #[test]
    fn reject_non_finite_params() {
        let mut params = test_params();
        params.mission_threshold_m = f64::NAN;
        assert!(matches!(
            GuidCtrl::from_params(params),
            Err(GuidCtrlInitError::NonFiniteParam("mission_threshold_m"))
        ));

        let mut params = test_params();
        params.waypoints_m_lm = vec![[0.0, f64::INFINITY, -2.0]];
        assert!(matches!(
            GuidCtrl::from_params(params),
            Err(GuidCtrlInitError::NonFiniteParam("waypoints_m_lm"))
        ));
    }

    #[test]
    fn hold_final_waypoint() {
        // Non-cyclical, no autoland: once the single waypoint is reached the machine keeps
        // commanding it and never changes phase.
        let mut guid = GuidCtrl::from_params(test_params()).unwrap();

        for _ in 0..10 {
            let (out, rpt) = step(&mut guid, [0.0, 0.1, -2.0]);

            assert_eq!(out.setpoint.position_m_lm, [0.0, 0.0, -2.0]);
            assert_eq!(out.setpoint.velocity_ms, [0.0; 3]);
            assert_eq!(rpt.waypoint_index, 0);
            assert_eq!(guid.phase(), MissionPhase::FollowingMission);
        }
    }

    #[test]
    fn cyclical_path_wraps() {
        let mut params = test_params();
        params.waypoints_m_lm = vec![[0.0, 0.0, -2.0], [5.0, 0.0, -2.0]];
        params.cyclical_path = true;

        let mut guid = GuidCtrl::from_params(params).unwrap();

        // Reach waypoint 0: the setpoint this tick is still waypoint 0, the advance takes
        // effect next tick
        let (out, rpt) = step(&mut guid, [0.1, 0.0, -2.0]);
        assert_eq!(out.setpoint.position_m_lm, [0.0, 0.0, -2.0]);
        assert_eq!(rpt.waypoint_index, 1);

        // Reach waypoint 1: the index wraps back to 0 rather than terminating
        let (out, rpt) = step(&mut guid, [4.9, 0.0, -2.0]);
        assert_eq!(out.setpoint.position_m_lm, [5.0, 0.0, -2.0]);
        assert_eq!(rpt.waypoint_index, 0);
        assert_eq!(guid.phase(), MissionPhase::FollowingMission);
    }

    #[test]
    fn waypoint_index_stays_in_bounds() {
        let mut params = test_params();
        params.waypoints_m_lm = vec![[0.0, 0.0, -2.0], [5.0, 0.0, -2.0]];
        params.cyclical_path = true;

        let mut guid = GuidCtrl::from_params(params.clone()).unwrap();

        // Chase the commanded waypoint for several laps of the cycle
        let mut pos = [0.0, 0.0, -2.0];
        for _ in 0..20 {
            let (out, rpt) = step(&mut guid, pos);
            assert!(rpt.waypoint_index < params.waypoints_m_lm.len());
            pos = out.setpoint.position_m_lm;
        }
    }

    #[test]
    fn autoland_fires_signal_exactly_once() {
        let mut params = test_params();
        params.auto_land = true;

        let mut guid = GuidCtrl::from_params(params).unwrap();

        // Far from the waypoint, nothing happens
        let (out, _) = step(&mut guid, [10.0, 0.0, 0.0]);
        assert!(!out.begin_landing_routine);
        assert_eq!(guid.phase(), MissionPhase::FollowingMission);

        // Reaching the final waypoint transitions to Rendezvous and raises the signal on the
        // same tick
        let (out, rpt) = step(&mut guid, [0.0, 0.0, -1.9]);
        assert!(out.begin_landing_routine);
        assert_eq!(rpt.phase, Some(MissionPhase::Rendezvous));
        assert!(guid.landing_routine_signaled());

        // The signal is never raised again no matter how many ticks follow
        for _ in 0..10 {
            let (out, _) = step(&mut guid, [0.0, 0.0, -1.9]);
            assert!(!out.begin_landing_routine);
        }
    }

    #[test]
    fn rendezvous_law() {
        let mut guid = GuidCtrl::from_params(test_params()).unwrap();
        guid.force_phase(MissionPhase::Rendezvous);

        // rel = (1,0,0), height = -2, no lever arm, vehicle at origin: the target is the point
        // 2m above the antenna
        guid.set_relative_position(Vector3::new(1.0, 0.0, 0.0));
        let (out, rpt) = step(&mut guid, [0.0, 0.0, 0.0]);

        assert_eq!(out.setpoint.position_m_lm, [1.0, 0.0, -2.0]);
        // Error norm is well above the threshold so the phase holds
        assert_eq!(rpt.phase, Some(MissionPhase::Rendezvous));

        // The target is a displacement from the vehicle, not an absolute point
        let (out, _) = step(&mut guid, [3.0, -1.0, -0.5]);
        assert_eq!(out.setpoint.position_m_lm, [4.0, -1.0, -2.5]);
    }

    #[test]
    fn rendezvous_converges_to_descend() {
        let mut params = test_params();
        params.rendezvous_height_m = -0.2;
        params.rendezvous_threshold_m = 0.3;

        let mut guid = GuidCtrl::from_params(params).unwrap();
        guid.force_phase(MissionPhase::Rendezvous);

        // Error is (0.1, 0, -0.2), norm ~0.224 < 0.3, so this tick transitions to Descend
        guid.set_relative_position(Vector3::new(0.1, 0.0, 0.0));
        let (_, rpt) = step(&mut guid, [0.0, 0.0, 0.0]);

        assert!(rpt.error_m < 0.3);
        assert_eq!(rpt.phase, Some(MissionPhase::Descend));
        assert_eq!(guid.phase(), MissionPhase::Descend);
    }

    #[test]
    fn descend_converges_to_land() {
        let mut guid = GuidCtrl::from_params(test_params()).unwrap();
        guid.force_phase(MissionPhase::Descend);

        // landing_height = -0.15, rel = (0,0,0.1): error (0,0,-0.05), norm < 0.1
        guid.set_relative_position(Vector3::new(0.0, 0.0, 0.1));
        let (_, rpt) = step(&mut guid, [0.0, 0.0, -0.1]);
        assert_eq!(rpt.phase, Some(MissionPhase::Land));
    }

    #[test]
    fn land_commits_through_the_deck() {
        let mut guid = GuidCtrl::from_params(test_params()).unwrap();
        guid.force_phase(MissionPhase::Land);
        guid.set_relative_position(Vector3::new(0.0, 0.0, 0.2));
        guid.set_platform_velocity(Vector3::new(1.5, 0.0, 0.0));

        for _ in 0..5 {
            let (out, rpt) = step(&mut guid, [0.0, 0.0, -0.2]);

            // Target is LAND_COMMIT_DEPTH_M below the antenna regardless of convergence
            assert_eq!(out.setpoint.position_m_lm, [0.0, 0.0, 5.0]);
            assert_eq!(out.setpoint.velocity_ms, [1.5, 0.0, 0.0]);

            // Land is terminal
            assert_eq!(rpt.phase, Some(MissionPhase::Land));
        }
    }

    #[test]
    fn antenna_lever_arm_is_rotated_by_heading() {
        let mut params = test_params();
        params.antenna_offset_m_pb = [1.0, 0.0, 0.0];
        params.rendezvous_height_m = -2.0;

        let mut guid = GuidCtrl::from_params(params).unwrap();
        guid.force_phase(MissionPhase::Rendezvous);

        // Platform at a quarter turn: the body x lever arm points along local y
        guid.set_platform_heading(FRAC_PI_2);
        guid.set_relative_position(Vector3::new(2.0, 0.0, 0.0));

        let (out, _) = step(&mut guid, [0.0, 0.0, 0.0]);

        let target = Vector3::from(out.setpoint.position_m_lm);
        assert!((target - Vector3::new(2.0, 1.0, -2.0)).norm() < 1e-9);
    }

    #[test]
    fn feed_forward_velocity_tracks_platform() {
        let mut guid = GuidCtrl::from_params(test_params()).unwrap();

        // In mission flight the feed forward is zero even if a platform velocity is cached
        guid.set_platform_velocity(Vector3::new(2.0, 0.5, 0.0));
        let (out, _) = step(&mut guid, [10.0, 0.0, 0.0]);
        assert_eq!(out.setpoint.velocity_ms, [0.0; 3]);

        // In the approach phases the cached platform velocity is fed forward
        guid.force_phase(MissionPhase::Rendezvous);
        let (out, _) = step(&mut guid, [10.0, 0.0, 0.0]);
        assert_eq!(out.setpoint.velocity_ms, [2.0, 0.5, 0.0]);
    }

    #[test]
    fn phase_never_regresses() {
        // Run a full scripted mission and check the phase index is monotonic throughout
        let mut params = test_params();
        params.waypoints_m_lm = vec![[0.0, 0.0, -2.0], [5.0, 0.0, -2.0]];
        params.auto_land = true;

        let mut guid = GuidCtrl::from_params(params).unwrap();

        let phase_order = |p: MissionPhase| match p {
            MissionPhase::FollowingMission => 0,
            MissionPhase::Rendezvous => 1,
            MissionPhase::Descend => 2,
            MissionPhase::Land => 3,
        };

        // The platform sits 10m east, the vehicle teleports to each commanded target while the
        // relative position shrinks towards convergence
        let script: Vec<([f64; 3], [f64; 3])> = vec![
            ([0.0, 0.0, -2.0], [10.0, 0.0, 2.0]),
            ([5.0, 0.0, -2.0], [5.0, 0.0, 2.0]),
            ([5.0, 0.0, -2.0], [0.1, 0.0, 1.9]),
            ([5.1, 0.0, -0.1], [0.05, 0.0, 0.05]),
            ([5.1, 0.0, 0.0], [0.0, 0.0, 0.15]),
            ([5.1, 0.0, 0.1], [0.0, 0.0, 0.0]),
        ];

        let mut last_order = 0;
        for (pos, rel) in script {
            guid.set_relative_position(Vector3::from(rel));
            let (_, rpt) = step(&mut guid, pos);

            let order = phase_order(rpt.phase.unwrap());
            assert!(order >= last_order, "phase regressed");
            last_order = order;
        }

        assert_eq!(guid.phase(), MissionPhase::Land);
    }
}
