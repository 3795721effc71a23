//! # Guidance library.
//!
//! This library allows other crates in the workspace to access items defined inside the guidance
//! executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Guidance control module - sequences the mission phases and converts navigation inputs into
/// high level command setpoints
pub mod guid_ctrl;

/// High level command server - publishes the setpoint and the begin-landing-routine signal
pub mod hlc_server;

/// Navigation client - recieves odometry, relative position, platform heading and platform
/// velocity from the sensing processes
pub mod nav_client;

/// Telemetry server - publishes guidance telemetry to the ground
pub mod tm_server;
