//! Main guidance executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and modules
//!     - Main loop:
//!         - Cache any new relative position, platform heading and platform
//!           velocity samples into GuidCtrl
//!         - On each new odometry sample run one GuidCtrl processing cycle
//!         - Publish the resulting setpoint, the begin-landing-routine signal
//!           on its rising edge, and a telemetry packet
//!
//! The loop is event driven: odometry is the only event which produces a
//! command, the other inputs are consumed last-value-wins and picked up at the
//! next odometry sample.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use gnc_lib::{
    data_store::DataStore,
    guid_ctrl,
    hlc_server::HlcServer,
    nav_client::{NavClient, NavClientError},
    tm_server::TmServer,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use nalgebra::Vector3;
use std::thread;
use std::time::Duration;

// Internal
use comms_if::net::NetParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time to sleep when no new odometry sample is waiting.
const IDLE_SLEEP_MS: u64 = 2;

/// Limit on the number of consecutive input receive errors before the executable gives up.
const MAX_RECV_ERROR_LIMIT: u64 = 100;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("gnc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Osprey Guidance Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE AND MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.guid_ctrl
        .init("guid_ctrl.toml", &session)
        .wrap_err("Failed to initialise GuidCtrl")?;
    info!("GuidCtrl init complete");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut nav_client = {
        let c = NavClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the NavClient")?;
        info!("NavClient initialised");
        c
    };

    let mut hlc_server = {
        let s = HlcServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the HlcServer")?;
        info!("HlcServer initialised");
        s
    };

    let mut tm_server = {
        let s =
            TmServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the TmServer")?;
        info!("TmServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // ---- CACHE-ONLY INPUTS ----

        // These inputs don't trigger processing, they are cached in GuidCtrl and used at the
        // next odometry sample. A failed receive means the next command is computed from stale
        // values, which is the accepted degradation mode.
        match nav_client.get_rel_pos() {
            Ok(Some(rel_pos)) => ds
                .guid_ctrl
                .set_relative_position(Vector3::from(rel_pos.rel_pos_m)),
            Ok(None) => (),
            Err(e) => input_recv_error(&mut ds, "relative position", e)?,
        }

        match nav_client.get_platform_heading() {
            Ok(Some(heading)) => ds.guid_ctrl.set_platform_heading(heading.heading_rad),
            Ok(None) => (),
            Err(e) => input_recv_error(&mut ds, "platform heading", e)?,
        }

        match nav_client.get_platform_vel() {
            Ok(Some(vel)) => ds
                .guid_ctrl
                .set_platform_velocity(Vector3::from(vel.velocity_ms)),
            Ok(None) => (),
            Err(e) => input_recv_error(&mut ds, "platform velocity", e)?,
        }

        // ---- GUIDANCE PROCESSING ----

        let odom = match nav_client.get_odom() {
            Ok(Some(odom)) => odom,
            Ok(None) => {
                // No new odometry, nothing to do this iteration
                thread::sleep(Duration::from_millis(IDLE_SLEEP_MS));
                continue;
            }
            Err(e) => {
                input_recv_error(&mut ds, "odometry", e)?;
                continue;
            }
        };

        ds.num_consec_recv_errors = 0;
        ds.cycle_start();

        // A proc error here is a programming bug (the index invariant was violated), not a
        // condition to recover from, so it aborts the executable.
        let (output, status_rpt) = ds
            .guid_ctrl
            .proc(&guid_ctrl::InputData {
                vehicle_pos_m_lm: Vector3::from(odom.position_m_lm),
            })
            .wrap_err("GuidCtrl processing failed")?;

        ds.guid_ctrl_output = output;
        ds.guid_ctrl_status_rpt = status_rpt;

        // ---- OUTPUT PUBLICATION ----

        if output.begin_landing_routine {
            info!("Begin landing routine");

            if let Err(e) = hlc_server.send_landing_signal() {
                warn!("Could not publish the landing routine signal: {}", e);
            }
        }

        if let Err(e) = hlc_server.send_setpoint(&output.setpoint) {
            warn!("Could not publish the setpoint: {}", e);
        }

        if let Err(e) = tm_server.send(&ds) {
            warn!("Could not publish telemetry: {}", e);
        }
    }
}

/// Handle a receive error on one of the input streams.
///
/// Individual errors are logged and tolerated, a long unbroken run of them aborts the
/// executable.
fn input_recv_error(ds: &mut DataStore, stream: &str, error: NavClientError) -> Result<(), Report> {
    warn!("Could not receive {} update: {}", stream, error);

    ds.num_consec_recv_errors += 1;

    if ds.num_consec_recv_errors > MAX_RECV_ERROR_LIMIT {
        return Err(eyre!(
            "Exceeded the limit of {} consecutive input receive errors",
            MAX_RECV_ERROR_LIMIT
        ));
    }

    Ok(())
}
