//! # TM Server

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use comms_if::{
    gnc::HlcSetpoint,
    net::{zmq, NetParams, NetSocket, NetSocketError, SocketOptions},
};

use crate::data_store::DataStore;
use crate::guid_ctrl;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: NetSocket,
}

/// Telemetry packet that is output by the server.
#[derive(Debug, Serialize)]
pub struct TmPacket {
    /// Seconds since the session epoch
    pub elapsed_s: f64,

    /// Number of odometry samples processed
    pub num_cycles: u128,

    /// Status of the last guidance processing cycle
    pub guid_ctrl_status_rpt: guid_ctrl::StatusReport,

    /// The last setpoint published to the flight controller
    pub setpoint: HlcSetpoint,

    /// Latched begin-landing-routine state, carried here because ZMQ PUB sockets do not latch
    /// the one-shot signal for late joiners
    pub landing_routine_signaled: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(NetSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block waiting for subscribers.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = NetSocket::new(ctx, zmq::PUB, socket_options, &params.guid_tm_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish one telemetry packet built from the data store.
    pub fn send(&mut self, ds: &DataStore) -> Result<(), TmServerError> {
        let packet = TmPacket::from_datastore(ds);

        let packet_string =
            serde_json::to_string(&packet).map_err(TmServerError::SerializationError)?;

        self.socket
            .send(&packet_string, 0)
            .map_err(TmServerError::SendError)
    }
}

impl TmPacket {
    pub fn from_datastore(ds: &DataStore) -> Self {
        Self {
            elapsed_s: util::session::get_elapsed_seconds(),
            num_cycles: ds.num_cycles,
            guid_ctrl_status_rpt: ds.guid_ctrl_status_rpt,
            setpoint: ds.guid_ctrl_output.setpoint,
            landing_routine_signaled: ds.guid_ctrl.landing_routine_signaled(),
        }
    }
}
