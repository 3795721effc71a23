//! # High Level Command Server
//!
//! The HlcServer publishes the two outputs of the guidance: the position+velocity setpoint
//! consumed by the flight control stack, and the one-shot begin-landing-routine signal. ZMQ PUB
//! sockets do not latch, so the signal is published on its rising edge and the latched value is
//! repeated in every telemetry packet for late joiners.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    gnc::{HlcSetpoint, LandingRoutineSignal},
    net::{zmq, NetParams, NetSocket, NetSocketError, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct HlcServer {
    setpoint_socket: NetSocket,

    landing_signal_socket: NetSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HlcServerError {
    #[error("Socket error: {0}")]
    SocketError(NetSocketError),

    #[error("Could not send the message: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HlcServer {
    /// Create a new instance of the high level command server.
    ///
    /// This function will not block waiting for subscribers.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, HlcServerError> {
        let socket_options = || SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let setpoint_socket = NetSocket::new(ctx, zmq::PUB, socket_options(), &params.hlc_endpoint)
            .map_err(HlcServerError::SocketError)?;

        let landing_signal_socket = NetSocket::new(
            ctx,
            zmq::PUB,
            socket_options(),
            &params.landing_signal_endpoint,
        )
        .map_err(HlcServerError::SocketError)?;

        Ok(Self {
            setpoint_socket,
            landing_signal_socket,
        })
    }

    /// Publish a setpoint to the flight controller.
    pub fn send_setpoint(&mut self, setpoint: &HlcSetpoint) -> Result<(), HlcServerError> {
        let setpoint_str =
            serde_json::to_string(setpoint).map_err(HlcServerError::SerializationError)?;

        self.setpoint_socket
            .send(&setpoint_str, 0)
            .map_err(HlcServerError::SendError)
    }

    /// Publish the begin-landing-routine signal.
    ///
    /// Called once, on the rising edge of the signal.
    pub fn send_landing_signal(&mut self) -> Result<(), HlcServerError> {
        let signal_str = serde_json::to_string(&LandingRoutineSignal { begin: true })
            .map_err(HlcServerError::SerializationError)?;

        self.landing_signal_socket
            .send(&signal_str, 0)
            .map_err(HlcServerError::SendError)
    }
}
