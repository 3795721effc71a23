//! # Navigation Client
//!
//! The NavClient subscribes to the four input streams the guidance needs: vehicle odometry, the
//! RTK relative position to the platform antenna, the platform heading and the platform velocity.
//! Each stream arrives on its own PUB/SUB endpoint and is consumed last-value-wins, so every
//! subscriber socket is conflated and only ever hands the most recent sample to the caller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::de::DeserializeOwned;

use comms_if::{
    gnc::{PlatformHeading, PlatformVel, RelPos, VehicleOdom},
    net::{zmq, NetParams, NetSocket, NetSocketError, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct NavClient {
    odom_socket: NetSocket,

    rel_pos_socket: NetSocket,

    heading_socket: NetSocket,

    vel_socket: NetSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NavClientError {
    #[error("Socket error: {0}")]
    SocketError(NetSocketError),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Recieved a message which is not valid utf8")]
    InvalidUtf8,

    #[error("Could not deserialize the recieved message: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavClient {
    /// Create a new instance of the navigation client.
    ///
    /// This will connect a conflated subscriber to each of the four input endpoints given in the
    /// network parameters.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, NavClientError> {
        Ok(Self {
            odom_socket: sub_socket(ctx, &params.odom_endpoint)?,
            rel_pos_socket: sub_socket(ctx, &params.rel_pos_endpoint)?,
            heading_socket: sub_socket(ctx, &params.platform_heading_endpoint)?,
            vel_socket: sub_socket(ctx, &params.platform_vel_endpoint)?,
        })
    }

    /// Get the latest odometry sample, or `None` if no new sample has arrived.
    pub fn get_odom(&mut self) -> Result<Option<VehicleOdom>, NavClientError> {
        recv_json(&mut self.odom_socket)
    }

    /// Get the latest relative position fix, or `None` if no new fix has arrived.
    pub fn get_rel_pos(&mut self) -> Result<Option<RelPos>, NavClientError> {
        recv_json(&mut self.rel_pos_socket)
    }

    /// Get the latest platform heading, or `None` if no new sample has arrived.
    pub fn get_platform_heading(&mut self) -> Result<Option<PlatformHeading>, NavClientError> {
        recv_json(&mut self.heading_socket)
    }

    /// Get the latest platform velocity, or `None` if no new sample has arrived.
    pub fn get_platform_vel(&mut self) -> Result<Option<PlatformVel>, NavClientError> {
        recv_json(&mut self.vel_socket)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create one conflated subscriber socket.
fn sub_socket(ctx: &zmq::Context, endpoint: &str) -> Result<NetSocket, NavClientError> {
    // One sample in the queue is enough, stale samples are dropped by zmq itself
    let socket_options = SocketOptions {
        conflate: true,
        recv_timeout: 0,
        linger: 1,
        ..Default::default()
    };

    NetSocket::new(ctx, zmq::SUB, socket_options, endpoint).map_err(NavClientError::SocketError)
}

/// Receive one JSON message from the socket without blocking.
///
/// Returns `Ok(None)` if no message is waiting.
fn recv_json<T: DeserializeOwned>(socket: &mut NetSocket) -> Result<Option<T>, NavClientError> {
    match socket.recv_string(zmq::DONTWAIT) {
        Ok(msg) => parse_msg(msg).map(Some),
        Err(zmq::Error::EAGAIN) => Ok(None),
        Err(e) => Err(NavClientError::RecvError(e)),
    }
}

/// Parse one recieved message payload into a typed sample.
fn parse_msg<T: DeserializeOwned>(msg: Result<String, Vec<u8>>) -> Result<T, NavClientError> {
    let msg = msg.map_err(|_| NavClientError::InvalidUtf8)?;

    serde_json::from_str(&msg).map_err(NavClientError::DeserializeError)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_valid_message() {
        let rel_pos: RelPos = parse_msg(Ok(r#"{"rel_pos_m": [1.0, -2.0, 0.5]}"#.to_string()))
            .expect("a well formed message must parse");

        assert_eq!(rel_pos.rel_pos_m, [1.0, -2.0, 0.5]);
    }

    #[test]
    fn parse_non_utf8_message() {
        // 0xFF is never valid in a utf8 sequence
        let result: Result<RelPos, NavClientError> = parse_msg(Err(vec![0xFF, 0xFE, 0xFD]));

        assert!(matches!(result, Err(NavClientError::InvalidUtf8)));
    }

    #[test]
    fn parse_malformed_json_message() {
        let result: Result<RelPos, NavClientError> = parse_msg(Ok("{not json".to_string()));

        assert!(matches!(result, Err(NavClientError::DeserializeError(_))));
    }
}
