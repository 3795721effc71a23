//! # Network Module
//!
//! This module provides networking abstractions over ZMQ, the networking library chosen for the
//! software. All inter-process traffic in the system flows over PUB/SUB sockets created through
//! [`NetSocket`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use zmq::{Context, Socket, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| NetSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A configured zmq socket.
///
/// The socket derefs to the underlying [`zmq::Socket`], so the standard send/recv functions are
/// available on it directly.
pub struct NetSocket {
    socket: Socket,
}

/// Represents options which can be set on a socket.
///
/// Most options here correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/2-1:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint. Servers should have this value
    /// set as `true`, clients should have it set as `false`.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`: Set reconnection interval
    pub reconnect_ivl: i32,

    /// `ZMQ_CONNECT_TIMEOUT`: Set `connect()` timeout
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,

    /// `ZMQ_CONFLATE`: Keep only the most recent message in the receive queue.
    ///
    /// Used by subscribers which only ever care about the latest sample (last-value-wins
    /// semantics for sensor streams).
    pub conflate: bool,
}

/// Endpoints for all sockets used by the software.
///
/// Loaded from the `net.toml` parameter file.
#[derive(Debug, Deserialize)]
pub struct NetParams {
    /// Endpoint publishing vehicle odometry
    pub odom_endpoint: String,

    /// Endpoint publishing the RTK relative position (vehicle to platform antenna)
    pub rel_pos_endpoint: String,

    /// Endpoint publishing the platform heading
    pub platform_heading_endpoint: String,

    /// Endpoint publishing the platform velocity
    pub platform_vel_endpoint: String,

    /// Endpoint on which the high level command setpoint is published
    pub hlc_endpoint: String,

    /// Endpoint on which the begin-landing-routine signal is published
    pub landing_signal_endpoint: String,

    /// Endpoint on which guidance telemetry is published
    pub guid_tm_endpoint: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not connect the socket: {0:?}")]
    CouldNotConnect(zmq::Error),

    #[error("Could not subscribe the socket: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetSocket {
    /// Create a new socket.
    ///
    /// ## Socket options
    ///
    /// The `socket_options` argument specifies the options that will be passed to the underlying
    /// zmq socket. In addition to the zmq options `bind` controls whether the socket binds to the
    /// endpoint (servers) or connects to it (clients).
    ///
    /// ## Arguments
    /// - `ctx`: the zmq context which will be used to create the socket
    /// - `socket_type`: the type of zmq socket to create
    /// - `socket_options`: a [`SocketOptions`] struct specifying how to configure the socket
    /// - `endpoint`: a zmq endpoint string, such as `"tcp://localhost:4000"`
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, NetSocketError> {
        // Create socket
        let socket = ctx
            .socket(socket_type)
            .map_err(NetSocketError::CreateSocketError)?;

        // Set the options on the socket
        socket_options.set(&socket)?;

        // Subscribers accept all messages on their endpoint, topic filtering is done by giving
        // each stream its own endpoint.
        if socket_type == zmq::SUB {
            socket
                .set_subscribe(b"")
                .map_err(NetSocketError::SubscribeError)?;
        }

        // Connect or bind the socket to it's endpoint
        match socket_options.bind {
            false => socket.connect(endpoint),
            true => socket.bind(endpoint),
        }
        .map_err(NetSocketError::CouldNotConnect)?;

        Ok(Self { socket })
    }
}

impl std::ops::Deref for NetSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for NetSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), NetSocketError> {
        // Set all the socket options, we use a macro here to make the error handling nice and
        // easy
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout),
            (set_conflate, self.conflate)
        );

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            connect_timeout: 0,
            linger: 30_000,
            reconnect_ivl: 100,
            recv_timeout: -1,
            send_timeout: 0,
            conflate: false,
        }
    }
}
