//! # Network Module
//!
//! This module provides networking abstractions over ZMQ, the networking library chosen for the
//! software. All messages exchanged between the executables are JSON strings.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the monitor socket, bounds how long the monitor thread takes to notice a
/// shutdown request.
const MONITOR_POLL_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors that are registered. Used to provide unique IDs for each mointor endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints used by the mission software.
///
/// Servers bind to these endpoints and clients connect to them, so use addresses which are valid
/// for both (e.g. `tcp://127.0.0.1:5020`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Telecommand endpoint, the mission exec serves activation requests here
    pub tc_endpoint: String,

    /// Telemetry endpoint, the mission exec publishes its status here
    pub tm_endpoint: String,

    /// Flight control command endpoint, served by the flight control subsystem
    pub fcs_cmd_endpoint: String,

    /// Flight control status endpoint, published by the flight control subsystem
    pub fcs_status_endpoint: String,
}

/// A zmq socket which is monitored providing additional information.
///
/// A background thread watches the socket's monitor events and keeps track of whether the socket
/// has a live peer.
pub struct MonitoredSocket {
    socket: Socket,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    num_peers: Arc<AtomicUsize>,
}

/// Represents options which can be set on a monitored socket.
///
/// Most options here correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation. Times are in
/// milliseconds.
pub struct SocketOptions {
    /// Servers bind to the endpoint, clients connect to it.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// If true `MonitoredSocket::new()` blocks until the socket is connected or `connect_timeout`
    /// elapses, returning `MonitoredSocketError::CouldNotConnect` in the latter case.
    ///
    /// The default value is `false`.
    pub block_on_first_connect: bool,

    /// Topic prefix to subscribe to, only used by `SUB` sockets. An empty prefix subscribes to
    /// everything.
    pub subscribe: Vec<u8>,

    /// `ZMQ_REQ_CORRELATE`: Match replies with requests
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`: relax strict alternation between request and reply
    pub req_relaxed: bool,

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

    /// `ZMQ_HEARTBEAT_IVL`: Set interval between sending ZMTP heartbeats
    pub heartbeat_ivl: i32,

    /// `ZMQ_HEARTBEAT_TIMEOUT`: Set timeout for ZMTP heartbeats
    pub heartbeat_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket to {0}: {1:?}")]
    CouldNotConnect(String, Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

/// Errors which occur while exchanging JSON messages over a socket.
#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not send the message: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the message: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Recieved a message which was not valid UTF-8")]
    NonUtf8Message,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a new monitored socket.
    ///
    /// ## Arguments
    /// - `ctx`: the zmq context which will be used to create the socket
    /// - `socket_type`: the type of zmq socket to create
    /// - `socket_options`: a [`SocketOptions`] struct specifying how to configure the socket
    /// - `endpoint`: a zmq endpoint string, such as `"tcp://127.0.0.1:5020"`
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Enable, create, and connect monitor
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        socket
            .monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .set_rcvtimeo(MONITOR_POLL_MS)
            .map_err(|e| MonitoredSocketError::SocketOptionError("set_rcvtimeo".into(), e))?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(monitor_endpoint.clone(), Some(e)))?;

        socket_options.set(&socket)?;

        if socket_options.bind {
            socket.bind(endpoint)
        } else {
            socket.connect(endpoint)
        }
        .map_err(|e| MonitoredSocketError::CouldNotConnect(endpoint.into(), Some(e)))?;

        let num_peers = Arc::new(AtomicUsize::new(0));

        if socket_options.block_on_first_connect {
            wait_for_connect(&monitor, socket_options.connect_timeout, endpoint)?;
            num_peers.store(1, Ordering::Relaxed);
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let num_peers_clone = num_peers.clone();

        let join_handle =
            thread::spawn(move || monitor_socket(monitor, shutdown_clone, num_peers_clone));

        Ok(Self {
            socket,
            join_handle: Some(join_handle),
            shutdown,
            num_peers,
        })
    }

    /// Return if the socket has at least one connected peer.
    pub fn connected(&self) -> bool {
        self.num_peers.load(Ordering::Relaxed) > 0
    }

    /// Serialize the value to JSON and send it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), NetError> {
        let msg = serde_json::to_string(value).map_err(NetError::SerializationError)?;

        self.socket.send(msg.as_str(), 0).map_err(NetError::SendError)
    }

    /// Recieve a JSON message and deserialize it.
    ///
    /// Returns `Ok(None)` if no message arrived within the socket's recieve timeout.
    pub fn recv_json<T: DeserializeOwned>(&self) -> Result<Option<T>, NetError> {
        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(NetError::NonUtf8Message),
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(NetError::RecvError(e)),
        };

        serde_json::from_str(&msg)
            .map(Some)
            .map_err(NetError::DeserializeError)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_heartbeat_ivl, self.heartbeat_ivl),
            (set_heartbeat_timeout, self.heartbeat_timeout),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        match socket.get_socket_type() {
            Ok(SocketType::REQ) => {
                set_sockopts!(
                    socket,
                    (set_req_correlate, self.req_correlate),
                    (set_req_relaxed, self.req_relaxed)
                );
            }
            Ok(SocketType::SUB) => {
                set_sockopts!(socket, (set_subscribe, &self.subscribe));
            }
            _ => (),
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            block_on_first_connect: false,
            subscribe: Vec::new(),
            connect_timeout: 0,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            linger: 30_000,
            reconnect_ivl: 100,
            recv_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
            send_timeout: -1,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket, `Ok(None)` if no event arrived within the timeout.
fn read_event(monitor: &Socket) -> Result<Option<SocketEvent>, zmq::Error> {
    let msg = match monitor.recv_msg(0) {
        Ok(m) => m,
        Err(zmq::Error::EAGAIN) => return Ok(None),
        Err(e) => return Err(e),
    };

    // First frame is the event number (u16) followed by the event value (u32)
    let event = match (msg.get(0), msg.get(1)) {
        (Some(&lo), Some(&hi)) => u16::from_ne_bytes([lo, hi]),
        _ => return Ok(None),
    };

    // Second frame is the endpoint address, which we don't use
    if monitor.get_rcvmore()? {
        monitor.recv_msg(0)?;
    }

    Ok(Some(SocketEvent::from_raw(event)))
}

/// Block until the monitor reports a connection, or the timeout (in milliseconds) elapses.
///
/// A timeout of zero or less waits forever.
fn wait_for_connect(
    monitor: &Socket,
    timeout_ms: i32,
    endpoint: &str,
) -> Result<(), MonitoredSocketError> {
    let start = Instant::now();
    let timeout = if timeout_ms > 0 {
        Some(Duration::from_millis(timeout_ms as u64))
    } else {
        None
    };

    loop {
        match read_event(monitor).map_err(MonitoredSocketError::EventReadError)? {
            Some(SocketEvent::CONNECTED) => return Ok(()),
            Some(_) | None => (),
        }

        if let Some(t) = timeout {
            if start.elapsed() > t {
                return Err(MonitoredSocketError::CouldNotConnect(endpoint.into(), None));
            }
        }
    }
}

fn monitor_socket(monitor: Socket, shutdown: Arc<AtomicBool>, num_peers: Arc<AtomicUsize>) {
    while !shutdown.load(Ordering::Relaxed) {
        let event = match read_event(&monitor) {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            // The context is being torn down, nothing left to monitor
            Err(_) => break,
        };

        match event {
            SocketEvent::CONNECTED | SocketEvent::ACCEPTED => {
                num_peers.fetch_add(1, Ordering::Relaxed);
            }
            SocketEvent::DISCONNECTED => {
                // Saturating decrement, a blocking first connect may not have been counted by
                // this thread
                let _ = num_peers.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    Some(n.saturating_sub(1))
                });
            }
            _ => (),
        }
    }
}
