//! # Vehicle Status Feed
//!
//! The FCS publishes [`VehicleStatus`] snapshots at its own rate. [`StatusClient`] receives them on
//! a background thread and writes each one to a shared [`StatusBoard`], from which the main loop
//! reads the latest snapshot once per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, RwLock,
    },
    thread,
};

use comms_if::{
    eqpt::fcs::VehicleStatus,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{info, warn};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the status socket, bounds how long the client takes to shut down.
const STATUS_RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Holds the latest vehicle status snapshot.
///
/// Cloning the board gives another handle to the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    latest: Arc<RwLock<Option<VehicleStatus>>>,

    num_updates: Arc<AtomicU64>,
}

/// Receives status snapshots from the FCS and publishes them to a [`StatusBoard`].
pub struct StatusClient {
    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StatusClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn publish(&self, status: VehicleStatus) {
        // A poisoned lock still holds a whole snapshot, since writes are a single assignment
        let mut guard = match self.latest.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        *guard = Some(status);

        self.num_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a copy of the current snapshot, `None` if no status has been published yet.
    pub fn latest(&self) -> Option<VehicleStatus> {
        match self.latest.read() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }

    /// Total number of snapshots published to the board.
    pub fn num_updates(&self) -> u64 {
        self.num_updates.load(Ordering::Relaxed)
    }
}

impl StatusClient {
    /// Connect to the FCS status endpoint and start receiving.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        board: StatusBoard,
    ) -> Result<Self, StatusClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: STATUS_RECV_TIMEOUT_MS,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)
            .map_err(StatusClientError::SocketError)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = thread::spawn(move || receive(socket, board, shutdown_clone));

        Ok(Self {
            join_handle: Some(join_handle),
            shutdown,
        })
    }
}

impl Drop for StatusClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn receive(socket: MonitoredSocket, board: StatusBoard, shutdown: Arc<AtomicBool>) {
    let mut was_connected = false;

    while !shutdown.load(Ordering::Relaxed) {
        if socket.connected() != was_connected {
            was_connected = socket.connected();
            if was_connected {
                info!("Connected to the FCS status feed");
            } else {
                warn!("Lost connection to the FCS status feed");
            }
        }

        match socket.recv_json::<VehicleStatus>() {
            Ok(Some(s)) => board.publish(s),
            Ok(None) => (),
            Err(e) => warn!("Could not read a vehicle status message: {}", e),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
