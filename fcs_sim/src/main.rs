//! # Flight Control Simulator Executable
//!
//! Stands in for the vehicle's flight control subsystem so the mission executable can be run on
//! the ground. Commands are answered immediately and the simulated vehicle's status is published
//! every cycle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// FCS server abstraction.
mod fcs_server;

/// Parameters for the simulator.
mod params;

/// The simulated vehicle.
mod vehicle;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::net::{zmq, NetParams};
use log::{info, trace, warn};
use std::{
    thread,
    time::{Duration, Instant},
};

// Internal
use fcs_server::FcsServer;
use params::FcsSimParams;
use util::{
    logger::{logger_init, LevelFilter},
    session::{self, Session},
};
use vehicle::SimVehicle;

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("fcs_sim", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Flight Control Simulator\n");
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let params: FcsSimParams =
        util::params::load("fcs_sim.toml").wrap_err("Could not load fcs_sim params")?;

    if !(params.cycle_period_s.is_finite() && params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {} s",
            params.cycle_period_s
        ));
    }

    info!("Parameters loaded");

    // ---- SERVER INITIALISATION ----

    let zmq_ctx = zmq::Context::new();

    let mut server = FcsServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise server")?;

    info!("Server initialised");

    let cycle_period = Duration::from_secs_f64(params.cycle_period_s);
    let mut vehicle = SimVehicle::new(params);

    info!(
        "Initialisation complete, entering main loop with the vehicle {:?}",
        vehicle.state()
    );

    // ---- MAIN LOOP ----

    loop {
        let cycle_start_instant = Instant::now();

        vehicle.update(session::get_elapsed_seconds());

        // Answer all pending commands
        while let Some(cmd) = server.get_cmd().wrap_err("Failed to read commands")? {
            let response = vehicle.handle_cmd(&cmd);
            info!(
                "{} command: {} ({})",
                cmd.name(),
                if response.success { "accepted" } else { "rejected" },
                response.message
            );

            if let Err(e) = server.send_response(&response) {
                warn!("Couldn't send response to client: {}", e);
            }
        }

        let status = vehicle.status();
        trace!("{:?}", status);

        if let Err(e) = server.publish_status(&status) {
            warn!("Could not publish vehicle status: {}", e);
        }

        if let Some(d) = cycle_period.checked_sub(cycle_start_instant.elapsed()) {
            thread::sleep(d);
        }
    }
}
