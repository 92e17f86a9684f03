//! Mission executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, load parameters and build the mission plan
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Mission sequencer processing, using the latest vehicle status
//!         - Telemetry publication and archiving
//!
//! The executable exits once the mission reaches a terminal phase.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{error, info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::net::{zmq, NetParams};
use mission_lib::{
    fcs_client::FcsClient,
    params::MissionExecParams,
    plan,
    seq::{MissionSequencer, Phase},
    status_feed::{StatusBoard, StatusClient},
    tc_processor,
    tc_server::{TcServer, TcServerError},
    tm_server::TmServer,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("mission_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drone Mission Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let params: MissionExecParams =
        util::params::load("mission_exec.toml").wrap_err("Could not load mission_exec params")?;

    if !(params.cycle_period_s.is_finite() && params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {} s",
            params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- BUILD THE MISSION ----

    let plan = plan::build_plan(&params.mission).wrap_err("Failed to build the mission plan")?;

    info!(
        "Mission plan ({:?} layout, {} steps, {} commands):",
        params.mission.layout,
        plan.len(),
        plan.iter().filter(|s| s.is_command()).count()
    );
    for (i, step) in plan.iter().enumerate() {
        info!("    {}: {}", i + 1, step);
    }

    let mut seq = MissionSequencer::new(plan, params.sequencer.clone());

    let mut tm_archiver = Archiver::from_path(&session, "mission/tm.csv")
        .wrap_err("Failed to create the mission telemetry archive")?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let tc_server = {
        let s = TcServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise TcServer")?;
        info!("TcServer initialised");
        s
    };

    let mut tm_server = {
        let s = TmServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");
        s
    };

    let mut fcs_client = {
        let c = FcsClient::new(&zmq_ctx, &net_params, params.fcs_response_timeout_ms)
            .wrap_err("Failed to initialise FcsClient")?;
        info!("FcsClient initialised");
        c
    };

    let status_board = StatusBoard::new();
    let _status_client = {
        let c = StatusClient::new(
            &zmq_ctx,
            &net_params.fcs_status_endpoint,
            status_board.clone(),
        )
        .wrap_err("Failed to initialise StatusClient")?;
        info!("StatusClient initialised");
        c
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(params.cycle_period_s);
    let cycles_per_second = ((1.0 / params.cycle_period_s).round() as u128).max(1);
    let mut num_cycles: u128 = 0;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let is_1_hz_cycle = num_cycles % cycles_per_second == 0;
        let time_s = session::get_elapsed_seconds();

        // ---- TELECOMMAND PROCESSING ----

        // Get commands until none remain
        loop {
            match tc_server.recieve_tc() {
                Ok(Some(tc)) => {
                    let response = tc_processor::exec(&mut seq, tc);
                    info!("{:?} telecommand: {}", tc, response.message);

                    if let Err(e) = tc_server.send_response(&response) {
                        warn!("Could not respond to TC: {}", e);
                    }
                }
                Ok(None) => break,
                Err(TcServerError::TcParseError(e)) => {
                    warn!("Could not parse recieved TC: {}", e);
                    break;
                }
                Err(e) => {
                    seq.cancel();
                    return Err(e).wrap_err("An error occured while receiving TCs");
                }
            }
        }

        if is_1_hz_cycle && !seq.is_activated() && !seq.is_terminal() {
            info!(
                "Waiting for activation (FCS {}, {} status updates received)",
                if fcs_client.is_connected() {
                    "connected"
                } else {
                    "not connected"
                },
                status_board.num_updates()
            );
        }

        // ---- MISSION PROCESSING ----

        let status = status_board.latest();
        seq.step(time_s, status.as_ref(), &mut fcs_client);

        // ---- TELEMETRY ----

        let tm = seq.get_tm(time_s);

        if let Err(e) = tm_server.send(&tm) {
            warn!("TmServer error: {}", e);
        }

        if let Err(e) = tm_archiver.serialise(&tm) {
            warn!("Could not archive mission telemetry: {}", e);
        }

        if seq.is_terminal() {
            match seq.phase() {
                Phase::Finished => info!("Mission complete"),
                Phase::Cancelled => warn!("Mission cancelled"),
                p => error!("Mission ended in the {} phase: {}", p, seq.status().message),
            }
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
