//! # Mission Control
//!
//! Command line tool sending a single telecommand to the mission executable and printing its
//! response. Exits with an error if the telecommand is not accepted or no response arrives.
//!
//! ```text
//! mission_ctl activate
//! mission_ctl --endpoint tcp://192.168.0.10:5030 status
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::{
    net::{zmq, MonitoredSocket, NetParams, SocketOptions},
    tc::{Tc, TcResponse},
};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mission_ctl",
    about = "Send a telecommand to the mission executable"
)]
struct Opts {
    /// Telecommand endpoint of the mission executable, read from net.toml if not given
    #[structopt(long)]
    endpoint: Option<String>,

    /// Time to wait for the response, in milliseconds
    #[structopt(long, default_value = "2000")]
    timeout_ms: i32,

    #[structopt(subcommand)]
    tc: Tc,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    let opts = Opts::from_args();

    let endpoint = match opts.endpoint {
        Some(e) => e,
        None => {
            let net_params: NetParams = util::params::load("net.toml")
                .wrap_err("No endpoint given and the net params could not be loaded")?;
            net_params.tc_endpoint
        }
    };

    let response = send_tc(&endpoint, opts.tc, opts.timeout_ms)?;

    println!("{}", response.message);

    if response.success {
        Ok(())
    } else {
        Err(eyre!("The {:?} telecommand was not accepted", opts.tc))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn send_tc(endpoint: &str, tc: Tc, timeout_ms: i32) -> Result<TcResponse> {
    let ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        connect_timeout: timeout_ms,
        linger: 0,
        recv_timeout: timeout_ms,
        send_timeout: timeout_ms,
        ..Default::default()
    };

    let socket = MonitoredSocket::new(&ctx, zmq::REQ, socket_options, endpoint)
        .wrap_err_with(|| format!("Could not connect to {}", endpoint))?;

    socket
        .send_json(&tc)
        .wrap_err("Could not send the telecommand")?;

    socket
        .recv_json()
        .wrap_err("Could not read the response")?
        .ok_or_else(|| eyre!("The mission executable at {} did not respond", endpoint))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args() {
        let opts = Opts::from_iter_safe(&["mission_ctl", "activate"]).unwrap();
        assert_eq!(opts.tc, Tc::Activate);
        assert_eq!(opts.endpoint, None);
        assert_eq!(opts.timeout_ms, 2000);

        let opts = Opts::from_iter_safe(&[
            "mission_ctl",
            "--endpoint",
            "tcp://10.0.0.2:5030",
            "status",
        ])
        .unwrap();
        assert_eq!(opts.tc, Tc::Status);
        assert_eq!(opts.endpoint.as_deref(), Some("tcp://10.0.0.2:5030"));

        assert!(Opts::from_iter_safe(&["mission_ctl"]).is_err());
        assert!(Opts::from_iter_safe(&["mission_ctl", "launch"]).is_err());
    }
}
