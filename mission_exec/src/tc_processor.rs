//! # Telecommand processor module
//!
//! Applies telecommands to the mission sequencer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::{Tc, TcResponse};
use log::debug;

use crate::seq::MissionSequencer;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Execute a telecommand, returning the response to send back to the operator.
pub fn exec(seq: &mut MissionSequencer, tc: Tc) -> TcResponse {
    debug!("Recieved {:?} telecommand", tc);

    match tc {
        Tc::Activate => seq.activate(),
        Tc::Cancel => seq.cancel(),
        Tc::Status => seq.status(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        plan::{MissionPlan, MissionStep},
        seq::{Phase, SeqParams},
    };

    #[test]
    fn test_exec() {
        let plan = MissionPlan::new(vec![MissionStep::Land]).unwrap();
        let mut seq = MissionSequencer::new(plan, SeqParams::default());

        let status = exec(&mut seq, Tc::Status);
        assert!(status.success);
        assert!(status.message.starts_with("Idle"));

        assert_eq!(exec(&mut seq, Tc::Activate), TcResponse::ok("started"));
        assert_eq!(exec(&mut seq, Tc::Activate), TcResponse::ok("started"));
        assert_eq!(seq.phase(), &Phase::Armed);

        assert!(exec(&mut seq, Tc::Cancel).success);
        assert!(!exec(&mut seq, Tc::Cancel).success);
        assert!(exec(&mut seq, Tc::Status).message.starts_with("Cancelled"));
    }
}
