//! # Mission Layouts
//!
//! Builds a [`MissionPlan`] from the `[mission]` table of the mission executable's parameters.
//!
//! Two fixed layouts are provided:
//!
//! - `standard`: upload the trajectory, fly to its start, track it, fly to the destination, land
//!   and take off again.
//! - `relay`: a refuelling leg. Land, optionally wait for refilling and a further delay, take off,
//!   then fly the trajectory and land at its end.
//!
//! Any other mission can be given as an explicit list of steps with the `custom` layout.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::fcs::Reference;
use serde::{Deserialize, Serialize};

use super::{traj_file, MissionPlan, MissionStep, PlanError, Trajectory};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters describing the mission to fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionParams {
    /// Which layout to build the plan from
    #[serde(default)]
    pub layout: MissionLayout,

    /// Path to the trajectory file, relative paths are taken from the params directory
    #[serde(default)]
    pub trajectory_file: Option<String>,

    /// Column delimiter used in the trajectory file
    #[serde(default = "default_delimiter")]
    pub trajectory_delimiter: char,

    /// Rate at which the trajectory is sampled
    pub trajectory_sampling_rate_hz: f64,

    /// Frame the trajectory and destination are expressed in
    pub reference_frame: String,

    /// Destination flown to after the trajectory in the standard layout
    #[serde(default)]
    pub goto_destination: Option<Reference>,

    /// Time spent on the ground refilling in the relay layout
    #[serde(default)]
    pub refilling_time_s: Option<f64>,

    /// Additional time spent on the ground before taking off in the relay layout
    #[serde(default)]
    pub delay_s: Option<f64>,

    /// Steps of a custom mission
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionLayout {
    Standard,
    Relay,
    Custom,
}

/// A step of a custom mission as written in the parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    /// Upload the mission's trajectory file
    UploadTrajectory,

    GotoTrajectoryStart,

    StartTracking,

    /// Fly to the given point
    GotoPoint {
        x_m: f64,
        y_m: f64,
        z_m: f64,
        #[serde(default)]
        heading_rad: f64,
    },

    /// Fly to the mission's `goto_destination`
    GotoDestination,

    Land,

    TakeOff,

    Wait { duration_s: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MissionLayout {
    fn default() -> Self {
        MissionLayout::Standard
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the mission plan described by the parameters.
///
/// The trajectory file is only loaded if the plan uploads a trajectory.
pub fn build_plan(params: &MissionParams) -> Result<MissionPlan, PlanError> {
    let specs = match params.layout {
        MissionLayout::Standard => vec![
            StepSpec::UploadTrajectory,
            StepSpec::GotoTrajectoryStart,
            StepSpec::StartTracking,
            StepSpec::GotoDestination,
            StepSpec::Land,
            StepSpec::TakeOff,
        ],
        MissionLayout::Relay => {
            let mut specs = vec![StepSpec::Land];

            for duration_s in [params.refilling_time_s, params.delay_s].iter().flatten() {
                if *duration_s > 0.0 {
                    specs.push(StepSpec::Wait {
                        duration_s: *duration_s,
                    });
                }
            }

            specs.extend_from_slice(&[
                StepSpec::TakeOff,
                StepSpec::UploadTrajectory,
                StepSpec::GotoTrajectoryStart,
                StepSpec::StartTracking,
                StepSpec::Land,
            ]);

            specs
        }
        MissionLayout::Custom => params.steps.clone(),
    };

    // Only load the trajectory once, even if it's uploaded several times
    let mut trajectory: Option<Trajectory> = None;
    let mut steps = Vec::with_capacity(specs.len());

    for spec in specs {
        steps.push(match spec {
            StepSpec::UploadTrajectory => {
                let t = match trajectory.take() {
                    Some(t) => t,
                    None => load_trajectory(params)?,
                };
                trajectory = Some(t.clone());
                MissionStep::UploadTrajectory(t)
            }
            StepSpec::GotoTrajectoryStart => MissionStep::GotoTrajectoryStart,
            StepSpec::StartTracking => MissionStep::StartTracking,
            StepSpec::GotoPoint {
                x_m,
                y_m,
                z_m,
                heading_rad,
            } => MissionStep::GotoPoint {
                target: Reference {
                    x_m,
                    y_m,
                    z_m,
                    heading_rad,
                },
                frame_id: params.reference_frame.clone(),
            },
            StepSpec::GotoDestination => MissionStep::GotoPoint {
                target: params
                    .goto_destination
                    .ok_or(PlanError::MissingParam("goto_destination"))?,
                frame_id: params.reference_frame.clone(),
            },
            StepSpec::Land => MissionStep::Land,
            StepSpec::TakeOff => MissionStep::TakeOff,
            StepSpec::Wait { duration_s } => MissionStep::Wait { duration_s },
        });
    }

    MissionPlan::new(steps)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_delimiter() -> char {
    ' '
}

fn load_trajectory(params: &MissionParams) -> Result<Trajectory, PlanError> {
    let file = params
        .trajectory_file
        .as_ref()
        .ok_or(PlanError::MissingParam("trajectory_file"))?;

    if !params.trajectory_delimiter.is_ascii() {
        return Err(PlanError::InvalidDelimiter(params.trajectory_delimiter));
    }

    // A non-positive rate gives a non-positive or infinite period, rejected by the plan
    let sample_period_s = 1.0 / params.trajectory_sampling_rate_hz;

    let points = traj_file::load(
        util::params::resolve(file),
        params.trajectory_delimiter as u8,
    )?;

    Ok(Trajectory {
        points,
        sample_period_s,
        frame_id: params.reference_frame.clone(),
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn traj_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 2 0").unwrap();
        writeln!(file, "1 0 2 0").unwrap();
        writeln!(file, "2 1 2 0.5").unwrap();
        file
    }

    fn params(layout: MissionLayout, file: &tempfile::NamedTempFile) -> MissionParams {
        MissionParams {
            layout,
            trajectory_file: Some(file.path().to_string_lossy().into_owned()),
            trajectory_delimiter: ' ',
            trajectory_sampling_rate_hz: 5.0,
            reference_frame: "gps_origin".into(),
            goto_destination: Some(Reference {
                x_m: 10.0,
                y_m: 20.0,
                z_m: 3.0,
                heading_rad: 0.0,
            }),
            refilling_time_s: None,
            delay_s: None,
            steps: vec![],
        }
    }

    #[test]
    fn test_standard_layout() {
        let file = traj_file();
        let plan = build_plan(&params(MissionLayout::Standard, &file)).unwrap();

        assert_eq!(plan.len(), 6);

        match plan.step_at(0) {
            Some(MissionStep::UploadTrajectory(t)) => {
                assert_eq!(t.points.len(), 3);
                assert!((t.sample_period_s - 0.2).abs() < 1e-12);
                assert_eq!(t.frame_id, "gps_origin");
            }
            s => panic!("Expected an upload, got {:?}", s),
        }
        assert_eq!(plan.step_at(1), Some(&MissionStep::GotoTrajectoryStart));
        assert_eq!(plan.step_at(2), Some(&MissionStep::StartTracking));
        assert!(matches!(
            plan.step_at(3),
            Some(MissionStep::GotoPoint { target, .. }) if target.y_m == 20.0
        ));
        assert_eq!(plan.step_at(4), Some(&MissionStep::Land));
        assert_eq!(plan.step_at(5), Some(&MissionStep::TakeOff));
    }

    #[test]
    fn test_standard_layout_needs_destination() {
        let file = traj_file();
        let mut p = params(MissionLayout::Standard, &file);
        p.goto_destination = None;

        assert!(matches!(
            build_plan(&p),
            Err(PlanError::MissingParam("goto_destination"))
        ));
    }

    #[test]
    fn test_relay_layout() {
        let file = traj_file();
        let mut p = params(MissionLayout::Relay, &file);
        p.refilling_time_s = Some(30.0);
        p.delay_s = Some(0.0);

        let plan = build_plan(&p).unwrap();
        let steps: Vec<String> = plan.iter().map(|s| s.to_string()).collect();

        assert_eq!(steps.len(), 7);
        assert_eq!(steps[0], "Land");
        assert_eq!(steps[1], "Wait(30 s)");
        assert_eq!(steps[2], "TakeOff");
        assert!(steps[3].starts_with("UploadTrajectory"));
        assert_eq!(steps[6], "Land");
    }

    #[test]
    fn test_custom_layout_from_toml() {
        let toml_str = r#"
            layout = "custom"
            trajectory_sampling_rate_hz = 10.0
            reference_frame = "local"

            [[steps]]
            kind = "take_off"

            [[steps]]
            kind = "goto_point"
            x_m = 1.0
            y_m = 2.0
            z_m = 3.0

            [[steps]]
            kind = "wait"
            duration_s = 5.0

            [[steps]]
            kind = "land"
        "#;

        let p: MissionParams = toml::from_str(toml_str).unwrap();
        assert_eq!(p.trajectory_delimiter, ' ');

        let plan = build_plan(&p).unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(
            plan.step_at(1),
            Some(&MissionStep::GotoPoint {
                target: Reference {
                    x_m: 1.0,
                    y_m: 2.0,
                    z_m: 3.0,
                    heading_rad: 0.0
                },
                frame_id: "local".into()
            })
        );
        assert_eq!(plan.step_at(2), Some(&MissionStep::Wait { duration_s: 5.0 }));
    }

    #[test]
    fn test_bad_trajectory_aborts_plan() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 2 0").unwrap();
        writeln!(file, "1 0 2").unwrap();

        match build_plan(&params(MissionLayout::Standard, &file)) {
            Err(PlanError::TrajectoryParseError(
                traj_file::TrajectoryParseError::WrongColumnCount { row: 1, .. },
            )) => (),
            r => panic!("Expected a parse error, got {:?}", r),
        }
    }

    #[test]
    fn test_empty_custom_plan() {
        let file = traj_file();
        assert!(matches!(
            build_plan(&params(MissionLayout::Custom, &file)),
            Err(PlanError::Empty)
        ));
    }
}
