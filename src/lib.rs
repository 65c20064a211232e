//! Assigns the students present at a session to fixed-size groups while
//! minimizing how often students who already shared a group meet again.
//!
//! The assignment is written as a binary program over membership and
//! co-location indicators and handed to an external MILP solver through
//! `good_lp`. The surrounding pipeline reads the attendance and historical
//! pairing sheets, extracts the solver's assignment, and writes a text
//! summary plus a workbook with the updated pairing counts.

pub mod config;
pub mod dataset;
pub mod error;
pub mod formulation;
pub mod logging;
pub mod model;
pub mod report;
pub mod solver;

use std::time::Instant;

use tracing::{info, warn};

pub use config::RunConfig;
pub use error::{Error, Result};
pub use solver::Outcome;

/// Runs one session end to end: load, solve, write the summary and, when an
/// assignment was found, the result workbook.
pub fn run(config: &RunConfig) -> Result<Outcome> {
    config.validate()?;
    let started = Instant::now();

    let dataset::Dataset { attendance, mut pairings } = dataset::read_workbook(&config.input)?;
    let students = attendance.present(&config.session)?;
    info!(session = %config.session, present = students.len(), "attendance loaded");

    let history = pairings.history_for(&students);
    let outcome = solver::solve(&students, &config.layout, &history)?;

    report::write_summary(&config.summary, &outcome, started.elapsed())?;
    match &outcome {
        Outcome::Solved { assignment, objective } => {
            info!(objective, "solution found");
            pairings.record(assignment);
            report::write_workbook(&config.output, &config.session, assignment, &pairings)?;
        }
        Outcome::NoSolution { reason } => {
            warn!(%reason, "no solution found, result workbook not written");
        }
    }
    Ok(outcome)
}
