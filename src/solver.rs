use std::time::Instant;

use good_lp::{default_solver, ResolutionError, Solution, SolverModel};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formulation::Formulation;
use crate::model::condition::PairHistory;
use crate::model::entity::{GroupId, Id, Score};
use crate::model::group::{Assignment, AssignmentError, GroupLayout};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Solved { assignment: Assignment, objective: Score },
    NoSolution { reason: String },
}

impl Outcome {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Outcome::Solved { assignment, .. } => Some(assignment),
            Outcome::NoSolution { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("Solver failed: {0}")]
    Solver(ResolutionError),
    #[error("Solver placed student `{student}` in {groups} groups")]
    InconsistentSolution { student: Id, groups: usize },
    #[error("Solver returned an invalid assignment: {0}")]
    InvalidAssignment(#[from] AssignmentError),
}

/// Builds the binary program for the present students and runs it through
/// the default solver once.
///
/// A layout whose capacity differs from the number of students is
/// infeasible and is reported as [`Outcome::NoSolution`] without calling the
/// solver, as is an infeasible or unbounded solver result.
pub fn solve(students: &[Id], layout: &GroupLayout, history: &PairHistory) -> Result<Outcome, SolveError> {
    let capacity = layout.capacity();
    if capacity != students.len() {
        let reason = format!(
            "{} students are present but the groups hold {}",
            students.len(),
            capacity
        );
        warn!(%reason, "group layout cannot be filled");
        return Ok(Outcome::NoSolution { reason });
    }

    let formulation = Formulation::build(students, layout, history);
    let stats = formulation.stats();
    debug!(
        membership_vars = stats.membership_vars,
        colocation_vars = stats.colocation_vars,
        constraints = stats.constraints,
        "formulation built"
    );

    let Formulation { vars, membership, objective, constraints, .. } = formulation;
    let model = constraints.into_iter().fold(
        vars.minimise(objective).using(default_solver),
        |model, constraint| model.with(constraint),
    );

    info!(students = students.len(), groups = layout.groups().len(), "starting solver");
    let started = Instant::now();
    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            warn!("solver reported the model infeasible");
            return Ok(Outcome::NoSolution { reason: "infeasible".to_string() });
        }
        Err(ResolutionError::Unbounded) => {
            warn!("solver reported the model unbounded");
            return Ok(Outcome::NoSolution { reason: "unbounded".to_string() });
        }
        Err(err) => return Err(SolveError::Solver(err)),
    };
    info!(elapsed = ?started.elapsed(), "solver finished");

    let mut members = Vec::with_capacity(students.len());
    for (student, groups) in students.iter().zip(&membership) {
        let chosen: Vec<GroupId> = groups.iter()
            .filter(|(_, var)| solution.value(*var) > 0.5)
            .map(|(group, _)| *group)
            .collect();
        match chosen.as_slice() {
            [group] => members.push((student.clone(), *group)),
            _ => {
                return Err(SolveError::InconsistentSolution {
                    student: student.clone(),
                    groups: chosen.len(),
                })
            }
        }
    }

    let assignment = Assignment::from_members(layout, members)?;
    assignment.validate(students)?;
    let objective = assignment.score(history);
    info!(objective, "assignment extracted");
    Ok(Outcome::Solved { assignment, objective })
}
