//! Binary program for the group assignment.
//!
//! `x[i, g]` is 1 when student `i` sits in group `g`. `z[i, j, g]` is 1 when
//! both `i` and `j` sit in `g`; it is linearized with
//! `z <= x[i, g]`, `z <= x[j, g]` and `z >= x[i, g] + x[j, g] - 1`.
//! The weight of `z[i, j, g]` is `h[i, j]^2 + h[j, i]^2`, the cost of both
//! orientations of the pair. Only pairs with a positive weight get a `z`.
//! Diagonal terms `h[i, i]^2` are paid whatever the assignment and stay out
//! of the program.

use std::collections::HashMap;

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use itertools::Itertools;

use crate::model::condition::PairHistory;
use crate::model::entity::{GroupId, Id, Score};
use crate::model::group::GroupLayout;

/// A `z` indicator together with the pair and group it stands for.
#[derive(Debug, Clone, Copy)]
pub struct Colocation {
    pub first: usize,
    pub second: usize,
    pub group: GroupId,
    pub weight: Score,
    pub var: Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulationStats {
    pub membership_vars: usize,
    pub colocation_vars: usize,
    pub constraints: usize,
}

pub struct Formulation {
    pub(crate) vars: ProblemVariables,
    /// Indexed by student position in the input order, then group position.
    pub(crate) membership: Vec<Vec<(GroupId, Variable)>>,
    pub(crate) colocations: Vec<Colocation>,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<Constraint>,
}

impl Formulation {
    pub fn build(students: &[Id], layout: &GroupLayout, history: &PairHistory) -> Formulation {
        let mut vars = ProblemVariables::new();

        let membership: Vec<Vec<(GroupId, Variable)>> = students.iter()
            .map(|_| {
                layout.groups().iter()
                    .map(|group| (group.id, vars.add(variable().binary())))
                    .collect()
            })
            .collect();

        let position: HashMap<&str, usize> = students.iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();
        let weighted_pairs: Vec<(usize, usize, Score)> = students.iter()
            .map(String::as_str)
            .tuple_combinations()
            .filter_map(|(a, b)| {
                let weight = history.penalty([a, b]);
                (weight > 0).then(|| (position[a], position[b], weight))
            })
            .collect();

        let mut colocations = Vec::with_capacity(weighted_pairs.len() * layout.groups().len());
        for (first, second, weight) in weighted_pairs {
            for group in layout.groups() {
                colocations.push(Colocation {
                    first,
                    second,
                    group: group.id,
                    weight,
                    var: vars.add(variable().binary()),
                });
            }
        }

        let objective: Expression = colocations.iter()
            .map(|colocation| colocation.weight as f64 * colocation.var)
            .sum();

        let mut constraints = Vec::new();

        // every student in exactly one group
        for groups in &membership {
            let assigned: Expression = groups.iter().map(|(_, var)| *var).sum();
            constraints.push(constraint!(assigned == 1));
        }

        // every group filled to its size
        for (group_index, group) in layout.groups().iter().enumerate() {
            let occupancy: Expression = membership.iter().map(|groups| groups[group_index].1).sum();
            let size = group.size as f64;
            constraints.push(constraint!(occupancy == size));
        }

        // z tied to both memberships
        for colocation in &colocations {
            let group_index = colocation.group - 1;
            let x_first = membership[colocation.first][group_index].1;
            let x_second = membership[colocation.second][group_index].1;
            let z = colocation.var;
            constraints.push(constraint!(z <= x_first));
            constraints.push(constraint!(z <= x_second));
            constraints.push(constraint!(z >= x_first + x_second - 1.0));
        }

        Formulation { vars, membership, colocations, objective, constraints }
    }

    pub fn stats(&self) -> FormulationStats {
        FormulationStats {
            membership_vars: self.membership.iter().map(Vec::len).sum(),
            colocation_vars: self.colocations.len(),
            constraints: self.constraints.len(),
        }
    }

    pub fn colocations(&self) -> &[Colocation] {
        &self.colocations
    }
}
