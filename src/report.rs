use std::fs;
use std::path::Path;
use std::time::Duration;

use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet, XlsxError};
use thiserror::Error;
use tracing::info;

use crate::dataset::PairingMatrix;
use crate::model::group::Assignment;
use crate::solver::Outcome;

pub const NEW_HISTORY_SHEET: &str = "new_historical";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Failed to write workbook: {0}")]
    Workbook(#[from] XlsxError),
}

pub fn groups_sheet_name(session: &str) -> String {
    format!("groups_{session}")
}

/// Text summary of a run: objective and rosters, or the no-solution line,
/// followed by the execution time.
pub fn render_summary(outcome: &Outcome, elapsed: Duration) -> String {
    let mut out = String::new();
    match outcome {
        Outcome::Solved { assignment, objective } => {
            out.push_str(&format!("Objective function value is {:.1}\n\n", *objective as f64));
            for roster in assignment.rosters() {
                out.push_str(&format!("Group {} is formed by:\n", roster.group.id));
                for student in &roster.members {
                    out.push_str(student);
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        Outcome::NoSolution { .. } => out.push_str("No solution found.\n"),
    }
    out.push_str(&format!("Execution time: {:.2} seconds\n", elapsed.as_secs_f64()));
    out
}

pub fn write_summary(path: &Path, outcome: &Outcome, elapsed: Duration) -> Result<(), ReportError> {
    fs::write(path, render_summary(outcome, elapsed)).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "summary written");
    Ok(())
}

/// `(student, group)` rows, group by group, students sorted within a group.
pub fn assignment_rows(assignment: &Assignment) -> Vec<(String, usize)> {
    assignment.rosters().iter()
        .flat_map(|roster| {
            let mut members = roster.members.clone();
            members.sort();
            members.into_iter().map(move |student| (student, roster.group.id))
        })
        .collect()
}

/// Student ids that read back as whole numbers are written as numbers, the
/// way they came in.
fn write_label(sheet: &mut Worksheet, row: RowNum, col: ColNum, label: &str) -> Result<(), XlsxError> {
    match label.parse::<i64>() {
        Ok(number) if number.to_string() == label => sheet.write_number(row, col, number as f64)?,
        _ => sheet.write_string(row, col, label)?,
    };
    Ok(())
}

/// Writes the assignment list and the updated historical matrix.
pub fn write_workbook(
    path: &Path,
    session: &str,
    assignment: &Assignment,
    pairings: &PairingMatrix,
) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();

    let groups = workbook.add_worksheet();
    groups.set_name(groups_sheet_name(session))?;
    groups.write_string(0, 0, "Student")?;
    groups.write_string(0, 1, "Group")?;
    for (index, (student, group)) in assignment_rows(assignment).into_iter().enumerate() {
        let row = index as RowNum + 1;
        write_label(groups, row, 0, &student)?;
        groups.write_number(row, 1, group as f64)?;
    }

    let history = workbook.add_worksheet();
    history.set_name(NEW_HISTORY_SHEET)?;
    if !pairings.corner().is_empty() {
        history.write_string(0, 0, pairings.corner())?;
    }
    for (index, label) in pairings.col_labels().iter().enumerate() {
        write_label(history, 0, index as ColNum + 1, label)?;
    }
    for (row_index, row_label) in pairings.row_labels().iter().enumerate() {
        let row = row_index as RowNum + 1;
        write_label(history, row, 0, row_label)?;
        for (col_index, col_label) in pairings.col_labels().iter().enumerate() {
            if let Some(count) = pairings.get(row_label, col_label) {
                history.write_number(row, col_index as ColNum + 1, f64::from(count))?;
            }
        }
    }

    workbook.save(path)?;
    info!(path = %path.display(), "result workbook written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use tempfile::TempDir;

    use crate::model::group::GroupLayout;

    fn assignment() -> Assignment {
        let layout = GroupLayout::new(&[(2, 2)]).unwrap();
        Assignment::from_members(
            &layout,
            vec![("zoe".into(), 1), ("amy".into(), 1), ("bob".into(), 2), ("cat".into(), 2)],
        ).unwrap()
    }

    #[test]
    fn summary_lists_rosters_in_assignment_order() {
        let outcome = Outcome::Solved { assignment: assignment(), objective: 4 };
        let summary = render_summary(&outcome, Duration::from_millis(1234));
        assert_eq!(
            summary,
            "Objective function value is 4.0\n\n\
             Group 1 is formed by:\nzoe\namy\n\n\
             Group 2 is formed by:\nbob\ncat\n\n\
             Execution time: 1.23 seconds\n"
        );
    }

    #[test]
    fn summary_without_solution() {
        let outcome = Outcome::NoSolution { reason: "infeasible".into() };
        let summary = render_summary(&outcome, Duration::from_millis(50));
        assert_eq!(summary, "No solution found.\nExecution time: 0.05 seconds\n");
    }

    #[test]
    fn assignment_rows_sort_students_within_groups() {
        let rows = assignment_rows(&assignment());
        assert_eq!(
            rows,
            vec![
                ("amy".to_string(), 1),
                ("zoe".to_string(), 1),
                ("bob".to_string(), 2),
                ("cat".to_string(), 2),
            ]
        );
        assert_eq!(groups_sheet_name("S1"), "groups_S1");
    }

    #[test]
    fn workbook_records_pairs_and_keeps_numeric_ids_numeric() {
        let rows = vec![
            vec![Data::String("student".into()), Data::Float(7.0), Data::String("ana".into()), Data::String("ben".into())],
            vec![Data::Float(7.0), Data::Float(0.0), Data::Empty, Data::Float(3.0)],
            vec![Data::String("ana".into()), Data::Empty, Data::Float(0.0), Data::Empty],
            vec![Data::String("ben".into()), Data::Float(3.0), Data::Empty, Data::Float(0.0)],
        ];
        let mut matrix = PairingMatrix::from_rows(rows.iter().map(Vec::as_slice), 0).unwrap();
        let layout = GroupLayout::new(&[(2, 2)]).unwrap();
        let assignment = Assignment::from_members(
            &layout,
            vec![("ana".into(), 1), ("7".into(), 1), ("ben".into(), 2), ("eve".into(), 2)],
        ).unwrap();
        matrix.record(&assignment);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        write_workbook(&path, "S1", &assignment, &matrix).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let groups = workbook.worksheet_range("groups_S1").unwrap();
        assert_eq!(groups.get_value((1, 0)), Some(&Data::Float(7.0)));
        assert_eq!(groups.get_value((2, 0)), Some(&Data::String("ana".into())));

        let history = workbook.worksheet_range(NEW_HISTORY_SHEET).unwrap();
        assert_eq!(history.get_value((0, 1)), Some(&Data::Float(7.0)));
        assert_eq!(history.get_value((1, 0)), Some(&Data::Float(7.0)));
        // blank cells on a shared group become 1, the others stay blank
        assert_eq!(history.get_value((1, 2)), Some(&Data::Float(1.0)));
        assert_eq!(history.get_value((2, 1)), Some(&Data::Float(1.0)));
        assert_eq!(history.get_value((2, 3)), Some(&Data::Empty));
        assert_eq!(history.get_value((3, 4)), Some(&Data::Float(1.0)));
        assert_eq!(history.get_value((0, 4)), Some(&Data::String("eve".into())));
    }
}
