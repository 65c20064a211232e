use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::model::condition::PairHistory;
use crate::model::entity::{Count, Id};
use crate::model::group::Assignment;

pub const ATTENDANCE_SHEET: &str = "attendance_list";
pub const HISTORY_SHEET: &str = "historical_pairings";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Sheet `{0}` not found")]
    MissingSheet(String),
    #[error("Sheet `{0}` has no header row")]
    EmptySheet(String),
    #[error("Session `{0}` not found in the attendance sheet")]
    UnknownSession(String),
    #[error("Malformed cell in sheet `{sheet}` at row {row}, column {column}: `{value}`")]
    MalformedCell { sheet: String, row: usize, column: usize, value: String },
    #[error("Student `{student}` appears more than once in sheet `{sheet}`")]
    DuplicateStudent { sheet: String, student: Id },
}

/// Text of an identifier cell. Whole numbers drop their fractional part so
/// that a student numbered `7` reads the same in every sheet.
fn cell_label(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        Data::Int(i) => Some(i.to_string()),
        other => Some(other.to_string()),
    }
}

fn cell_number(cell: &Data) -> Result<Option<f64>, ()> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(f) => Ok(Some(*f)),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Data::String(s) if s.trim().is_empty() => Ok(None),
        Data::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| ()),
        _ => Err(()),
    }
}

fn cell_count(cell: &Data) -> Result<Option<Count>, ()> {
    match cell_number(cell)? {
        None => Ok(None),
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= Count::MAX as f64 => {
            Ok(Some(value as Count))
        }
        Some(_) => Err(()),
    }
}

fn first_row(range: &Range<Data>) -> usize {
    range.start().map(|(row, _)| row as usize).unwrap_or(0)
}

#[derive(Debug, Clone)]
struct AttendanceRow {
    sheet_row: usize,
    student: Id,
    marks: Vec<Data>,
}

/// The `attendance_list` sheet: one row per student, one indicator column per
/// session.
#[derive(Debug, Clone)]
pub struct Attendance {
    sessions: Vec<String>,
    rows: Vec<AttendanceRow>,
}

impl Attendance {
    pub fn from_range(range: &Range<Data>) -> Result<Attendance, DataError> {
        Self::from_rows(range.rows(), first_row(range))
    }

    /// `offset` is the sheet row of the header, used in error messages.
    pub fn from_rows<'a, I>(rows: I, offset: usize) -> Result<Attendance, DataError>
    where
        I: IntoIterator<Item = &'a [Data]>,
    {
        let mut rows = rows.into_iter().enumerate();
        let (_, header) = rows.next()
            .ok_or_else(|| DataError::EmptySheet(ATTENDANCE_SHEET.to_string()))?;
        let sessions = header.iter().skip(1)
            .map(|cell| cell_label(cell).unwrap_or_default())
            .collect();

        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        for (index, row) in rows {
            let Some(student) = row.first().and_then(cell_label) else {
                continue;
            };
            if !seen.insert(student.clone()) {
                return Err(DataError::DuplicateStudent { sheet: ATTENDANCE_SHEET.to_string(), student });
            }
            parsed.push(AttendanceRow {
                sheet_row: offset + index + 1,
                student,
                marks: row.iter().skip(1).cloned().collect(),
            });
        }
        Ok(Attendance { sessions, rows: parsed })
    }

    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn students(&self) -> impl Iterator<Item = &Id> {
        self.rows.iter().map(|row| &row.student)
    }

    /// Students marked `1` for the session, in sheet order.
    pub fn present(&self, session: &str) -> Result<Vec<Id>, DataError> {
        let column = self.sessions.iter()
            .position(|name| name == session)
            .ok_or_else(|| DataError::UnknownSession(session.to_string()))?;
        let mut present = Vec::new();
        for row in &self.rows {
            let cell = row.marks.get(column).unwrap_or(&Data::Empty);
            let mark = cell_number(cell).map_err(|_| DataError::MalformedCell {
                sheet: ATTENDANCE_SHEET.to_string(),
                row: row.sheet_row,
                column: column + 2,
                value: cell.to_string(),
            })?;
            if mark == Some(1.0) {
                present.push(row.student.clone());
            }
        }
        Ok(present)
    }
}

/// The `historical_pairings` sheet as read, kept whole so it can be written
/// back with the new session recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingMatrix {
    corner: String,
    row_labels: Vec<Id>,
    col_labels: Vec<Id>,
    cells: Vec<Vec<Option<Count>>>,
    row_index: HashMap<Id, usize>,
    col_index: HashMap<Id, usize>,
}

impl PairingMatrix {
    pub fn from_range(range: &Range<Data>) -> Result<PairingMatrix, DataError> {
        Self::from_rows(range.rows(), first_row(range))
    }

    /// Columns with an empty header are ignored.
    pub fn from_rows<'a, I>(rows: I, offset: usize) -> Result<PairingMatrix, DataError>
    where
        I: IntoIterator<Item = &'a [Data]>,
    {
        let mut rows = rows.into_iter().enumerate();
        let (_, header) = rows.next()
            .ok_or_else(|| DataError::EmptySheet(HISTORY_SHEET.to_string()))?;
        let corner = header.first().and_then(cell_label).unwrap_or_default();
        let columns: Vec<(usize, Id)> = header.iter()
            .enumerate()
            .skip(1)
            .filter_map(|(position, cell)| cell_label(cell).map(|label| (position, label)))
            .collect();

        let mut matrix = PairingMatrix {
            corner,
            row_labels: Vec::new(),
            col_labels: Vec::new(),
            cells: Vec::new(),
            row_index: HashMap::new(),
            col_index: HashMap::new(),
        };
        for (_, label) in &columns {
            if matrix.col_index.insert(label.clone(), matrix.col_labels.len()).is_some() {
                return Err(DataError::DuplicateStudent { sheet: HISTORY_SHEET.to_string(), student: label.clone() });
            }
            matrix.col_labels.push(label.clone());
        }

        for (index, row) in rows {
            let Some(student) = row.first().and_then(cell_label) else {
                continue;
            };
            if matrix.row_index.contains_key(&student) {
                return Err(DataError::DuplicateStudent { sheet: HISTORY_SHEET.to_string(), student });
            }
            let cells = columns.iter()
                .map(|(position, _)| {
                    let cell = row.get(*position).unwrap_or(&Data::Empty);
                    cell_count(cell).map_err(|_| DataError::MalformedCell {
                        sheet: HISTORY_SHEET.to_string(),
                        row: offset + index + 1,
                        column: position + 1,
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, DataError>>()?;
            matrix.row_index.insert(student.clone(), matrix.row_labels.len());
            matrix.row_labels.push(student);
            matrix.cells.push(cells);
        }
        Ok(matrix)
    }

    pub fn corner(&self) -> &str {
        &self.corner
    }

    pub fn row_labels(&self) -> &[Id] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[Id] {
        &self.col_labels
    }

    pub fn get(&self, row: &str, col: &str) -> Option<Count> {
        let row = *self.row_index.get(row)?;
        let col = *self.col_index.get(col)?;
        self.cells[row][col]
    }

    /// Cells whose row and column are both among `students`, diagonal
    /// included. Each orientation keeps its own count; empty cells count 0.
    pub fn history_for(&self, students: &[Id]) -> PairHistory {
        let mut history = PairHistory::new();
        for (from, to) in students.iter().cartesian_product(students.iter()) {
            if let Some(count) = self.get(from, to) {
                history.set(from, to, count);
            }
        }
        debug!(students = students.len(), cells = history.entries().count(), "historical pairings loaded");
        history
    }

    fn ensure_student(&mut self, student: &str) {
        if !self.row_index.contains_key(student) {
            self.row_index.insert(student.to_string(), self.row_labels.len());
            self.row_labels.push(student.to_string());
            self.cells.push(vec![None; self.col_labels.len()]);
        }
        if !self.col_index.contains_key(student) {
            self.col_index.insert(student.to_string(), self.col_labels.len());
            self.col_labels.push(student.to_string());
            self.cells.iter_mut().for_each(|row| row.push(None));
        }
    }

    /// Adds one shared session to every ordered pair of distinct students
    /// that share a group. An empty cell on such a pair becomes 1. Students
    /// new to the matrix get a row and a column.
    pub fn record(&mut self, assignment: &Assignment) {
        for (a, b) in assignment.colocated_pairs() {
            self.ensure_student(a);
            self.ensure_student(b);
            let row = self.row_index[a.as_str()];
            let col = self.col_index[b.as_str()];
            let cell = &mut self.cells[row][col];
            *cell = Some(cell.unwrap_or(0) + 1);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub attendance: Attendance,
    pub pairings: PairingMatrix,
}

fn sheet_range(workbook: &mut Sheets<BufReader<File>>, name: &str) -> Result<Range<Data>, DataError> {
    if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
        return Err(DataError::MissingSheet(name.to_string()));
    }
    Ok(workbook.worksheet_range(name)?)
}

/// Reads both input sheets from an `.xlsx`, `.xls` or `.ods` workbook.
pub fn read_workbook(path: &Path) -> Result<Dataset, DataError> {
    let mut workbook = open_workbook_auto(path)?;
    let attendance_range = sheet_range(&mut workbook, ATTENDANCE_SHEET)?;
    let history_range = sheet_range(&mut workbook, HISTORY_SHEET)?;
    let attendance = Attendance::from_range(&attendance_range)?;
    let pairings = PairingMatrix::from_range(&history_range)?;
    debug!(
        students = attendance.rows.len(),
        sessions = attendance.sessions.len(),
        history_rows = pairings.row_labels.len(),
        "workbook loaded"
    );
    Ok(Dataset { attendance, pairings })
}
