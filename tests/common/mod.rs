//! Shared fixtures for the integration tests.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_xlsxwriter::Workbook;

pub const STUDENTS: [&str; 6] = ["ana", "ben", "cai", "dev", "eli", "fay"];

/// Writes an input workbook. `attendance` holds one row of marks per
/// student for sessions `S1`, `S2`; `history` is the full count matrix.
pub fn write_input(path: &Path, attendance: &[[u32; 2]], history: &[[Option<u32>; 6]]) {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("attendance_list").unwrap();
    sheet.write_string(0, 0, "student").unwrap();
    sheet.write_string(0, 1, "S1").unwrap();
    sheet.write_string(0, 2, "S2").unwrap();
    for (row, (student, marks)) in STUDENTS.iter().zip(attendance).enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, *student).unwrap();
        sheet.write_number(row, 1, marks[0]).unwrap();
        sheet.write_number(row, 2, marks[1]).unwrap();
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("historical_pairings").unwrap();
    sheet.write_string(0, 0, "student").unwrap();
    for (col, student) in STUDENTS.iter().enumerate() {
        sheet.write_string(0, col as u16 + 1, *student).unwrap();
    }
    for (row, (student, counts)) in STUDENTS.iter().zip(history).enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, *student).unwrap();
        for (col, count) in counts.iter().enumerate() {
            if let Some(count) = count {
                sheet.write_number(row, col as u16 + 1, *count).unwrap();
            }
        }
    }

    workbook.save(path).unwrap();
}

pub fn read_sheet(path: &Path, name: &str) -> Range<Data> {
    let mut workbook = open_workbook_auto(path).unwrap();
    workbook.worksheet_range(name).unwrap()
}

pub fn text(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
