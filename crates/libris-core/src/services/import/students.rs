//! Student roster importer
//!
//! Header-driven: columns are matched by name, in any order. Header names are
//! normalized (case, spaces, dots) and a few common aliases are accepted.

use std::collections::HashMap;

use csv::ReaderBuilder;

use super::{clean_cell, detect_delimiter};
use crate::error::{Error, Result};
use crate::models::NewStudent;

const ID_COLUMNS: &[&str] = &["id_number", "id_no", "student_id", "student_number", "student_no"];
const NAME_COLUMNS: &[&str] = &["name", "full_name", "student_name"];
const FIRST_NAME_COLUMNS: &[&str] = &["first_name", "firstname", "given_name"];
const LAST_NAME_COLUMNS: &[&str] = &["last_name", "lastname", "surname", "family_name"];
const YEAR_COLUMNS: &[&str] = &["year_level", "year", "grade", "level", "grade_level"];
const RFID_COLUMNS: &[&str] = &["rfid_number", "rfid", "rfid_no", "card_number"];
const ACTIVE_COLUMNS: &[&str] = &["active", "is_active", "status"];

fn normalize_header(raw: &str) -> String {
    let lowered = clean_cell(raw).to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        match ch {
            ' ' | '-' | '.' | '_' => {
                if !out.ends_with('_') {
                    out.push('_');
                }
            }
            c => out.push(c),
        }
    }
    out.trim_matches('_').to_string()
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.index.get(*a).copied())
    }
}

/// Parse a student roster.
///
/// The header must name an ID column and either a name column or both
/// first/last name columns. Data rows without an ID or a name are skipped.
pub fn parse_students_csv(text: &str) -> Result<Vec<NewStudent>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = Columns {
        index: headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .collect(),
    };

    let id_col = columns
        .find(ID_COLUMNS)
        .ok_or_else(|| Error::parse("Student CSV is missing an ID number column (e.g. 'ID Number')"))?;
    let name_col = columns.find(NAME_COLUMNS);
    let first_col = columns.find(FIRST_NAME_COLUMNS);
    let last_col = columns.find(LAST_NAME_COLUMNS);
    if name_col.is_none() && (first_col.is_none() || last_col.is_none()) {
        return Err(Error::parse(
            "Student CSV needs a 'Name' column or both 'First Name' and 'Last Name'",
        ));
    }
    let year_col = columns.find(YEAR_COLUMNS);
    let rfid_col = columns.find(RFID_COLUMNS);
    let active_col = columns.find(ACTIVE_COLUMNS);

    let mut students = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cell = |col: Option<usize>| -> String {
            col.and_then(|i| record.get(i)).map(clean_cell).unwrap_or_default()
        };

        let id_number = cell(Some(id_col));
        let mut name = cell(name_col);
        if name.is_empty() {
            let full = format!("{} {}", cell(first_col), cell(last_col));
            name = full.trim().to_string();
        }

        if id_number.is_empty() || name.is_empty() {
            log::debug!("Skipping student line {}: missing ID number or name", line);
            continue;
        }

        students.push(NewStudent {
            id_number,
            name,
            year_level: Some(cell(year_col)).filter(|s| !s.is_empty()),
            rfid_number: Some(cell(rfid_col)).filter(|s| !s.is_empty()),
            active: parse_active(&cell(active_col)),
        });
    }

    log::info!("Parsed {} student rows", students.len());
    Ok(students)
}

/// Blank means active; only explicit negatives deactivate.
fn parse_active(raw: &str) -> bool {
    !matches!(
        raw.to_lowercase().as_str(),
        "false" | "no" | "n" | "0" | "inactive"
    )
}
