//! Book inventory importer
//!
//! Fixed column order: call number, accession number, author, title, copies,
//! year. The inventory sheets this reads always start with two header rows
//! (a title line and the column captions), which are skipped by position.

use csv::ReaderBuilder;
use serde::Serialize;

use super::{clean_cell, detect_delimiter};
use crate::error::{Error, Result};
use crate::models::{BookStatus, NewBook};
use crate::services::catalog::copy_label;

/// Rows skipped at the top of every book sheet
pub const BOOK_HEADER_ROWS: usize = 2;

/// Rows with fewer cells than this are dropped
pub const MIN_BOOK_COLUMNS: usize = 4;

const COL_CALL_NUMBER: usize = 0;
const COL_ACCESSION: usize = 1;
const COL_AUTHOR: usize = 2;
const COL_TITLE: usize = 3;
const COL_COPIES: usize = 4;
const COL_YEAR: usize = 5;

/// Captions that mark a repeated header line inside the data
const HEADER_TOKENS: &[&str] = &[
    "call number",
    "call no",
    "accession number",
    "accession no",
    "acc no",
    "author",
    "authors",
    "title",
    "copies",
    "no of copies",
    "year",
    "copyright",
];

/// One parsed inventory line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRow {
    /// Line in the source file, for error messages
    pub line: u64,
    pub call_number: String,
    pub accession_number: String,
    pub author: String,
    pub title: String,
    pub copies: u32,
    pub year: Option<i32>,
}

impl BookRow {
    /// One create request per physical copy, labelled "k of N".
    ///
    /// The sheet carries a single accession number per title. Accession
    /// numbers are unique per copy, so only the first copy gets it.
    pub fn to_new_books(&self) -> Vec<NewBook> {
        (1..=self.copies).map(|k| self.copy(k)).collect()
    }

    fn copy(&self, index: u32) -> NewBook {
        NewBook {
            title: self.title.clone(),
            author: self.author.clone(),
            accession_number: if index == 1 { non_empty(&self.accession_number) } else { None },
            call_number: non_empty(&self.call_number),
            copies: self.copies,
            copy_number: Some(copy_label(index, self.copies)),
            status: BookStatus::Available,
            year: self.year,
            ..Default::default()
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse a book inventory sheet.
///
/// Fails on the first row whose `copies` cell is not a positive whole number;
/// nothing from a failed parse should be uploaded.
pub fn parse_books_csv(text: &str) -> Result<Vec<BookRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        if index < BOOK_HEADER_ROWS {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(index as u64 + 1);
        let cells: Vec<String> = record.iter().map(clean_cell).collect();

        if cells.iter().all(|c| c.is_empty()) || is_header_artifact(&cells) {
            log::debug!("Skipping header artifact on line {}", line);
            continue;
        }
        if cells.len() < MIN_BOOK_COLUMNS {
            log::warn!(
                "Skipping line {}: expected at least {} columns, found {}",
                line,
                MIN_BOOK_COLUMNS,
                cells.len()
            );
            continue;
        }

        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        let call_number = cell(COL_CALL_NUMBER);
        let accession_number = cell(COL_ACCESSION);
        let title = cell(COL_TITLE);

        if call_number.is_empty() && accession_number.is_empty() && title.is_empty() {
            log::debug!("Skipping line {}: no call number, accession number or title", line);
            continue;
        }

        rows.push(BookRow {
            line,
            call_number,
            accession_number,
            author: cell(COL_AUTHOR),
            title,
            copies: parse_copies(&cell(COL_COPIES), line)?,
            year: parse_year(&cell(COL_YEAR), line),
        });
    }

    log::info!("Parsed {} book rows", rows.len());
    Ok(rows)
}

/// `copies` is required: blank means one copy, anything else must be a
/// positive whole number.
fn parse_copies(raw: &str, line: u64) -> Result<u32> {
    if raw.is_empty() {
        return Ok(1);
    }
    match raw.parse::<u32>() {
        Ok(0) => Err(Error::parse(format!("Line {}: copies must be at least 1", line))),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::parse(format!(
            "Line {}: copies must be a whole number, got '{}'",
            line, raw
        ))),
    }
}

fn parse_year(raw: &str, line: u64) -> Option<i32> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            log::warn!("Line {}: ignoring non-numeric year '{}'", line, raw);
            None
        }
    }
}

/// Dash separator lines and repeated caption lines
fn is_header_artifact(cells: &[String]) -> bool {
    let filled: Vec<&String> = cells.iter().filter(|c| !c.is_empty()).collect();
    if filled.is_empty() {
        return false;
    }
    if filled.iter().all(|c| c.chars().all(|ch| ch == '-' || ch == '=' || ch == ' ')) {
        return true;
    }

    let captions = filled.iter().filter(|c| is_header_token(c)).count();
    captions >= 2 || cells.first().map(|c| is_header_token(c)).unwrap_or(false)
}

fn is_header_token(cell: &str) -> bool {
    let normalized: String = cell
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    HEADER_TOKENS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
LIBRARY BOOK INVENTORY,,,,,
Call No.,Accession No.,Author,Title,Copies,Year
FIL 899.211 R52,000123,\"Rizal, Jose\",Noli Me Tangere,2,1887
-----,-----,-----,-----,-----,-----
FIL 899.211 R52e,000124,\"Rizal, Jose\",El Filibusterismo,1,1891
QA 76.73 R87,000125,Klabnik,The Rust Programming Language,,2019
";

    #[test]
    fn test_parse_skips_headers_and_artifacts() {
        let rows = parse_books_csv(SHEET).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].title, "Noli Me Tangere");
        assert_eq!(rows[0].author, "Rizal, Jose");
        assert_eq!(rows[0].copies, 2);
        assert_eq!(rows[0].year, Some(1887));
        assert_eq!(rows[2].copies, 1, "blank copies defaults to one");
    }

    #[test]
    fn test_parse_tab_delimited() {
        let text = "Inventory\n\
            Call No.\tAccession No.\tAuthor\tTitle\tCopies\tYear\n\
            PL 6058\t000200\tBalagtas\tFlorante at Laura\t3\t1838\n";
        let rows = parse_books_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].call_number, "PL 6058");
        assert_eq!(rows[0].copies, 3);
    }

    #[test]
    fn test_row_without_identifiers_or_title_is_excluded() {
        let text = "title\nheader\n,,Anonymous,,1,2000\nX1,,,Kept,1,\n";
        let rows = parse_books_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Kept");
    }

    #[test]
    fn test_repeated_caption_row_is_excluded() {
        let text = "t\nh\nCall Number,Accession Number,Author,Title,Copies,Year\nA,1,B,C,1,2001\n";
        let rows = parse_books_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].call_number, "A");
    }

    #[test]
    fn test_short_rows_are_dropped() {
        let text = "t\nh\nA,1,B\nA,2,B,Title\n";
        let rows = parse_books_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].accession_number, "2");
    }

    #[test]
    fn test_non_numeric_copies_aborts() {
        let text = "t\nh\nA,1,B,Good,1,2001\nA,2,B,Bad,two,2001\n";
        let err = parse_books_csv(text).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("copies"), "unexpected error: {}", msg);
        assert!(msg.contains("two"));
    }

    #[test]
    fn test_zero_copies_aborts() {
        let text = "t\nh\nA,1,B,Zero,0,2001\n";
        assert!(parse_books_csv(text).is_err());
    }

    #[test]
    fn test_bad_year_is_dropped() {
        let text = "t\nh\nA,1,B,Title,1,c1999\n";
        let rows = parse_books_csv(text).unwrap();
        assert_eq!(rows[0].year, None);
    }

    #[test]
    fn test_to_new_books() {
        let rows = parse_books_csv(SHEET).unwrap();
        let books = rows[0].to_new_books();
        assert_eq!(books.len(), 2);
        let book = &books[0];
        assert_eq!(book.call_number.as_deref(), Some("FIL 899.211 R52"));
        assert_eq!(book.accession_number.as_deref(), Some("000123"));
        assert_eq!(book.copy_number.as_deref(), Some("1 of 2"));
        assert_eq!(book.status, BookStatus::Available);
    }

    #[test]
    fn test_each_copy_becomes_its_own_request() {
        let rows = parse_books_csv("t\nh\nA,ACC-1,Au,Title,3,2001\n").unwrap();
        assert_eq!(rows.len(), 1);

        let books = rows[0].to_new_books();
        let labels: Vec<Option<&str>> = books.iter().map(|b| b.copy_number.as_deref()).collect();
        assert_eq!(labels, vec![Some("1 of 3"), Some("2 of 3"), Some("3 of 3")]);
        assert!(books.iter().all(|b| b.copies == 3 && b.title == "Title"));
        assert_eq!(books[0].accession_number.as_deref(), Some("ACC-1"));
        assert!(books[1..].iter().all(|b| b.accession_number.is_none()));
    }
}
