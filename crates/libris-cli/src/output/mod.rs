//! Terminal rendering
//!
//! Every command prints through here. Records go to stdout as a table or
//! pretty JSON; status lines are coloured and honour `--quiet`, except
//! errors and warnings which always go to stderr.

use std::fmt;

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// How records are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("table") {
            Ok(Self::Table)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(format!("unknown output format '{}' (expected table or json)", s))
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}

const EMPTY_TABLE: &str = "Nothing to show.";

/// Render a list of rows. An empty list is a one-line note in table
/// mode and `[]` in JSON mode, so scripts always get valid JSON.
fn render_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Table if rows.is_empty() => EMPTY_TABLE.to_string(),
        OutputFormat::Table => Table::new(rows).to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
    })
}

/// Render one record: a single-row table, or a JSON object rather than an array
fn render_record<T: Serialize + Tabled>(record: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => render_rows(std::slice::from_ref(record), format),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
    }
}

/// Render aligned `label  value` lines for a detail view
fn render_fields(fields: &[(&str, String)]) -> String {
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(label, value)| format!("{}  {}", format!("{:<width$}", label).bold(), value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_output<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_rows(rows, format)?);
    Ok(())
}

pub fn print_single<T: Serialize + Tabled>(record: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_record(record, format)?);
    Ok(())
}

/// Detail view: labelled lines for people, the full record for `--format json`
pub fn print_details<T: Serialize>(
    fields: &[(&str, String)],
    record: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_fields(fields)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
    }
    Ok(())
}

pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message.green());
    }
}

/// Plain note on stdout. Callers pass `Context::hide_notes()` when the
/// note would corrupt JSON output.
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}

pub fn print_warning(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message.yellow());
    }
}

/// Always shown, even with `--quiet`
pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Tabled)]
    struct Row {
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Copies")]
        copies: u32,
    }

    fn row(title: &str, copies: u32) -> Row {
        Row { title: title.to_string(), copies }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("xml"));
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_empty_list_is_a_note_or_empty_array() {
        let rows: Vec<Row> = Vec::new();
        assert_eq!(render_rows(&rows, OutputFormat::Table).unwrap(), EMPTY_TABLE);
        assert_eq!(render_rows(&rows, OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_table_uses_renamed_headers() {
        let table = render_rows(&[row("Noli Me Tangere", 2)], OutputFormat::Table).unwrap();
        assert!(table.contains("Title"));
        assert!(table.contains("Copies"));
        assert!(table.contains("Noli Me Tangere"));
    }

    #[test]
    fn test_single_record_json_is_an_object() {
        let json = render_record(&row("El Filibusterismo", 1), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "El Filibusterismo");
        assert_eq!(value["copies"], 1);
    }

    #[test]
    fn test_fields_are_aligned() {
        colored::control::set_override(false);
        let text = render_fields(&[("ID", "7".to_string()), ("Due date", "Jan 18, 2024".to_string())]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID        7");
        assert_eq!(lines[1], "Due date  Jan 18, 2024");
    }
}
