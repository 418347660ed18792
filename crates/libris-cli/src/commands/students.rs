//! Student borrower commands

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use libris_core::models::{NewStudent, Student, UpdateBorrower};
use libris_core::services::import::parse_students_csv;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_details, print_error, print_info, print_output, print_single, print_success};
use super::helpers::{or_dash, read_csv_file, run_cli_import, truncate};
use super::Context;

#[derive(Subcommand)]
pub enum StudentsAction {
    /// List students
    List {
        /// Search name or ID number
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Fetch every page
        #[arg(long)]
        all: bool,

        /// Include inactive students
        #[arg(long)]
        inactive: bool,
    },

    /// Show one student
    Show {
        /// Student ID
        id: i64,
    },

    /// Add a student
    Add {
        /// School ID number
        #[arg(long)]
        id_number: String,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        year_level: Option<String>,

        #[arg(long)]
        rfid: Option<String>,
    },

    /// Update a student
    Update {
        /// Student ID
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        rfid: Option<String>,

        /// true or false
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a student
    Delete {
        /// Student ID
        id: i64,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Import a roster CSV with a header row
    Import {
        file: PathBuf,

        /// Parse and show rows without uploading
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
pub struct StudentRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "ID Number")]
    pub id_number: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Year")]
    pub year_level: String,
    #[tabled(rename = "RFID")]
    pub rfid: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&Student> for StudentRow {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            id_number: s.id_number.clone(),
            name: truncate(&s.name, 32),
            year_level: or_dash(s.year_level.as_deref()),
            rfid: or_dash(s.rfid_number.as_deref()),
            active: if s.active { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct RosterPreviewRow {
    #[tabled(rename = "ID Number")]
    pub id_number: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Year")]
    pub year_level: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&NewStudent> for RosterPreviewRow {
    fn from(s: &NewStudent) -> Self {
        Self {
            id_number: s.id_number.clone(),
            name: truncate(&s.name, 32),
            year_level: or_dash(s.year_level.as_deref()),
            active: if s.active { "yes" } else { "no" }.to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: StudentsAction) -> Result<()> {
    match action {
        StudentsAction::List { search, page, all, inactive } => {
            list_students(ctx, search, page, all, inactive).await
        }
        StudentsAction::Show { id } => show_student(ctx, id).await,
        StudentsAction::Add { id_number, name, year_level, rfid } => {
            let student = NewStudent {
                id_number,
                name,
                year_level,
                rfid_number: rfid,
                active: true,
            };
            add_student(ctx, student).await
        }
        StudentsAction::Update { id, name, rfid, active } => {
            let update = UpdateBorrower { name, rfid_number: rfid, active };
            update_student(ctx, id, update).await
        }
        StudentsAction::Delete { id, force } => delete_student(ctx, id, force).await,
        StudentsAction::Import { file, dry_run } => import_students(ctx, file, dry_run).await,
    }
}

async fn list_students(
    ctx: &Context,
    search: Option<String>,
    page: u32,
    all: bool,
    inactive: bool,
) -> Result<()> {
    let client = ctx.client()?;

    let mut students = if all {
        client
            .fetch_all::<Student>(libris_core::client::STUDENTS_PATH, search.as_deref())
            .await?
    } else {
        let result = client.list_students(page, search.as_deref()).await?;
        if result.next.is_some() {
            print_info(
                &format!("Showing page {} ({} students in total); use --page or --all for more", page, result.count),
                ctx.hide_notes(),
            );
        }
        result.results
    };

    if !inactive {
        students.retain(|s| s.active);
    }

    let rows: Vec<StudentRow> = students.iter().map(StudentRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn show_student(ctx: &Context, id: i64) -> Result<()> {
    let student = ctx.client()?.get_student(id).await?;
    let fields = [
        ("ID", student.id.to_string()),
        ("ID number", student.id_number.clone()),
        ("Name", student.name.clone()),
        ("Year level", or_dash(student.year_level.as_deref())),
        ("RFID", or_dash(student.rfid_number.as_deref())),
        ("Active", student.active.to_string()),
    ];
    print_details(&fields, &student, ctx.format)
}

async fn add_student(ctx: &Context, student: NewStudent) -> Result<()> {
    if student.id_number.trim().is_empty() || student.name.trim().is_empty() {
        anyhow::bail!("ID number and name are required");
    }

    let created = ctx.client()?.create_student(&student).await?;
    ctx.record_activity("student.create", format!("{} {}", created.id_number, created.name));
    print_success(&format!("Created student #{}", created.id), ctx.quiet);
    if !ctx.quiet {
        print_single(&StudentRow::from(&created), ctx.format)?;
    }
    Ok(())
}

async fn update_student(ctx: &Context, id: i64, update: UpdateBorrower) -> Result<()> {
    if update.name.is_none() && update.rfid_number.is_none() && update.active.is_none() {
        print_error("Nothing to update. Pass at least one field.");
        return Ok(());
    }

    let student = ctx.client()?.update_student(id, &update).await?;
    ctx.record_activity("student.update", format!("#{} {}", student.id, student.name));
    print_success(&format!("Updated student #{}", student.id), ctx.quiet);
    if !ctx.quiet {
        print_single(&StudentRow::from(&student), ctx.format)?;
    }
    Ok(())
}

async fn delete_student(ctx: &Context, id: i64, force: bool) -> Result<()> {
    let client = ctx.client()?;

    if !force {
        let student = client.get_student(id).await?;
        print_single(&StudentRow::from(&student), ctx.format)?;
        print_error("Use --force to confirm deletion");
        return Ok(());
    }

    client.delete_student(id).await?;
    ctx.record_activity("student.delete", format!("#{}", id));
    print_success(&format!("Deleted student #{}", id), ctx.quiet);
    Ok(())
}

async fn import_students(ctx: &Context, file: PathBuf, dry_run: bool) -> Result<()> {
    let text = read_csv_file(&file)?;
    let students = parse_students_csv(&text)?;

    if dry_run {
        let preview: Vec<RosterPreviewRow> = students.iter().map(RosterPreviewRow::from).collect();
        print_output(&preview, ctx.format)?;
        print_info(&format!("{} students would be imported", students.len()), ctx.hide_notes());
        return Ok(());
    }

    let client = ctx.client()?;
    let summary = run_cli_import(ctx, &students, &client, |s: &NewStudent| {
        format!("{} {}", s.id_number, s.name)
    })
    .await?;

    ctx.record_activity(
        "student.import",
        format!("{}: {}/{} imported", file.display(), summary.succeeded, summary.total),
    );
    Ok(())
}
