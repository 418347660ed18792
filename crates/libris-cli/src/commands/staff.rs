//! Staff borrower commands

use anyhow::Result;
use clap::Subcommand;
use libris_core::models::{NewStaff, Staff, UpdateBorrower};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_details, print_error, print_info, print_output, print_single, print_success};
use super::helpers::{or_dash, truncate};
use super::Context;

#[derive(Subcommand)]
pub enum StaffAction {
    /// List staff
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(long)]
        all: bool,
    },

    /// Show one staff member
    Show { id: i64 },

    /// Add a staff member
    Add {
        #[arg(long)]
        id_number: String,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        employee_id: Option<String>,

        #[arg(long)]
        rfid: Option<String>,
    },

    /// Update a staff member
    Update {
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        rfid: Option<String>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a staff member
    Delete {
        id: i64,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
pub struct StaffRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "ID Number")]
    pub id_number: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Employee ID")]
    pub employee_id: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&Staff> for StaffRow {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id,
            id_number: s.id_number.clone(),
            name: truncate(&s.name, 32),
            employee_id: or_dash(s.employee_id.as_deref()),
            active: if s.active { "yes" } else { "no" }.to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: StaffAction) -> Result<()> {
    let client = ctx.client()?;

    match action {
        StaffAction::List { search, page, all } => {
            let staff = if all {
                client
                    .fetch_all::<Staff>(libris_core::client::STAFF_PATH, search.as_deref())
                    .await?
            } else {
                let result = client.list_staff(page, search.as_deref()).await?;
                if result.next.is_some() {
                    print_info(
                        &format!("Showing page {} ({} staff in total); use --page or --all for more", page, result.count),
                        ctx.hide_notes(),
                    );
                }
                result.results
            };
            let rows: Vec<StaffRow> = staff.iter().map(StaffRow::from).collect();
            print_output(&rows, ctx.format)
        }

        StaffAction::Show { id } => {
            let staff = client.get_staff(id).await?;
            let fields = [
                ("ID", staff.id.to_string()),
                ("ID number", staff.id_number.clone()),
                ("Name", staff.name.clone()),
                ("Employee ID", or_dash(staff.employee_id.as_deref())),
                ("RFID", or_dash(staff.rfid_number.as_deref())),
                ("Active", staff.active.to_string()),
            ];
            print_details(&fields, &staff, ctx.format)
        }

        StaffAction::Add { id_number, name, employee_id, rfid } => {
            if id_number.trim().is_empty() || name.trim().is_empty() {
                anyhow::bail!("ID number and name are required");
            }
            let new = NewStaff {
                id_number,
                name,
                employee_id,
                rfid_number: rfid,
                active: true,
            };
            let created = client.create_staff(&new).await?;
            ctx.record_activity("staff.create", format!("{} {}", created.id_number, created.name));
            print_success(&format!("Created staff #{}", created.id), ctx.quiet);
            if !ctx.quiet {
                print_single(&StaffRow::from(&created), ctx.format)?;
            }
            Ok(())
        }

        StaffAction::Update { id, name, rfid, active } => {
            if name.is_none() && rfid.is_none() && active.is_none() {
                print_error("Nothing to update. Pass at least one field.");
                return Ok(());
            }
            let update = UpdateBorrower { name, rfid_number: rfid, active };
            let staff = client.update_staff(id, &update).await?;
            ctx.record_activity("staff.update", format!("#{} {}", staff.id, staff.name));
            print_success(&format!("Updated staff #{}", staff.id), ctx.quiet);
            Ok(())
        }

        StaffAction::Delete { id, force } => {
            if !force {
                let staff = client.get_staff(id).await?;
                print_single(&StaffRow::from(&staff), ctx.format)?;
                print_error("Use --force to confirm deletion");
                return Ok(());
            }
            client.delete_staff(id).await?;
            ctx.record_activity("staff.delete", format!("#{}", id));
            print_success(&format!("Deleted staff #{}", id), ctx.quiet);
            Ok(())
        }
    }
}
