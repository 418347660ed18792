//! Book catalog commands

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use libris_core::models::{Book, BookStatus, NewBook, UpdateBook};
use libris_core::services::catalog::{expand_variants, split_identifiers, CopyIdentifiers};
use libris_core::services::import::{parse_books_csv, BookRow};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_details, print_error, print_info, print_output, print_single, print_success};
use super::helpers::{or_dash, read_csv_file, run_cli_import, truncate};
use super::Context;

#[derive(Subcommand)]
pub enum BooksAction {
    /// List books
    List {
        /// Search title, author or identifiers
        #[arg(short, long)]
        search: Option<String>,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Fetch every page
        #[arg(long)]
        all: bool,

        /// Only books in this status
        #[arg(long)]
        status: Option<BookStatus>,
    },

    /// Show one book
    Show {
        /// Book ID
        id: i64,
    },

    /// Add a title; one record is created per copy
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        author: String,

        #[arg(long)]
        isbn: Option<String>,

        #[arg(long)]
        call_number: Option<String>,

        /// Accession numbers, one per copy (comma separated)
        #[arg(long)]
        accession: Option<String>,

        /// Barcodes, one per copy (comma separated)
        #[arg(long)]
        barcodes: Option<String>,

        #[arg(long)]
        publisher: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        edition: Option<String>,

        #[arg(long)]
        subject: Option<String>,
    },

    /// Update a book
    Update {
        /// Book ID
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        author: Option<String>,

        #[arg(long)]
        isbn: Option<String>,

        #[arg(long)]
        call_number: Option<String>,

        /// available, borrowed, damaged, overdue or lost
        #[arg(long)]
        status: Option<BookStatus>,
    },

    /// Delete a book
    Delete {
        /// Book ID
        id: i64,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Import an inventory CSV (call number, accession, author, title, copies, year)
    Import {
        /// CSV or tab-separated file
        file: PathBuf,

        /// Parse and show rows without uploading
        #[arg(long)]
        dry_run: bool,
    },
}

/// Book row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct BookTableRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Author")]
    pub author: String,
    #[tabled(rename = "Call No.")]
    pub call_number: String,
    #[tabled(rename = "Accession")]
    pub accession: String,
    #[tabled(rename = "Copy")]
    pub copy: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&Book> for BookTableRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: truncate(&book.title, 40),
            author: truncate(&book.author, 24),
            call_number: or_dash(book.call_number.as_deref()),
            accession: or_dash(book.accession_number.as_deref()),
            copy: or_dash(book.copy_number.as_deref()),
            status: book.status.to_string(),
        }
    }
}

/// Parsed import row for dry runs
#[derive(Debug, Serialize, Tabled)]
pub struct ImportPreviewRow {
    #[tabled(rename = "Line")]
    pub line: u64,
    #[tabled(rename = "Call No.")]
    pub call_number: String,
    #[tabled(rename = "Accession")]
    pub accession: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Copies")]
    pub copies: u32,
    #[tabled(rename = "Year")]
    pub year: String,
}

impl From<&BookRow> for ImportPreviewRow {
    fn from(row: &BookRow) -> Self {
        Self {
            line: row.line,
            call_number: row.call_number.clone(),
            accession: row.accession_number.clone(),
            title: truncate(&row.title, 40),
            copies: row.copies,
            year: row.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub async fn execute(ctx: &Context, action: BooksAction) -> Result<()> {
    match action {
        BooksAction::List { search, page, all, status } => list_books(ctx, search, page, all, status).await,
        BooksAction::Show { id } => show_book(ctx, id).await,
        BooksAction::Add {
            title,
            author,
            isbn,
            call_number,
            accession,
            barcodes,
            publisher,
            year,
            edition,
            subject,
        } => {
            let base = NewBook {
                title,
                author,
                isbn,
                call_number,
                publisher,
                year,
                edition,
                subject,
                copies: 1,
                ..Default::default()
            };
            add_book(ctx, base, accession, barcodes).await
        }
        BooksAction::Update { id, title, author, isbn, call_number, status } => {
            let update = UpdateBook { title, author, isbn, call_number, status };
            update_book(ctx, id, update).await
        }
        BooksAction::Delete { id, force } => delete_book(ctx, id, force).await,
        BooksAction::Import { file, dry_run } => import_books(ctx, file, dry_run).await,
    }
}

async fn list_books(
    ctx: &Context,
    search: Option<String>,
    page: u32,
    all: bool,
    status: Option<BookStatus>,
) -> Result<()> {
    let client = ctx.client()?;

    let mut books = if all {
        client.fetch_all::<Book>(libris_core::client::BOOKS_PATH, search.as_deref()).await?
    } else {
        let result = client.list_books(page, search.as_deref()).await?;
        if result.next.is_some() {
            print_info(
                &format!("Showing page {} ({} books in total); use --page or --all for more", page, result.count),
                ctx.hide_notes(),
            );
        }
        result.results
    };

    if let Some(status) = status {
        books.retain(|b| b.status == status);
    }

    let rows: Vec<BookTableRow> = books.iter().map(BookTableRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn show_book(ctx: &Context, id: i64) -> Result<()> {
    let book = ctx.client()?.get_book(id).await?;
    let fields = [
        ("ID", book.id.to_string()),
        ("Title", book.title.clone()),
        ("Author", or_dash(Some(book.author.as_str()))),
        ("ISBN", or_dash(book.isbn.as_deref())),
        ("Call number", or_dash(book.call_number.as_deref())),
        ("Accession", or_dash(book.accession_number.as_deref())),
        ("Barcode", or_dash(book.barcode.as_deref())),
        ("Copy", or_dash(book.copy_number.as_deref())),
        ("Status", book.status.to_string()),
        ("Publisher", or_dash(book.publisher.as_deref())),
        ("Year", book.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())),
        ("Edition", or_dash(book.edition.as_deref())),
        ("Subject", or_dash(book.subject.as_deref())),
    ];
    print_details(&fields, &book, ctx.format)
}

async fn add_book(
    ctx: &Context,
    base: NewBook,
    accession: Option<String>,
    barcodes: Option<String>,
) -> Result<()> {
    let accessions = accession.as_deref().map(split_identifiers).unwrap_or_default();
    let barcodes = barcodes.as_deref().map(split_identifiers).unwrap_or_default();

    let count = accessions.len().max(barcodes.len());
    let variants: Vec<CopyIdentifiers> = (0..count)
        .map(|i| CopyIdentifiers {
            isbn: None,
            accession_number: accessions.get(i).cloned(),
            barcode: barcodes.get(i).cloned(),
        })
        .collect();

    // Validated as a whole before anything is sent
    let copies = expand_variants(&base, &variants)?;
    let client = ctx.client()?;

    let mut created = Vec::new();
    for copy in &copies {
        match client.create_book(copy).await {
            Ok(book) => created.push(book),
            Err(e) => {
                print_error(&format!(
                    "Failed to create copy {}: {}",
                    copy.copy_number.as_deref().unwrap_or("?"),
                    e
                ));
                break;
            }
        }
    }

    if !created.is_empty() {
        ctx.record_activity(
            "book.create",
            format!("{} ({} of {} copies)", base.title, created.len(), copies.len()),
        );
    }
    if created.len() < copies.len() {
        anyhow::bail!("Created {} of {} copies", created.len(), copies.len());
    }

    print_success(&format!("Created {} copies of '{}'", created.len(), base.title), ctx.quiet);
    if !ctx.quiet {
        let rows: Vec<BookTableRow> = created.iter().map(BookTableRow::from).collect();
        print_output(&rows, ctx.format)?;
    }
    Ok(())
}

async fn update_book(ctx: &Context, id: i64, update: UpdateBook) -> Result<()> {
    if update.is_empty() {
        print_error("Nothing to update. Pass at least one field.");
        return Ok(());
    }

    let book = ctx.client()?.update_book(id, &update).await?;
    ctx.record_activity("book.update", format!("#{} {}", book.id, book.title));
    print_success(&format!("Updated book #{}", book.id), ctx.quiet);
    if !ctx.quiet {
        print_single(&BookTableRow::from(&book), ctx.format)?;
    }
    Ok(())
}

async fn delete_book(ctx: &Context, id: i64, force: bool) -> Result<()> {
    let client = ctx.client()?;

    if !force {
        let book = client.get_book(id).await?;
        print_single(&BookTableRow::from(&book), ctx.format)?;
        print_error("Use --force to confirm deletion");
        return Ok(());
    }

    client.delete_book(id).await?;
    ctx.record_activity("book.delete", format!("#{}", id));
    print_success(&format!("Deleted book #{}", id), ctx.quiet);
    Ok(())
}

async fn import_books(ctx: &Context, file: PathBuf, dry_run: bool) -> Result<()> {
    let text = read_csv_file(&file)?;
    // A parse error aborts here, before any upload
    let rows = parse_books_csv(&text)?;

    let books: Vec<NewBook> = rows.iter().flat_map(BookRow::to_new_books).collect();

    if dry_run {
        let preview: Vec<ImportPreviewRow> = rows.iter().map(ImportPreviewRow::from).collect();
        print_output(&preview, ctx.format)?;
        print_info(
            &format!("{} rows would be imported ({} copies)", rows.len(), books.len()),
            ctx.hide_notes(),
        );
        return Ok(());
    }

    let client = ctx.client()?;
    let summary = run_cli_import(ctx, &books, &client, |b: &NewBook| match &b.copy_number {
        Some(label) => format!("{} ({})", b.title, label),
        None => b.title.clone(),
    })
    .await?;

    ctx.record_activity(
        "book.import",
        format!(
            "{}: {}/{} imported",
            file.display(),
            summary.succeeded,
            summary.total
        ),
    );
    Ok(())
}
