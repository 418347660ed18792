//! Data models for the Libris client
//!
//! These mirror the JSON documents exchanged with the library API. Dates stay
//! as the raw strings the API sends; see [`crate::dates`] for parsing.

use serde::{Deserialize, Serialize};

/// Maximum number of renewals a single loan may receive
pub const MAX_RENEWALS: u32 = 3;

/// Paginated list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

// ============================================================================
// Borrow records
// ============================================================================

/// A loan of one physical copy to one borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: i64,
    #[serde(alias = "student")]
    pub student_id: i64,
    #[serde(alias = "book")]
    pub book_id: i64,
    pub borrowed_date: String,
    pub due_date: String,
    #[serde(default)]
    pub returned_date: Option<String>,
    #[serde(default)]
    pub is_returned: bool,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub renewed_count: u32,
    #[serde(default)]
    pub or_number: Option<String>,
    // Display fields some list endpoints denormalize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
}

/// Create borrow request
#[derive(Debug, Clone, Serialize)]
pub struct NewBorrow {
    pub student_id: i64,
    pub book_id: i64,
    pub borrowed_date: String,
    pub due_date: String,
}

/// Body of `POST /borrow/return/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnRequest {
    pub returned_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRequest>,
}

/// Body of `POST /borrow/renew/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenewRequest {
    pub due_date: String,
    pub renewed_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRequest>,
}

/// Body of `POST /borrow/pay/{id}/`, also nested in return/renew
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub or_number: String,
    pub amount: f64,
    pub days_overdue: i64,
}

// ============================================================================
// Books
// ============================================================================

/// Circulation status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
    Damaged,
    Overdue,
    Lost,
}

impl BookStatus {
    pub const ALL: [BookStatus; 5] = [
        BookStatus::Available,
        BookStatus::Borrowed,
        BookStatus::Damaged,
        BookStatus::Overdue,
        BookStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Borrowed => "Borrowed",
            BookStatus::Damaged => "Damaged",
            BookStatus::Overdue => "Overdue",
            BookStatus::Lost => "Lost",
        }
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(BookStatus::Available),
            "borrowed" => Ok(BookStatus::Borrowed),
            "damaged" => Ok(BookStatus::Damaged),
            "overdue" => Ok(BookStatus::Overdue),
            "lost" => Ok(BookStatus::Lost),
            _ => Err(format!(
                "Invalid status: {}. Use available, borrowed, damaged, overdue or lost",
                s
            )),
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical copy in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub accession_number: Option<String>,
    #[serde(default)]
    pub call_number: Option<String>,
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default)]
    pub copy_number: Option<String>,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

fn default_copies() -> u32 {
    1
}

/// Create book request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accession_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_number: Option<String>,
    pub copies: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_number: Option<String>,
    pub status: BookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Partial book update; only set fields are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateBook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookStatus>,
}

impl UpdateBook {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.call_number.is_none()
            && self.status.is_none()
    }
}

// ============================================================================
// Borrowers
// ============================================================================

/// Student borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub id_number: String,
    pub name: String,
    #[serde(default)]
    pub year_level: Option<String>,
    #[serde(default)]
    pub rfid_number: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Create student request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewStudent {
    pub id_number: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_number: Option<String>,
    pub active: bool,
}

/// Staff borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub id_number: String,
    pub name: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub rfid_number: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Create staff request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewStaff {
    pub id_number: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_number: Option<String>,
    pub active: bool,
}

/// Partial borrower update shared by students and staff
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateBorrower {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

fn default_active() -> bool {
    true
}

// ============================================================================
// Statistics
// ============================================================================

/// Server-side dashboard counters (`GET /stats/dashboard/`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_books: u64,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_staff: u64,
    #[serde(default)]
    pub borrowed_today: u64,
    #[serde(default)]
    pub returned_today: u64,
}
