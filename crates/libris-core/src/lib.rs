//! # libris-core
//!
//! Circulation logic and REST client for the Libris library client.
//!
//! This crate provides:
//! - Loan lifecycle rules, fines and renewals (`services::circulation`,
//!   `services::overdue`)
//! - CSV import of books and students (`services::import`)
//! - The library REST API client (`client`)
//! - Reports, configuration and the local activity log

pub mod activity;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod services;

pub use activity::{ActivityEntry, ActivityLog};
pub use client::ApiClient;
pub use config::AppConfig;
pub use error::{Error, Result};

pub use models::{
    Book, BookStatus, BorrowRecord, DashboardStats, NewBook, NewBorrow, NewStaff, NewStudent,
    Paginated, Staff, Student, UpdateBook, UpdateBorrower,
};

pub use services::{
    Circulation, FinePolicy, ImportSummary, LoanActionError, LoanState, RenewalPolicy,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
