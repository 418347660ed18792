//! Library REST API client
//!
//! One method per backend operation. Every request carries the bearer token;
//! a non-success response is turned into a single [`Error::Api`] whose message
//! comes from the body's `message` or `detail` field. Nothing is retried.

use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    Book, BorrowRecord, DashboardStats, NewBook, NewBorrow, NewStaff, NewStudent, Paginated,
    PaymentRequest, RenewRequest, ReturnRequest, Staff, Student, UpdateBook, UpdateBorrower,
};

/// Upper bound on pages walked by the `fetch_all_*` helpers
pub const DEFAULT_MAX_PAGES: u32 = 500;

const FALLBACK_ERROR: &str = "Something went wrong while contacting the library server";

pub const BOOKS_PATH: &str = "/marc/record/";
pub const STUDENTS_PATH: &str = "/students/";
pub const STAFF_PATH: &str = "/staff/";
pub const BORROW_PATH: &str = "/borrow/";

/// Library API client
pub struct ApiClient {
    base_url: String,
    client: Client,
    max_pages: u32,
}

impl ApiClient {
    /// Create a new client for `base_url` authenticating with `token`
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::config("API URL is not configured"));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::config("API token is not configured"));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::config(format!("Invalid API token: {}", e)))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            base_url,
            client,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).query(query).send().await?;
        decode(response).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        log::debug!("{} {}", method, path);
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        log::debug!("DELETE {}", path);
        let response = self.client.delete(self.url(path)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Fetch one page of a list endpoint
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        search: Option<&str>,
    ) -> Result<Paginated<T>> {
        let mut query = vec![("page", page.to_string())];
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            query.push(("search", term.trim().to_string()));
        }
        self.get(path, &query).await
    }

    /// Walk every page of a list endpoint sequentially
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        search: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let batch: Paginated<T> = self.list_page(path, page, search).await?;
            let has_next = batch.next.is_some();
            items.extend(batch.results);

            if !has_next {
                break;
            }
            if page >= self.max_pages {
                return Err(Error::internal(format!(
                    "{} still reports more results after {} pages",
                    path, self.max_pages
                )));
            }
            page += 1;
        }

        log::debug!("Fetched {} items from {} in {} page(s)", items.len(), path, page);
        Ok(items)
    }

    // ── Books ──────────────────────────────────────────────────

    pub async fn list_books(&self, page: u32, search: Option<&str>) -> Result<Paginated<Book>> {
        self.list_page(BOOKS_PATH, page, search).await
    }

    pub async fn fetch_all_books(&self) -> Result<Vec<Book>> {
        self.fetch_all(BOOKS_PATH, None).await
    }

    pub async fn get_book(&self, id: i64) -> Result<Book> {
        self.get(&format!("{}{}/", BOOKS_PATH, id), &[]).await
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book> {
        self.send(Method::POST, BOOKS_PATH, book).await
    }

    pub async fn update_book(&self, id: i64, update: &UpdateBook) -> Result<Book> {
        self.send(Method::PATCH, &format!("{}{}/", BOOKS_PATH, id), update).await
    }

    pub async fn delete_book(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}{}/", BOOKS_PATH, id)).await
    }

    // ── Students ───────────────────────────────────────────────

    pub async fn list_students(&self, page: u32, search: Option<&str>) -> Result<Paginated<Student>> {
        self.list_page(STUDENTS_PATH, page, search).await
    }

    pub async fn fetch_all_students(&self) -> Result<Vec<Student>> {
        self.fetch_all(STUDENTS_PATH, None).await
    }

    pub async fn get_student(&self, id: i64) -> Result<Student> {
        self.get(&format!("{}{}/", STUDENTS_PATH, id), &[]).await
    }

    pub async fn create_student(&self, student: &NewStudent) -> Result<Student> {
        self.send(Method::POST, STUDENTS_PATH, student).await
    }

    pub async fn update_student(&self, id: i64, update: &UpdateBorrower) -> Result<Student> {
        self.send(Method::PATCH, &format!("{}{}/", STUDENTS_PATH, id), update).await
    }

    pub async fn delete_student(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}{}/", STUDENTS_PATH, id)).await
    }

    // ── Staff ──────────────────────────────────────────────────

    pub async fn list_staff(&self, page: u32, search: Option<&str>) -> Result<Paginated<Staff>> {
        self.list_page(STAFF_PATH, page, search).await
    }

    pub async fn fetch_all_staff(&self) -> Result<Vec<Staff>> {
        self.fetch_all(STAFF_PATH, None).await
    }

    pub async fn get_staff(&self, id: i64) -> Result<Staff> {
        self.get(&format!("{}{}/", STAFF_PATH, id), &[]).await
    }

    pub async fn create_staff(&self, staff: &NewStaff) -> Result<Staff> {
        self.send(Method::POST, STAFF_PATH, staff).await
    }

    pub async fn update_staff(&self, id: i64, update: &UpdateBorrower) -> Result<Staff> {
        self.send(Method::PATCH, &format!("{}{}/", STAFF_PATH, id), update).await
    }

    pub async fn delete_staff(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}{}/", STAFF_PATH, id)).await
    }

    // ── Borrow records ─────────────────────────────────────────

    pub async fn list_borrows(&self, page: u32, search: Option<&str>) -> Result<Paginated<BorrowRecord>> {
        self.list_page(BORROW_PATH, page, search).await
    }

    pub async fn fetch_all_borrows(&self) -> Result<Vec<BorrowRecord>> {
        self.fetch_all(BORROW_PATH, None).await
    }

    pub async fn get_borrow(&self, id: i64) -> Result<BorrowRecord> {
        self.get(&format!("{}{}/", BORROW_PATH, id), &[]).await
    }

    pub async fn create_borrow(&self, borrow: &NewBorrow) -> Result<BorrowRecord> {
        self.send(Method::POST, BORROW_PATH, borrow).await
    }

    pub async fn return_borrow(&self, id: i64, request: &ReturnRequest) -> Result<BorrowRecord> {
        self.send(Method::POST, &format!("{}return/{}/", BORROW_PATH, id), request).await
    }

    pub async fn renew_borrow(&self, id: i64, request: &RenewRequest) -> Result<BorrowRecord> {
        self.send(Method::POST, &format!("{}renew/{}/", BORROW_PATH, id), request).await
    }

    pub async fn pay_borrow(&self, id: i64, payment: &PaymentRequest) -> Result<BorrowRecord> {
        self.send(Method::POST, &format!("{}pay/{}/", BORROW_PATH, id), payment).await
    }

    // ── Stats ──────────────────────────────────────────────────

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.get("/stats/dashboard/", &[]).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn api_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| FALLBACK_ERROR.to_string());
    log::warn!("API request failed with HTTP {}: {}", status, message);
    Error::Api { status, message }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, then `detail`, then the first field error of a
/// `{"field": ["problem"]}` validation body.
pub fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    for key in ["message", "detail"] {
        if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }

    let object = value.as_object()?;
    object.iter().find_map(|(field, problems)| {
        let first = match problems {
            serde_json::Value::Array(list) => list.first()?.as_str()?.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => return None,
        };
        if first.trim().is_empty() {
            return None;
        }
        Some(format!("{}: {}", field, first))
    })
}
