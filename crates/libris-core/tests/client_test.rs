//! Integration tests for the REST client and the services that drive it.
//!
//! Every test runs against a wiremock server standing in for the library API.

use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use libris_core::error::Error;
use libris_core::services::import::run_import;
use libris_core::services::updater::{UpdateChecker, UpdateSettings};
use libris_core::{ApiClient, BookStatus, Circulation, LoanActionError, NewBook};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), TOKEN).expect("client should build")
}

fn loan_json(id: i64, due: &str, renewed: u32, returned: bool) -> Value {
    let returned_date = if returned { Some("2024-01-05") } else { None };
    json!({
        "id": id,
        "student": 10,
        "book": 20,
        "borrowed_date": "2024-01-01",
        "due_date": due,
        "returned_date": returned_date,
        "is_returned": returned,
        "paid": false,
        "renewed_count": renewed,
        "or_number": null
    })
}

fn book_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "author": "Rizal, Jose",
        "copies": 1,
        "status": "Available"
    })
}

// ── Requests and pagination ────────────────────────────────────

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/marc/record/"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("page", "1"))
        .and(query_param("search", "rizal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [book_json(1, "Noli Me Tangere")],
            "count": 1,
            "next": null,
            "previous": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server).list_books(1, Some("rizal")).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].title, "Noli Me Tangere");
    assert_eq!(page.results[0].status, BookStatus::Available);
}

#[tokio::test]
async fn test_fetch_all_walks_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/marc/record/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [book_json(1, "A"), book_json(2, "B")],
            "count": 3,
            "next": format!("{}/marc/record/?page=2", server.uri()),
            "previous": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/marc/record/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [book_json(3, "C")],
            "count": 3,
            "next": null,
            "previous": "page1"
        })))
        .mount(&server)
        .await;

    let books = client(&server).fetch_all_books().await.unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_fetch_all_stops_at_page_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/students/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [],
            "count": 0,
            "next": "always-more",
            "previous": null
        })))
        .expect(2)
        .mount(&server)
        .await;

    let result = client(&server).with_max_pages(2).fetch_all_students().await;
    assert!(matches!(result, Err(Error::Internal(_))));
}

// ── Error normalization ────────────────────────────────────────

#[tokio::test]
async fn test_error_uses_message_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/borrow/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Book is not available"})),
        )
        .mount(&server)
        .await;

    let borrow = libris_core::NewBorrow {
        student_id: 10,
        book_id: 20,
        borrowed_date: "2024-01-01".to_string(),
        due_date: "2024-01-08".to_string(),
    };
    match client(&server).create_borrow(&borrow).await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Book is not available");
        }
        other => panic!("expected API error, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test]
async fn test_error_uses_detail_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/staff/4/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})))
        .mount(&server)
        .await;

    let err = client(&server).get_staff(4).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Invalid token."));
}

#[tokio::test]
async fn test_error_falls_back_for_unreadable_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/marc/record/9/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).delete_book(9).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("Something went wrong"));
}

// ── Loan lifecycle against the API ─────────────────────────────

#[tokio::test]
async fn test_renew_posts_next_business_due_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/borrow/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(loan_json(5, "2024-01-11", 2, false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/borrow/renew/5/"))
        .and(body_partial_json(json!({"due_date": "2024-01-18", "renewed_count": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(loan_json(5, "2024-01-18", 3, false)))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let renewed = Circulation::default()
        .renew_loan(&api, 5, d("2024-01-08"), None)
        .await
        .unwrap();
    assert_eq!(renewed.renewed_count, 3);
    assert_eq!(renewed.due_date, "2024-01-18");
}

#[tokio::test]
async fn test_renew_at_cap_never_reaches_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/borrow/6/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(loan_json(6, "2024-01-11", 3, false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/borrow/renew/6/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = client(&server);
    let err = Circulation::default()
        .renew_loan(&api, 6, d("2024-01-08"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle(LoanActionError::RenewalLimitReached { .. })
    ));
}

#[tokio::test]
async fn test_return_of_returned_loan_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/borrow/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(loan_json(7, "2024-01-08", 0, true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/borrow/return/7/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = client(&server);
    let err = Circulation::default()
        .return_loan(&api, 7, d("2024-01-10"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Lifecycle(LoanActionError::AlreadyReturned)));
}

#[tokio::test]
async fn test_pay_fine_sends_computed_amount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/borrow/8/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(loan_json(8, "2024-01-01", 0, false)))
        .mount(&server)
        .await;

    let mut paid = loan_json(8, "2024-01-01", 0, false);
    paid["paid"] = json!(true);
    paid["or_number"] = json!("OR-1001");
    Mock::given(method("POST"))
        .and(path("/borrow/pay/8/"))
        .and(body_partial_json(json!({
            "or_number": "OR-1001",
            "amount": 18.0,
            "days_overdue": 9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(paid))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let rules = Circulation::default();
    let record = rules.pay_fine(&api, 8, d("2024-01-10"), "OR-1001").await.unwrap();
    assert!(record.paid);
    assert_eq!(record.or_number.as_deref(), Some("OR-1001"));
    // The receipt amount is read back from the paid record
    assert_eq!(rules.accrued_fine(&record, d("2024-01-10")), 18.0);
    assert_eq!(rules.outstanding_fine(&record, d("2024-01-10")), 0.0);
}

// ── Import through the API ─────────────────────────────────────

#[tokio::test]
async fn test_import_continues_past_rejected_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/marc/record/"))
        .and(body_partial_json(json!({"title": "Duplicate"})))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"accession_number": ["already exists."]})),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/marc/record/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(book_json(1, "ok")))
        .with_priority(2)
        .expect(2)
        .mount(&server)
        .await;

    let books: Vec<NewBook> = ["First", "Duplicate", "Third"]
        .iter()
        .map(|title| NewBook {
            title: title.to_string(),
            author: "Anon".to_string(),
            copies: 1,
            ..Default::default()
        })
        .collect();

    let api = client(&server);
    let cancel = AtomicBool::new(false);
    let summary = run_import(&books, &api, &cancel, |_| {}).await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].row, 2);
    assert!(summary.failures[0].message.contains("accession_number: already exists."));
}

// ── Update checker ─────────────────────────────────────────────

#[tokio::test]
async fn test_update_check_compares_commits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/libris-app/libris/commits/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "bbbbbbb2222"})))
        .mount(&server)
        .await;

    let checker = UpdateChecker::new(UpdateSettings {
        repo: "libris-app/libris".to_string(),
        branch: "main".to_string(),
        install_dir: std::env::temp_dir(),
    })
    .unwrap()
    .with_api_base(&server.uri());

    let status = checker.check_against("aaaaaaa1111").await.unwrap();
    assert!(status.update_available);
    assert_eq!(status.remote, "bbbbbbb2222");

    let status = checker.check_against("bbbbbbb2222").await.unwrap();
    assert!(!status.update_available);
}

#[tokio::test]
async fn test_poll_returns_first_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/libris-app/libris/commits/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "new"})))
        .mount(&server)
        .await;

    let checker = UpdateChecker::new(UpdateSettings {
        repo: "libris-app/libris".to_string(),
        branch: "main".to_string(),
        install_dir: std::env::temp_dir(),
    })
    .unwrap()
    .with_api_base(&server.uri());

    let cancel = AtomicBool::new(false);
    let status = checker
        .poll_from("old", std::time::Duration::from_millis(10), &cancel)
        .await
        .expect("update should be found");
    assert_eq!(status.remote, "new");
}
