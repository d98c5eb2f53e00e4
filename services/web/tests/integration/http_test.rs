use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use schoolhub_auth_types::cookie::SESSION_COOKIE;
use schoolhub_domain::image::MAX_IMAGE_BYTES;
use schoolhub_testing::auth::MockSession;
use schoolhub_testing::images::{TINY_GIF, TINY_PNG, oversized};
use schoolhub_web::infra::mailer::Mailer;
use schoolhub_web::infra::storage::{ImageStore, LocalDiskStore};
use schoolhub_web::router::build_router;
use schoolhub_web::state::{AppState, Settings};
use schoolhub_web_schema::{schools, users};

use crate::helpers::{ten_minutes, test_keys};

struct TestApp {
    server: TestServer,
    dir: TempDir,
}

impl TestApp {
    fn images_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("images")
    }

    fn staging_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("staging")
    }
}

fn app(db: DatabaseConnection) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        db,
        test_keys(),
        Mailer::Console,
        ImageStore::LocalDisk(LocalDiskStore::new(
            dir.path().join("images"),
            "/schoolImages".to_owned(),
        )),
        Settings {
            otp_ttl: ten_minutes(),
            expose_code: true,
            secure_cookies: false,
            staging_dir: dir.path().join("staging"),
        },
    );
    let server = TestServer::new(build_router(state)).unwrap();
    TestApp { server, dir }
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn rows(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn user_row(email: &str) -> users::Model {
    let now = Utc::now();
    users::Model {
        id: Uuid::now_v7(),
        email: email.to_owned(),
        name: "a".to_owned(),
        is_admin: false,
        last_login: Some(now),
        created_at: now,
    }
}

fn session_cookie() -> (HeaderName, HeaderValue) {
    MockSession::new("admin@school.org").cookie_header()
}

fn school_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("name", "Green Valley High")
        .add_text("address", "12 Hill Road")
        .add_text("city", "Pune")
        .add_text("state", "Maharashtra")
        .add_text("contact", "9876543210")
        .add_text("email_id", "office@greenvalley.edu")
}

fn png_part() -> Part {
    Part::bytes(TINY_PNG.to_vec())
        .file_name("school.png")
        .mime_type("image/png")
}

fn dir_entries(path: &std::path::Path) -> usize {
    std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}

// ── Auth ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_log_in_with_requested_code() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // replace: delete old codes, insert new one; consume: delete the row
        .append_exec_results([rows(0), rows(1), rows(1)])
        .append_query_results([vec![user_row("a@b.com")]])
        .into_connection();
    let app = app(db);

    let requested = app
        .server
        .post("/api/auth/request-otp")
        .json(&json!({ "email": "a@b.com" }))
        .await;
    requested.assert_status_ok();
    let body: Value = requested.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["email"], "a@b.com");
    let otp = body["otp"].as_str().unwrap().to_owned();
    assert_eq!(otp.len(), 6);

    let verified = app
        .server
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "a@b.com", "otp": otp }))
        .await;
    verified.assert_status_ok();
    let body: Value = verified.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["email"], "a@b.com");

    let cookie = verified.cookie(SESSION_COOKIE);
    assert_eq!(cookie.http_only(), Some(true));
    let session = test_keys().verify(cookie.value()).unwrap();
    assert_eq!(session.email, "a@b.com");
}

#[tokio::test]
async fn should_reject_spent_code() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([rows(0)])
        .into_connection();
    let app = app(db);

    let resp = app
        .server
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "a@b.com", "otp": "123456" }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "INVALID_OR_EXPIRED_CODE");
    assert!(resp.maybe_cookie(SESSION_COOKIE).is_none());
}

#[tokio::test]
async fn should_reject_invalid_email_on_request() {
    let app = app(empty_db());

    let resp = app
        .server
        .post("/api/auth/request-otp")
        .json(&json!({ "email": "nope" }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["kind"], "VALIDATION");
    assert_eq!(body["message"], "Valid email is required");
}

#[tokio::test]
async fn should_wrap_malformed_json_in_envelope() {
    let app = app(empty_db());

    let resp = app
        .server
        .post("/api/auth/request-otp")
        .content_type("application/json")
        .text("{\"email\":")
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn should_report_current_user_only_with_session() {
    let app = app(empty_db());

    let anonymous: Value = app.server.get("/api/auth/me").await.json();
    assert_eq!(anonymous["success"], false);
    assert!(anonymous["user"].is_null());

    let (name, value) = session_cookie();
    let signed_in: Value = app
        .server
        .get("/api/auth/me")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(signed_in["success"], true);
    assert_eq!(signed_in["user"]["email"], "admin@school.org");
}

#[tokio::test]
async fn should_ignore_forged_session_cookie() {
    let app = app(empty_db());

    let body: Value = app
        .server
        .get("/api/auth/me")
        .add_header(
            HeaderName::from_static("cookie"),
            HeaderValue::from_static("auth_token=not.a.jwt"),
        )
        .await
        .json();

    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn should_clear_cookie_on_logout() {
    let app = app(empty_db());

    for resp in [
        app.server.post("/api/auth/logout").await,
        app.server.get("/api/auth/logout").await,
    ] {
        resp.assert_status_ok();
        let set_cookie = resp.header("set-cookie");
        let set_cookie = set_cookie.to_str().unwrap();
        assert!(set_cookie.starts_with("auth_token="), "{set_cookie}");
        assert!(set_cookie.contains("Max-Age=0"), "{set_cookie}");
        let body: Value = resp.json();
        assert_eq!(body["message"], "Logged out successfully");
    }
}

// ── Directory ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_add_school_without_session() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([rows(1)])
        .into_connection();
    let app = app(db);

    let resp = app
        .server
        .post("/api/addSchool")
        .multipart(school_form().add_part("image", png_part()))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let body: Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(dir_entries(&app.images_dir()), 1);
}

fn blank_file_part() -> Part {
    Part::bytes(Vec::new())
        .file_name("")
        .mime_type("application/octet-stream")
}

#[tokio::test]
async fn should_ignore_blank_file_input_and_report_field_errors() {
    let app = app(empty_db());
    let form = MultipartForm::new()
        .add_text("name", "Green Valley High")
        .add_part("image", blank_file_part());

    let resp = app.server.post("/api/addSchool").multipart(form).await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_object().unwrap();
    let keys: Vec<_> = errors.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["address", "city", "contact", "email", "state"]);
    assert_eq!(dir_entries(&app.staging_dir()), 0);
}

#[tokio::test]
async fn should_require_image_when_file_input_left_blank() {
    let app = app(empty_db());

    let resp = app
        .server
        .post("/api/addSchool")
        .multipart(school_form().add_part("image", blank_file_part()))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "School image is required");
    assert_eq!(dir_entries(&app.images_dir()), 0);
}

#[tokio::test]
async fn should_accept_gif_image() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([rows(1)])
        .into_connection();
    let app = app(db);
    let gif = Part::bytes(TINY_GIF.to_vec())
        .file_name("crest.gif")
        .mime_type("image/gif");

    let resp = app
        .server
        .post("/api/addSchool")
        .multipart(school_form().add_part("image", gif))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let stored: Vec<_> = std::fs::read_dir(app.images_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].extension().unwrap(), "gif");
    assert_eq!(std::fs::read(&stored[0]).unwrap(), TINY_GIF);
}

#[tokio::test]
async fn should_add_school_and_store_image() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([rows(1)])
        .into_connection();
    let app = app(db);
    let (name, value) = session_cookie();

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(school_form().add_part("image", png_part()))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let body: Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "School added successfully");
    assert!(Uuid::parse_str(body["schoolId"].as_str().unwrap()).is_ok());

    let stored: Vec<_> = std::fs::read_dir(app.images_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(std::fs::read(&stored[0]).unwrap(), TINY_PNG);
    assert_eq!(dir_entries(&app.staging_dir()), 0);
}

#[tokio::test]
async fn should_reject_non_image_upload() {
    let app = app(empty_db());
    let (name, value) = session_cookie();
    let pdf = Part::bytes(b"%PDF-1.7".to_vec())
        .file_name("report.pdf")
        .mime_type("application/pdf");

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(school_form().add_part("image", pdf))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Only image files are allowed!");
    assert_eq!(dir_entries(&app.staging_dir()), 0);
}

#[tokio::test]
async fn should_reject_oversized_image() {
    let app = app(empty_db());
    let (name, value) = session_cookie();
    let big = Part::bytes(oversized(MAX_IMAGE_BYTES as usize + 1))
        .file_name("huge.png")
        .mime_type("image/png");

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(school_form().add_part("image", big))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Image must be 5 MB or smaller");
    assert_eq!(dir_entries(&app.staging_dir()), 0);
    assert_eq!(dir_entries(&app.images_dir()), 0);
}

#[tokio::test]
async fn should_report_field_errors() {
    let app = app(empty_db());
    let (name, value) = session_cookie();
    let form = MultipartForm::new()
        .add_text("name", "Green Valley High")
        .add_text("address", "12 Hill Road")
        .add_text("city", "Pune")
        .add_text("state", "Maharashtra")
        .add_text("contact", "12345")
        .add_text("email", "office@greenvalley.edu")
        .add_part("image", png_part());

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(form)
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["contact"], "Contact must be a 10-digit number");
    assert_eq!(dir_entries(&app.images_dir()), 0);
}

#[tokio::test]
async fn should_reject_second_image() {
    let app = app(empty_db());
    let (name, value) = session_cookie();

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(
            school_form()
                .add_part("image", png_part())
                .add_part("image", png_part()),
        )
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["message"], "Only one school image may be uploaded");
}

#[tokio::test]
async fn should_drop_stored_image_when_insert_fails() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_errors([DbErr::Custom("connection reset".to_owned())])
        .into_connection();
    let app = app(db);
    let (name, value) = session_cookie();

    let resp = app
        .server
        .post("/api/addSchool")
        .add_header(name, value)
        .multipart(school_form().add_part("image", png_part()))
        .await;

    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json();
    assert_eq!(body["kind"], "PERSISTENCE");
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(dir_entries(&app.images_dir()), 0);
}

#[tokio::test]
async fn should_list_schools_with_millisecond_timestamps() {
    let created_at = Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap();
    let row = schools::Model {
        id: Uuid::now_v7(),
        name: "Green Valley High".to_owned(),
        address: "12 Hill Road".to_owned(),
        city: "Pune".to_owned(),
        state: "Maharashtra".to_owned(),
        contact: "9876543210".to_owned(),
        email: "office@greenvalley.edu".to_owned(),
        image: "/schoolImages/image-1.png".to_owned(),
        created_at,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();
    let app = app(db);

    let resp = app.server.get("/api/getSchools").await;

    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["success"], true);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["email"], "office@greenvalley.edu");
    assert_eq!(data[0]["image"], "/schoolImages/image-1.png");
    assert_eq!(data[0]["created_at"], "2026-10-01T08:30:00.000Z");
}

// ── Plumbing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_answer_liveness_with_request_id() {
    let app = app(empty_db());

    let resp = app.server.get("/healthz").await;
    resp.assert_status_ok();
    assert!(!resp.header("x-request-id").is_empty());

    let echoed = app
        .server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;
    assert_eq!(echoed.header("x-request-id"), "req-123");
}

#[tokio::test]
async fn should_serve_stored_images() {
    let app = app(empty_db());
    std::fs::create_dir_all(app.images_dir()).unwrap();
    std::fs::write(app.images_dir().join("image-1.png"), TINY_PNG).unwrap();

    let resp = app.server.get("/schoolImages/image-1.png").await;

    resp.assert_status_ok();
    assert_eq!(resp.as_bytes().as_ref(), TINY_PNG);
}
