//! End-to-end controller flows against an in-process transport.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use profiledash::client::{GraphQlRequest, Transport};
use profiledash::config::Config;
use profiledash::error::DashError;
use profiledash::stats::TimeRange;
use profiledash::token::{KeyValueStore, MemoryStore, TokenStore};
use profiledash::view::{DashboardPhase, Document, DrawOp, Page, Target, ViewController, ViewState};

const KEY: &str = "jwt_token";

fn token_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "42", "exp": exp}).to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

fn live_token() -> String {
    token_with_exp(Utc::now().timestamp() + 3600)
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// Answers each GraphQL operation from a canned table and records calls.
struct StubTransport {
    sign_in: Result<String, DashError>,
    responses: HashMap<&'static str, Result<Value, DashError>>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    fn healthy() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "UserProfile",
            Ok(json!({"user": [{
                "id": 42,
                "login": "amy",
                "attrs": {"firstName": "Amy", "lastName": "Otieno", "email": "amy@example.com", "country": "Kenya"},
                "createdAt": "2023-09-01T08:00:00Z"
            }]})),
        );
        responses.insert(
            "XpTransactions",
            Ok(json!({"transaction": [
                {"id": 1, "type": "xp", "amount": 5000, "createdAt": "2024-01-10T10:00:00Z", "path": "/kisumu/module/go-reloaded", "objectId": 100},
                {"id": 2, "type": "xp", "amount": 5000, "createdAt": "2024-01-11T10:00:00Z", "path": "/kisumu/module/go-reloaded", "objectId": 100},
                {"id": 3, "type": "xp", "amount": 10000, "createdAt": "2024-06-01T10:00:00Z", "path": "/kisumu/module/ascii-art", "objectId": 101}
            ]})),
        );
        responses.insert(
            "AuditTransactions",
            Ok(json!({"transaction": [
                {"id": 10, "type": "up", "amount": 3000, "createdAt": "2024-02-01T10:00:00Z", "path": "/a"},
                {"id": 11, "type": "down", "amount": 2000, "createdAt": "2024-02-02T10:00:00Z", "path": "/b"}
            ]})),
        );
        responses.insert(
            "SkillTransactions",
            Ok(json!({"transaction": [
                {"id": 20, "type": "skill_go", "amount": 40, "createdAt": "2024-02-01T10:00:00Z", "path": "/a"},
                {"id": 21, "type": "skill_js", "amount": 25, "createdAt": "2024-02-01T10:00:00Z", "path": "/b"}
            ]})),
        );
        responses.insert(
            "CompletedProjects",
            Ok(json!({"progress": [
                {"id": 30, "objectId": 100, "grade": 1.2, "createdAt": "2024-01-11T10:00:00Z", "path": "/kisumu/module/go-reloaded", "isDone": true,
                 "object": {"id": 100, "name": "go-reloaded", "type": "project"}}
            ]})),
        );
        responses.insert(
            "PendingProjects",
            Ok(json!({"progress": [
                {"id": 31, "objectId": 102, "grade": null, "createdAt": "2024-06-08T12:00:00Z", "path": "/kisumu/module/forum", "isDone": false,
                 "object": {"id": 102, "name": "forum", "type": "project"}}
            ]})),
        );
        Self { sign_in: Ok(live_token()), responses, calls: Mutex::new(Vec::new()) }
    }

    fn respond(mut self, operation: &'static str, outcome: Result<Value, DashError>) -> Self {
        self.responses.insert(operation, outcome);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn sign_in(&self, _login: &str, _password: &str) -> Result<String, DashError> {
        self.calls.lock().unwrap().push("signin".to_string());
        self.sign_in.clone()
    }

    async fn execute(&self, _token: &str, request: &GraphQlRequest) -> Result<Value, DashError> {
        let op = request.operation().to_string();
        self.calls.lock().unwrap().push(op.clone());
        self.responses
            .get(op.as_str())
            .cloned()
            .unwrap_or_else(|| Err(DashError::GraphQl(format!("no stub for {}", op))))
    }
}

fn controller(transport: StubTransport, stored: Option<String>) -> ViewController<StubTransport, MemoryStore> {
    let mut backend = MemoryStore::new();
    if let Some(token) = stored {
        backend.write(KEY, &token).unwrap();
    }
    let cfg = Config::with_api_base("http://localhost/api");
    ViewController::new(transport, TokenStore::new(backend, KEY), &cfg).with_clock(fixed_now)
}

#[tokio::test]
async fn boot_with_stored_token_renders_everything() {
    let mut ctl = controller(StubTransport::healthy(), Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);

    assert_eq!(ctl.state(), &ViewState::Dashboard(DashboardPhase::Ready));
    assert_eq!(doc.page(), Page::Dashboard);
    assert_eq!(doc.text(Target::ProfileName), Some("Amy Otieno"));
    assert_eq!(doc.text(Target::ProfileEmail), Some("amy@example.com"));
    // 5000 (deduplicated) + 10000
    assert_eq!(doc.text(Target::TotalXp), Some("15K"));
    assert_eq!(doc.text(Target::Level), Some("4"));
    assert_eq!(doc.text(Target::AuditRatio), Some("1.5"));
    assert_eq!(doc.text(Target::ProjectsCount), Some("1"));
    assert!(doc.svg(Target::AuditChart).is_some());
    assert!(doc.svg(Target::SkillsChart).is_some());
    assert!(doc.element(Target::CurrentProject).unwrap().text_content().contains("forum"));
}

#[tokio::test]
async fn failed_audit_section_only_marks_that_section() {
    let transport = StubTransport::healthy()
        .respond("AuditTransactions", Err(DashError::Network("HTTP 500 Internal Server Error".to_string())));
    let mut ctl = controller(transport, Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);

    assert_eq!(ctl.state(), &ViewState::Dashboard(DashboardPhase::PartiallyFailed(vec!["audit"])));
    let err = doc.error(Target::AuditChart).unwrap();
    assert!(err.contains("HTTP 500"));
    assert_eq!(doc.text(Target::AuditRatio), Some("N/A"));
    assert_eq!(doc.text(Target::ProfileName), Some("Amy Otieno"));
    assert!(doc.svg(Target::XpChart).is_some());
    assert!(doc.svg(Target::SkillsChart).is_some());
    assert!(ctl.tokens().get().is_some());
}

#[tokio::test]
async fn malformed_xp_row_keeps_the_rest_of_the_section() {
    let transport = StubTransport::healthy().respond(
        "XpTransactions",
        Ok(json!({"transaction": [
            {"id": 1, "type": "xp", "amount": 5000, "createdAt": "2024-06-01T10:00:00Z", "path": "/kisumu/module/go-reloaded", "objectId": 100},
            {"id": 2, "type": "xp", "amount": null, "createdAt": "2024-06-02T10:00:00Z", "path": "/kisumu/module/ascii-art", "objectId": 101}
        ]})),
    );
    let mut ctl = controller(transport, Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);

    assert_eq!(ctl.state(), &ViewState::Dashboard(DashboardPhase::Ready));
    assert_eq!(doc.text(Target::TotalXp), Some("5K"));
    assert_eq!(doc.text(Target::Level), Some("2"));
    assert!(doc.error(Target::XpChart).is_none());
}

#[tokio::test]
async fn auth_failure_in_any_section_ends_the_session() {
    let transport = StubTransport::healthy()
        .respond("SkillTransactions", Err(DashError::Auth("HTTP 401 Unauthorized".to_string())));
    let mut ctl = controller(transport, Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);

    assert!(matches!(ctl.state(), ViewState::Unauthenticated { error: Some(_) }));
    assert_eq!(doc.page(), Page::Login);
    assert!(doc.error(Target::LoginError).is_some());
    assert!(doc.slot(Target::TotalXp).is_none());
    assert_eq!(ctl.tokens().backend().read(KEY), None);
}

#[tokio::test]
async fn essential_user_failure_shows_banner() {
    let transport = StubTransport::healthy().respond("UserProfile", Err(DashError::GraphQl("field not found".to_string())));
    let mut ctl = controller(transport, Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);

    assert!(matches!(ctl.state(), ViewState::Dashboard(DashboardPhase::Failed(_))));
    assert!(doc.error(Target::Banner).unwrap().contains("field not found"));
    // secondary sections never ran
    assert_eq!(ctl_calls(&ctl), vec!["UserProfile".to_string()]);
}

fn ctl_calls(ctl: &ViewController<StubTransport, MemoryStore>) -> Vec<String> {
    ctl.transport().calls()
}

#[tokio::test]
async fn expired_token_boots_to_login_without_requests() {
    let mut ctl = controller(StubTransport::healthy(), Some(token_with_exp(1_000)));
    let ops = ctl.boot().await;

    assert_eq!(ops, vec![DrawOp::ShowPage(Page::Login)]);
    assert_eq!(ctl.state(), &ViewState::Unauthenticated { error: None });
    assert!(ctl_calls(&ctl).is_empty());
    assert_eq!(ctl.tokens().backend().read(KEY), None);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let mut ctl = controller(StubTransport::healthy(), None);
    let mut doc = Document::new();
    doc.apply_all(ctl.login("  ", "secret").await);

    assert_eq!(doc.error(Target::LoginError), Some("Please enter both username and password"));
    assert!(ctl_calls(&ctl).is_empty());
}

#[tokio::test]
async fn login_then_logout() {
    let mut ctl = controller(StubTransport::healthy(), None);
    let mut doc = Document::new();
    doc.apply_all(ctl.login("amy", "secret").await);

    assert_eq!(ctl.state(), &ViewState::Dashboard(DashboardPhase::Ready));
    assert!(!doc.is_busy());
    assert!(ctl.tokens().backend().read(KEY).is_some());
    assert_eq!(ctl_calls(&ctl)[0], "signin");

    doc.apply_all(ctl.logout());
    assert_eq!(doc.page(), Page::Login);
    assert!(doc.slot(Target::ProfileName).is_none());
    assert_eq!(ctl.tokens().backend().read(KEY), None);
}

#[tokio::test]
async fn rejected_credentials_stay_on_login() {
    let mut transport = StubTransport::healthy();
    transport.sign_in = Err(DashError::Auth("Invalid credentials: HTTP 401 Unauthorized".to_string()));
    let mut ctl = controller(transport, None);
    let mut doc = Document::new();
    doc.apply_all(ctl.login("amy", "wrong").await);

    assert!(matches!(ctl.state(), ViewState::Unauthenticated { error: Some(_) }));
    assert!(doc.error(Target::LoginError).unwrap().starts_with("Login failed"));
    assert_eq!(ctl.tokens().backend().read(KEY), None);
}

#[tokio::test]
async fn malformed_sign_in_token_is_rejected() {
    let mut transport = StubTransport::healthy();
    transport.sign_in = Ok("not-a-jwt".to_string());
    let mut ctl = controller(transport, None);
    let mut doc = Document::new();
    doc.apply_all(ctl.login("amy", "secret").await);

    assert_eq!(doc.error(Target::LoginError), Some("Login failed: Invalid token format received"));
    assert_eq!(ctl.tokens().backend().read(KEY), None);
}

#[tokio::test]
async fn range_change_rerenders_from_cache() {
    let mut ctl = controller(StubTransport::healthy(), Some(live_token()));
    let mut doc = Document::new();
    doc.apply_all(ctl.boot().await);
    let before = ctl_calls(&ctl).len();

    // one month back from 2024-06-15 keeps only the June gain
    let month = doc.svg(Target::XpChart).unwrap();
    assert_eq!(month.matches("class=\"xp-point\"").count(), 1);

    let ops = ctl.select_range(TimeRange::All);
    assert!(ops.iter().all(|op| matches!(op.target(), Some(Target::XpChart) | Some(Target::XpRangeSelector))));
    doc.apply_all(ops);
    let all = doc.svg(Target::XpChart).unwrap();
    assert_eq!(all.matches("class=\"xp-point\"").count(), 2);
    assert_eq!(ctl_calls(&ctl).len(), before);
    assert_eq!(ctl.range(), TimeRange::All);
    assert_eq!(doc.text(Target::TotalXp), Some("15K"));
    assert_eq!(doc.text(Target::Level), Some("4"));
}

#[tokio::test]
async fn range_change_is_ignored_when_logged_out() {
    let mut ctl = controller(StubTransport::healthy(), None);
    ctl.boot().await;
    assert!(ctl.select_range(TimeRange::Months(6)).is_empty());
}
