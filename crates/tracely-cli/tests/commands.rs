//! End-to-end command tests against a mock collector and dashboard.

use clap::Parser;
use serde_json::{json, Value};
use tempfile::TempDir;
use tracely_cli::cli::{Cli, Command};
use tracely_cli::{CliError, Exit};
use tracely_common_config::{TracelyConfig, TracelySettings};
use tracely_common_core::{FileStore, LocalStore};
use tracely_dashboard::{CURRENT_APP_KEY, TOKEN_KEY, USER_KEY};
use tracely_sdk::USER_ID_KEY;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, dir: &TempDir) -> TracelySettings {
    let mut settings = TracelySettings::default();
    settings.sdk = TracelyConfig::new("a1", "s1", server.uri());
    settings.dashboard.base_url = server.uri();
    settings.dashboard.data_dir = Some(dir.path().to_path_buf());
    settings
}

async fn run(args: &[&str], settings: TracelySettings) -> Result<(), CliError> {
    let mut argv = vec!["tracely"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().execute(settings).await
}

fn state(dir: &TempDir) -> FileStore {
    FileStore::open(dir.path().join("state.json")).unwrap()
}

async fn bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["tracely", "report", "error", "-m", "boom", "-vv", "--format", "json"]).unwrap();
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Command::Report(_)));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["tracely", "-q", "-v", "sign"]).is_err());
}

#[test]
fn test_dash_alias() {
    let cli = Cli::try_parse_from(["tracely", "dash", "apps"]).unwrap();
    assert!(matches!(cli.command, Command::Dashboard(_)));
}

#[tokio::test]
async fn test_report_error_is_signed_and_posted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/report/error"))
        .and(header("X-App-Id", "a1"))
        .and(header_exists("X-Timestamp"))
        .and(header_exists("X-Nonce"))
        .and(header_exists("X-Signature"))
        .and(body_partial_json(json!({"type": "jsError", "message": "boom", "url": "http://h/a"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &["report", "error", "-t", "jsError", "-m", "boom", "--url", "http://h/a"],
        settings(&server, &dir),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_rejected_report_is_a_network_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/report/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = run(&["report", "error", "-m", "boom"], settings(&server, &dir))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), Exit::NetworkError);
}

#[tokio::test]
async fn test_report_requires_credentials() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut settings = settings(&server, &dir);
    settings.sdk.app_secret = "".into();

    let err = run(&["report", "error", "-m", "boom"], settings).await.unwrap_err();
    assert_eq!(err.exit_code(), Exit::ConfigError);
    assert!(err.hint().unwrap().contains("TRACELY_APP_SECRET"));
}

#[tokio::test]
async fn test_report_active_reuses_persisted_user_id() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/report/active"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    for _ in 0..2 {
        run(&["report", "active", "-p", "/home", "-d", "12"], settings(&server, &dir))
            .await
            .unwrap();
    }

    let bodies = bodies(&server).await;
    assert_eq!(bodies[0]["appId"], "a1");
    assert_eq!(bodies[0]["page"], "/home");
    assert_eq!(bodies[0]["duration"], 12);
    assert_eq!(bodies[0]["userId"], bodies[1]["userId"]);

    let stored = state(&dir).get(USER_ID_KEY).unwrap().unwrap();
    assert_eq!(bodies[0]["userId"], stored.as_str());
}

#[tokio::test]
async fn test_seed_sends_every_planned_report() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/report/active"))
        .respond_with(ResponseTemplate::new(200))
        .expect(8)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report/error"))
        .respond_with(ResponseTemplate::new(200))
        .expect(10)
        .mount(&server)
        .await;

    run(
        &[
            "seed",
            "--per-page",
            "1",
            "--per-error",
            "1",
            "--active-delay-ms",
            "0",
            "--error-delay-ms",
            "0",
        ],
        settings(&server, &dir),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_seed_fails_when_nothing_is_accepted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = run(
        &["seed", "--skip-active", "--per-error", "1", "--error-delay-ms", "0"],
        settings(&server, &dir),
    )
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), Exit::NetworkError);
}

#[tokio::test]
async fn test_login_then_apps_selects_first_app() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({"username": "admin", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t1", "username": "admin"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/apps"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apps": [{"appId": "a1", "appName": "Shop"}, {"appId": "a2", "appName": "Blog"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    run(&["dashboard", "login", "-u", "admin", "-p", "pw"], settings(&server, &dir))
        .await
        .unwrap();
    run(&["dashboard", "apps"], settings(&server, &dir)).await.unwrap();

    let state = state(&dir);
    assert_eq!(state.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    assert_eq!(state.get(CURRENT_APP_KEY).unwrap().as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_use_unknown_app_lists_suggestions() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apps": [{"appId": "a1", "appName": "Shop"}]
        })))
        .mount(&server)
        .await;

    let err = run(&["dashboard", "use", "a9"], settings(&server, &dir))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), Exit::NotFound);
    assert_eq!(err.suggestions(), ["a1".to_string()]);
    assert_eq!(state(&dir).get(CURRENT_APP_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_errors_query_carries_selected_app() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    state(&dir).set(CURRENT_APP_KEY, "a2").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/errors"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "100"))
        .and(query_param("type", "jsError"))
        .and(query_param("appID", "a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [], "total": 0})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &["dashboard", "errors", "--page", "2", "--page-size", "500", "-t", "jsError"],
        settings(&server, &dir),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_expired_session_is_cleared() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    {
        let state = state(&dir);
        state.set(TOKEN_KEY, "stale").unwrap();
        state.set(USER_KEY, "admin").unwrap();
    }

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = run(&["dashboard", "overview"], settings(&server, &dir))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::User { .. }));

    let state = state(&dir);
    assert_eq!(state.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(state.get(USER_KEY).unwrap(), None);
}
