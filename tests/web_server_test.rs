use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use geomcp::web_server::{router, AppState};
use geomcp::{constants, ChatModel, ChatRequest, GatewayError, ModelGateway};

struct Unused;

#[async_trait]
impl ChatModel for Unused {
    async fn generate(&self, _request: &ChatRequest<'_>) -> Result<String, GatewayError> {
        Err(GatewayError::EmptyResponse)
    }
}

fn project_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(name)
}

fn server_with_templates(templates: PathBuf) -> TestServer {
    let gateway = Arc::new(ModelGateway::new(Unused));
    gateway.initialize(constants::SYSTEM_PROMPT).unwrap();
    let state = AppState::new(templates, gateway);
    TestServer::new(router(state, project_dir("static"))).unwrap()
}

#[tokio::test]
async fn test_index_renders_chat_page() {
    let server = server_with_templates(project_dir("templates"));
    let response = server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("<title>GeoMCP Assistent</title>"));
    assert!(html.contains(constants::APP_SUBTITLE));
    assert!(html.contains(constants::INPUT_PLACEHOLDER));
    assert!(html.contains(constants::LOADING_TEXT));
    assert!(html.contains("/static/app.js"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = server_with_templates(project_dir("templates"));
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_static_assets_served_and_missing_is_404() {
    let server = server_with_templates(project_dir("templates"));
    let script = server.get("/static/app.js").await;
    script.assert_status_ok();
    assert!(script.text().contains("new WebSocket"));

    let missing = server.get("/static/nope.js").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    missing.assert_text("Not Found");
}

#[tokio::test]
async fn test_templates_loaded_from_configured_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>{{ title }}</h1><p>{{ disclaimer }}</p>").unwrap();

    let server = server_with_templates(dir.path().to_path_buf());
    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(
        response.text(),
        format!("<h1>{}</h1><p>{}</p>", constants::APP_TITLE, constants::DISCLAIMER)
    );
}

#[tokio::test]
async fn test_missing_template_reports_server_error_page() {
    let dir = tempfile::TempDir::new().unwrap();
    let server = server_with_templates(dir.path().to_path_buf());
    let response = server.get("/").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().starts_with("Internal Server Error"));
}

#[tokio::test]
async fn test_page_script_locks_form_before_sending() {
    let server = server_with_templates(project_dir("templates"));
    let script = server.get("/static/app.js").await.text();

    let handler = &script[script.find("form.addEventListener('submit'").unwrap()..];
    let lock = handler.find("busy = true").expect("submit handler must set busy");
    let send = handler.find("socket.send(").unwrap();
    assert!(lock < send, "form must be locked before the frame is sent");
}
