use super::*;
use axum::{
    extract::State,
    http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
    Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

const ACCOUNT_ID: &str = "c931ef6c-ecdf-40db-87de-0d2c629ef322";

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn not_found_body() -> String {
    json!({"error": {"code": "", "message": {"lang": "", "value": "Account not found"}}}).to_string()
}

async fn handle_any(
    State(state): State<ServerState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().await.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.clone(),
    });

    let path = uri.path();
    match method {
        HttpMethod::GET if path.ends_with("/$count") => (StatusCode::OK, "3".to_string()),
        HttpMethod::GET if path.ends_with("/crm/Accounts") => (
            StatusCode::OK,
            json!({"d": {"results": [{"ID": ACCOUNT_ID, "Name": "Acme"}]}}).to_string(),
        ),
        HttpMethod::GET if path.contains(ACCOUNT_ID) => (
            StatusCode::OK,
            json!({"d": {"ID": ACCOUNT_ID, "Name": "Acme"}}).to_string(),
        ),
        HttpMethod::GET => (StatusCode::NOT_FOUND, not_found_body()),
        HttpMethod::POST => {
            let entity: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            (StatusCode::CREATED, json!({ "d": entity }).to_string())
        }
        HttpMethod::PUT if path.contains(ACCOUNT_ID) => (StatusCode::NO_CONTENT, String::new()),
        HttpMethod::DELETE if path.contains(ACCOUNT_ID) => {
            (StatusCode::NO_CONTENT, String::new())
        }
        _ => (
            StatusCode::FORBIDDEN,
            json!({"error": {"code": "", "message": {"value": "Forbidden"}}}).to_string(),
        ),
    }
}

async fn spawn_api_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new().fallback(handle_any).with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn connector(server_url: &str) -> HttpApiConnector {
    HttpApiConnector::new(ClientSettings {
        base_url: server_url.to_string(),
        division: Some("499156".to_string()),
        access_token: Some("secret-token".to_string()),
        ..ClientSettings::default()
    })
    .expect("connector")
}

async fn last_request(state: &ServerState) -> RecordedRequest {
    state
        .requests
        .lock()
        .await
        .last()
        .cloned()
        .expect("recorded request")
}

#[test]
fn connector_exposes_configured_settings() {
    let connector = HttpApiConnector::new(ClientSettings {
        base_url: "https://start.exactonline.nl/".to_string(),
        division: Some("100".to_string()),
        ..ClientSettings::default()
    })
    .expect("connector");
    assert_eq!(connector.base_url(), "https://start.exactonline.nl/");

    let settings = connector.settings().clone();
    assert_eq!(settings.division.as_deref(), Some("100"));
}

#[test]
fn connector_rejects_invalid_settings() {
    let result = HttpApiConnector::new(ClientSettings {
        base_url: "not a url".to_string(),
        ..ClientSettings::default()
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn get_sends_bearer_token_and_parameters() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    let raw = connection.get("$top=1").await.expect("get");
    let body: Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(body["d"]["results"][0]["ID"], json!(ACCOUNT_ID));

    let request = last_request(&state).await;
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/v1/499156/crm/Accounts");
    assert_eq!(request.query.as_deref(), Some("$top=1"));
    assert_eq!(request.authorization.as_deref(), Some("Bearer secret-token"));
}

#[tokio::test]
async fn session_token_selects_the_division_path() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "777");
    connection.get("").await.expect("get");

    let request = last_request(&state).await;
    assert_eq!(request.path, "/api/v1/777/crm/Accounts");
    assert_eq!(request.query, None);
}

#[tokio::test]
async fn get_entity_uses_guid_key_literal() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    let raw = connection
        .get_entity("ID", ACCOUNT_ID, "")
        .await
        .expect("get entity");
    assert!(raw.contains("Acme"));
    let request = last_request(&state).await;
    assert_eq!(
        request.path,
        format!("/api/v1/499156/crm/Accounts(guid'{ACCOUNT_ID}')")
    );
}

#[tokio::test]
async fn get_entity_not_found_surfaces_remote_error() {
    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    let err = connection
        .get_entity("ID", "missing", "")
        .await
        .expect_err("not found");
    let exception = err.downcast_ref::<ApiException>().expect("api exception");
    assert!(exception.is_not_found());
    assert_eq!(exception.message, "Account not found");
}

#[tokio::test]
async fn post_sends_json_document() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    let raw = connection
        .post(r#"{"Name":"Acme"}"#)
        .await
        .expect("post");
    let body: Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(body["d"]["Name"], json!("Acme"));

    let request = last_request(&state).await;
    assert_eq!(request.method, "POST");
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert_eq!(request.body, r#"{"Name":"Acme"}"#);
}

#[tokio::test]
async fn writes_report_confirmation_and_rejection() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    assert!(connection
        .put("ID", ACCOUNT_ID, r#"{"Name":"Renamed"}"#)
        .await
        .expect("put"));
    assert_eq!(last_request(&state).await.method, "PUT");

    assert!(connection.delete("ID", ACCOUNT_ID).await.expect("delete"));
    assert!(!connection.delete("ID", "locked").await.expect("delete"));
    let request = last_request(&state).await;
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, "/api/v1/499156/crm/Accounts('locked')");
}

#[tokio::test]
async fn count_parses_plain_text_body() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let connection = connector(&server_url).connection("crm/Accounts", "");

    assert_eq!(connection.count("").await.expect("count"), 3);
    assert_eq!(
        last_request(&state).await.path,
        "/api/v1/499156/crm/Accounts/$count"
    );
}
