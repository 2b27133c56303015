use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use profiledash::client::{queries, GraphQlRequest, HttpTransport, Transport};
use profiledash::config::Config;
use profiledash::error::DashError;

async fn transport(server: &MockServer) -> HttpTransport {
    let cfg = Config::with_api_base(&format!("{}/api", server.uri()));
    HttpTransport::new(&cfg).unwrap()
}

#[tokio::test]
async fn sign_in_sends_basic_auth_and_cleans_token() {
    let server = MockServer::start().await;
    // base64("amy:secret")
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .and(header("authorization", "Basic YW15OnNlY3JldA=="))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"aaa.bbb.ccc\"\n"))
        .mount(&server)
        .await;

    let token = transport(&server).await.sign_in("amy", "secret").await.unwrap();
    assert_eq!(token, "aaa.bbb.ccc");
}

#[tokio::test]
async fn sign_in_rejection_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport(&server).await.sign_in("amy", "bad").await.unwrap_err();
    assert_eq!(err, DashError::Auth("Invalid credentials: HTTP 401 Unauthorized".to_string()));
}

#[tokio::test]
async fn sign_in_with_empty_body_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \"\" "))
        .mount(&server)
        .await;

    let err = transport(&server).await.sign_in("amy", "secret").await.unwrap_err();
    assert_eq!(err, DashError::Auth("No authentication token received".to_string()));
}

#[tokio::test]
async fn execute_posts_query_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql-engine/v1/graphql"))
        .and(header("authorization", "Bearer tok"))
        .and(body_partial_json(json!({"variables": {"eventId": 75}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transaction": []}})))
        .expect(1)
        .mount(&server)
        .await;

    let req = GraphQlRequest::with_variables(queries::XP_TRANSACTIONS, json!({"eventId": 75}));
    let data = transport(&server).await.execute("tok", &req).await.unwrap();
    assert_eq!(data, json!({"transaction": []}));
}

#[tokio::test]
async fn execute_maps_status_and_graphql_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql-engine/v1/graphql"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/graphql-engine/v1/graphql"))
        .and(header("authorization", "Bearer broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/graphql-engine/v1/graphql"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errors": [{"message": "field 'email' not found in type: 'user'"}]})),
        )
        .mount(&server)
        .await;

    let http = transport(&server).await;
    let req = GraphQlRequest::new(queries::USER_PROFILE);

    let err = http.execute("expired", &req).await.unwrap_err();
    assert!(err.is_auth());

    let err = http.execute("broken", &req).await.unwrap_err();
    assert_eq!(err, DashError::Network("HTTP 500 Internal Server Error".to_string()));

    let err = http.execute("tok", &req).await.unwrap_err();
    assert_eq!(err.to_string(), "field 'email' not found in type: 'user'");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let cfg = Config::with_api_base("http://127.0.0.1:1/api");
    let http = HttpTransport::new(&cfg).unwrap();
    let err = http.execute("tok", &GraphQlRequest::new(queries::USER_PROFILE)).await.unwrap_err();
    assert_eq!(err.kind(), "network");
}
