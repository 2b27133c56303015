use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::error::DashError;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::token::clean_raw_token;

pub mod queries;

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn new(query: &str) -> Self {
        Self { query: query.trim().to_string(), variables: json!({}) }
    }

    pub fn with_variables(query: &str, variables: Value) -> Self {
        Self { query: query.trim().to_string(), variables }
    }

    pub fn operation(&self) -> &str {
        queries::operation_name(&self.query).unwrap_or("anonymous")
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    #[serde(default)]
    message: String,
}

/// The two calls the dashboard makes against the platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Exchanges Basic credentials for a bearer token (already cleaned).
    async fn sign_in(&self, login: &str, password: &str) -> Result<String, DashError>;
    /// Runs one read query and returns its `data` object.
    async fn execute(&self, token: &str, request: &GraphQlRequest) -> Result<Value, DashError>;
}

fn status_error(status: StatusCode) -> DashError {
    let text = format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or(""));
    let text = text.trim_end().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DashError::Auth(text),
        _ => DashError::Network(text),
    }
}

/// Interprets a `{data, errors?}` body.
pub fn parse_graphql_body(body: &str) -> Result<Value, DashError> {
    let parsed: GraphQlResponse = serde_json::from_str(body)?;
    if let Some(first) = parsed.errors.as_ref().and_then(|e| e.first()) {
        let message = if first.message.is_empty() { "unknown GraphQL error".to_string() } else { first.message.clone() };
        return Err(DashError::GraphQl(message));
    }
    match parsed.data {
        Some(Value::Null) | None => Err(DashError::DataShape("response has no data".to_string())),
        Some(data) => Ok(data),
    }
}

pub struct HttpTransport {
    client: Client,
    graphql_url: Url,
    signin_url: Url,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            graphql_url: cfg.graphql_url()?,
            signin_url: cfg.signin_url()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn sign_in(&self, login: &str, password: &str) -> Result<String, DashError> {
        let credentials = STANDARD.encode(format!("{}:{}", login, password));
        let resp = self
            .client
            .post(self.signin_url.clone())
            .header("Authorization", format!("Basic {}", credentials))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            log(
                Level::Warn,
                Domain::Auth,
                "signin_rejected",
                obj(&[("status", json!(status.as_u16())), ("login", v_str(login))]),
            );
            return Err(match status_error(status) {
                DashError::Auth(text) => DashError::Auth(format!("Invalid credentials: {}", text)),
                other => other,
            });
        }
        let token = clean_raw_token(&resp.text().await?);
        if token.is_empty() {
            return Err(DashError::Auth("No authentication token received".to_string()));
        }
        Ok(token)
    }

    async fn execute(&self, token: &str, request: &GraphQlRequest) -> Result<Value, DashError> {
        log(
            Level::Debug,
            Domain::Fetch,
            "graphql_request",
            obj(&[("operation", v_str(request.operation())), ("variables", request.variables.clone())]),
        );
        let resp = self
            .client
            .post(self.graphql_url.clone())
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        let body = resp.text().await?;
        parse_graphql_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_message_wins() {
        let err = parse_graphql_body(r#"{"data":null,"errors":[{"message":"first"},{"message":"second"}]}"#).unwrap_err();
        assert_eq!(err, DashError::GraphQl("first".to_string()));
    }

    #[test]
    fn empty_error_list_is_not_an_error() {
        let data = parse_graphql_body(r#"{"data":{"user":[]},"errors":[]}"#).unwrap();
        assert_eq!(data, json!({"user": []}));
    }

    #[test]
    fn missing_data_or_garbage_is_data_shape() {
        assert!(matches!(parse_graphql_body(r#"{"data":null}"#), Err(DashError::DataShape(_))));
        assert!(matches!(parse_graphql_body("<html>"), Err(DashError::DataShape(_))));
    }

    #[test]
    fn status_mapping() {
        assert!(status_error(StatusCode::UNAUTHORIZED).is_auth());
        assert!(status_error(StatusCode::FORBIDDEN).is_auth());
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            DashError::Network("HTTP 500 Internal Server Error".to_string())
        );
    }

    #[test]
    fn request_names_its_operation() {
        let req = GraphQlRequest::with_variables(queries::XP_TRANSACTIONS, json!({"eventId": 75}));
        assert_eq!(req.operation(), "XpTransactions");
        assert!(req.query.starts_with("query"));
    }
}
