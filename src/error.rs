use thiserror::Error;

/// Failure kinds surfaced by the fetch/render pipeline.
///
/// Only `Auth` is fatal to the session; every other kind is caught at the
/// section that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    GraphQl(String),
    #[error("unexpected data shape: {0}")]
    DataShape(String),
}

impl DashError {
    pub fn is_auth(&self) -> bool {
        matches!(self, DashError::Auth(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DashError::Auth(_) => "auth",
            DashError::Network(_) => "network",
            DashError::GraphQl(_) => "graphql",
            DashError::DataShape(_) => "data_shape",
        }
    }
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        DashError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::DataShape(err.to_string())
    }
}
