//! Fetches and normalises every data set the dashboard shows.
//!
//! The user profile is essential and fetched first. The five secondary data
//! sets are issued together and settle independently, so one failing section
//! never hides the others.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{queries, GraphQlRequest, Transport};
use crate::error::DashError;
use crate::logging::{log, log_section, obj, token_fingerprint, v_str, Domain, Level};
use crate::model::{skills_from_transactions, AuditTotals, ProgressRecord, Skill, Transaction, UserProfile};
use crate::token::{KeyValueStore, TokenStore};

/// Outcome of one independently fetched section.
pub type Section<T> = Result<T, DashError>;

#[derive(Debug, Clone)]
pub struct ProfileBundle {
    pub user: UserProfile,
    pub xp: Section<Vec<Transaction>>,
    pub audit: Section<AuditTotals>,
    pub skills: Section<Vec<Skill>>,
    pub completed: Section<Vec<ProgressRecord>>,
    pub pending: Section<Vec<ProgressRecord>>,
}

impl ProfileBundle {
    /// Names of sections that did not load.
    pub fn failed_sections(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.xp.is_err() {
            failed.push("xp");
        }
        if self.audit.is_err() {
            failed.push("audit");
        }
        if self.skills.is_err() {
            failed.push("skills");
        }
        if self.completed.is_err() {
            failed.push("completed");
        }
        if self.pending.is_err() {
            failed.push("pending");
        }
        failed
    }

    fn first_auth_error(&self) -> Option<DashError> {
        [
            self.xp.as_ref().err(),
            self.audit.as_ref().err(),
            self.skills.as_ref().err(),
            self.completed.as_ref().err(),
            self.pending.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .find(|e| e.is_auth())
        .cloned()
    }
}

#[derive(Deserialize)]
struct UserRows {
    #[serde(default)]
    user: Vec<Value>,
}

#[derive(Deserialize)]
struct TransactionRows {
    #[serde(default)]
    transaction: Vec<Value>,
}

#[derive(Deserialize)]
struct ProgressRows {
    #[serde(default)]
    progress: Vec<Value>,
}

/// Decodes each row on its own; malformed rows are logged and skipped.
fn decode_rows<R: DeserializeOwned>(section: &str, rows: Vec<Value>) -> Vec<R> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Fetch,
                    "row_skipped",
                    obj(&[("section", v_str(section)), ("index", json!(index)), ("msg", v_str(&err.to_string()))]),
                );
                None
            }
        })
        .collect()
}

fn report<T>(section: &str, outcome: &Section<T>, count: impl Fn(&T) -> usize) {
    match outcome {
        Ok(value) => log_section(section, Ok(count(value))),
        Err(err) => log_section(section, Err(&err.to_string())),
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, DashError> {
    serde_json::from_value(data).map_err(|e| DashError::DataShape(e.to_string()))
}

pub struct DataFetcher<'a, T: Transport> {
    transport: &'a T,
    event_id: i64,
}

impl<'a, T: Transport> DataFetcher<'a, T> {
    pub fn new(transport: &'a T, event_id: i64) -> Self {
        Self { transport, event_id }
    }

    async fn run<R: DeserializeOwned>(&self, token: &str, request: GraphQlRequest) -> Result<R, DashError> {
        let data = self.transport.execute(token, &request).await?;
        decode(data)
    }

    fn scoped(&self, query: &str) -> GraphQlRequest {
        GraphQlRequest::with_variables(query, json!({ "eventId": self.event_id }))
    }

    pub async fn fetch_user(&self, token: &str) -> Result<UserProfile, DashError> {
        let rows: UserRows = self.run(token, GraphQlRequest::new(queries::USER_PROFILE)).await?;
        decode_rows::<UserProfile>("user", rows.user)
            .into_iter()
            .next()
            .ok_or_else(|| DashError::DataShape("user query returned no rows".to_string()))
    }

    pub async fn fetch_xp(&self, token: &str) -> Result<Vec<Transaction>, DashError> {
        let rows: TransactionRows = self.run(token, self.scoped(queries::XP_TRANSACTIONS)).await?;
        Ok(decode_rows("xp", rows.transaction))
    }

    pub async fn fetch_audit(&self, token: &str) -> Result<AuditTotals, DashError> {
        let rows: TransactionRows = self.run(token, GraphQlRequest::new(queries::AUDIT_TRANSACTIONS)).await?;
        Ok(AuditTotals::from_transactions(&decode_rows::<Transaction>("audit", rows.transaction)))
    }

    pub async fn fetch_skills(&self, token: &str) -> Result<Vec<Skill>, DashError> {
        let rows: TransactionRows = self.run(token, GraphQlRequest::new(queries::SKILL_TRANSACTIONS)).await?;
        Ok(skills_from_transactions(&decode_rows::<Transaction>("skills", rows.transaction)))
    }

    /// Server-side filtered, re-checked locally against the completion rule.
    pub async fn fetch_completed(&self, token: &str) -> Result<Vec<ProgressRecord>, DashError> {
        let rows: ProgressRows = self.run(token, self.scoped(queries::COMPLETED_PROJECTS)).await?;
        let records: Vec<ProgressRecord> = decode_rows("completed", rows.progress);
        Ok(records.into_iter().filter(|p| p.is_completed()).collect())
    }

    pub async fn fetch_pending(&self, token: &str) -> Result<Vec<ProgressRecord>, DashError> {
        let rows: ProgressRows = self.run(token, self.scoped(queries::PENDING_PROJECTS)).await?;
        let records: Vec<ProgressRecord> = decode_rows("pending", rows.progress);
        Ok(records.into_iter().filter(|p| p.is_pending()).collect())
    }

    /// Loads the whole dashboard. Fails with `Auth` when no usable token is
    /// stored or any request is rejected as unauthorised; the token is cleared
    /// in both cases.
    pub async fn fetch_profile<S: KeyValueStore>(&self, tokens: &mut TokenStore<S>) -> Result<ProfileBundle, DashError> {
        let Some(token) = tokens.get() else {
            return Err(DashError::Auth("No valid authentication token".to_string()));
        };
        log(
            Level::Info,
            Domain::Fetch,
            "fetch_profile",
            obj(&[("fingerprint", v_str(&token_fingerprint(&token))), ("event_id", json!(self.event_id))]),
        );

        let user = match self.fetch_user(&token).await {
            Ok(user) => user,
            Err(err) => {
                log_section("user", Err(&err.to_string()));
                if err.is_auth() {
                    tokens.clear();
                }
                return Err(err);
            }
        };
        log_section("user", Ok(1));

        let (xp, audit, skills, completed, pending) = futures_util::join!(
            self.fetch_xp(&token),
            self.fetch_audit(&token),
            self.fetch_skills(&token),
            self.fetch_completed(&token),
            self.fetch_pending(&token),
        );

        report("xp", &xp, Vec::len);
        report("audit", &audit, |_| 1);
        report("skills", &skills, Vec::len);
        report("completed", &completed, Vec::len);
        report("pending", &pending, Vec::len);

        let bundle = ProfileBundle { user, xp, audit, skills, completed, pending };
        if let Some(err) = bundle.first_auth_error() {
            tokens.clear();
            return Err(err);
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(Value);

    #[async_trait]
    impl Transport for Canned {
        async fn sign_in(&self, _login: &str, _password: &str) -> Result<String, DashError> {
            Err(DashError::Auth("not used".to_string()))
        }

        async fn execute(&self, _token: &str, _request: &GraphQlRequest) -> Result<Value, DashError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn malformed_row_is_skipped_not_fatal() {
        let transport = Canned(json!({"transaction": [
            {"id": 1, "type": "xp", "amount": 5000, "createdAt": "2024-01-10T10:00:00Z", "path": "/a", "objectId": 1},
            {"id": 2, "type": "xp", "amount": null, "createdAt": "2024-01-11T10:00:00Z", "path": "/b", "objectId": 2}
        ]}));
        let fetcher = DataFetcher::new(&transport, 75);
        let xp = fetcher.fetch_xp("tok").await.unwrap();
        assert_eq!(xp.len(), 1);
        assert_eq!(xp[0].amount, 5000);
    }

    #[tokio::test]
    async fn missing_row_list_is_empty() {
        let transport = Canned(json!({}));
        let fetcher = DataFetcher::new(&transport, 75);
        assert!(fetcher.fetch_pending("tok").await.unwrap().is_empty());
        assert!(matches!(fetcher.fetch_user("tok").await, Err(DashError::DataShape(_))));
    }
}
