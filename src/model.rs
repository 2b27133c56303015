use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DashError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type", default = "default_tx_type")]
    pub kind: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub object_id: i64,
}

fn default_tx_type() -> String {
    "xp".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub object_id: i64,
    pub grade: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_done: bool,
    pub object: Option<ObjectRef>,
}

impl ProgressRecord {
    fn is_project(&self) -> bool {
        self.object.as_ref().map(|o| o.kind == "project").unwrap_or(false)
    }

    pub fn is_completed(&self) -> bool {
        self.is_project() && self.grade.map(|g| g > 0.0).unwrap_or(false)
    }

    pub fn is_pending(&self) -> bool {
        self.is_project() && self.grade.is_none()
    }

    pub fn name(&self) -> &str {
        match &self.object {
            Some(o) if !o.name.is_empty() => &o.name,
            _ => "Unknown Project",
        }
    }
}

pub const NOT_AVAILABLE: &str = "Not available";

const PHONE_KEYS: &[&str] = &["phone", "phoneNumber", "tel", "mobile", "telephone"];
const COUNTRY_KEYS: &[&str] = &["country", "addressCountry", "nationality", "countryOfBirth"];
const CITY_KEYS: &[&str] = &["city", "addressCity"];
const FIRST_NAME_KEYS: &[&str] = &["firstName", "firstname", "first_name"];
const LAST_NAME_KEYS: &[&str] = &["lastName", "lastname", "last_name"];
const EMAIL_KEYS: &[&str] = &["email", "emailAddress"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Raw attrs as delivered; see `attrs()`.
    #[serde(default)]
    pub attrs: Value,
}

impl UserProfile {
    /// Normalised attrs. A malformed JSON string degrades to an empty map.
    pub fn attrs(&self) -> Map<String, Value> {
        normalize_attrs(&self.attrs).unwrap_or_default()
    }

    pub fn attr(&self, synonyms: &[&str]) -> String {
        lookup_attr(&self.attrs(), synonyms)
    }

    pub fn phone(&self) -> String {
        self.attr(PHONE_KEYS)
    }

    pub fn country(&self) -> String {
        self.attr(COUNTRY_KEYS)
    }

    pub fn city(&self) -> String {
        self.attr(CITY_KEYS)
    }

    pub fn email(&self) -> String {
        match &self.email {
            Some(e) if !e.trim().is_empty() => e.clone(),
            _ => self.attr(EMAIL_KEYS),
        }
    }

    /// "First Last" from attrs, falling back to the login.
    pub fn display_name(&self) -> String {
        let attrs = self.attrs();
        let parts: Vec<String> = [FIRST_NAME_KEYS, LAST_NAME_KEYS]
            .iter()
            .map(|keys| lookup_attr(&attrs, keys))
            .filter(|v| v != NOT_AVAILABLE)
            .collect();
        if parts.is_empty() {
            self.login.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn initial(&self) -> String {
        self.login
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "U".to_string())
    }
}

pub fn normalize_attrs(raw: &Value) -> Result<Map<String, Value>, DashError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Map::new()),
        Value::String(s) => match serde_json::from_str::<Value>(s)? {
            Value::Object(map) => Ok(map),
            other => Err(DashError::DataShape(format!("attrs decoded to {}", type_name(&other)))),
        },
        other => Err(DashError::DataShape(format!("attrs is {}", type_name(other)))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// First non-empty synonym wins.
pub fn lookup_attr(attrs: &Map<String, Value>, synonyms: &[&str]) -> String {
    for key in synonyms {
        match attrs.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    NOT_AVAILABLE.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditTotals {
    pub up: i64,
    pub down: i64,
}

impl AuditTotals {
    pub fn from_transactions(txs: &[Transaction]) -> Self {
        txs.iter().fold(Self::default(), |mut acc, t| {
            match t.kind.as_str() {
                "up" => acc.up += t.amount,
                "down" => acc.down += t.amount,
                _ => {}
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skill {
    pub name: String,
    pub amount: i64,
}

/// Highest amount per `skill_*` type, ordered by descending amount then name.
pub fn skills_from_transactions(txs: &[Transaction]) -> Vec<Skill> {
    let mut best: std::collections::BTreeMap<String, i64> = std::collections::BTreeMap::new();
    for t in txs {
        let Some(name) = t.kind.strip_prefix("skill_") else { continue };
        let entry = best.entry(name.replace('-', " ")).or_insert(t.amount);
        if t.amount > *entry {
            *entry = t.amount;
        }
    }
    let mut skills: Vec<Skill> = best.into_iter().map(|(name, amount)| Skill { name, amount }).collect();
    skills.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    skills
}
