//! Bearer token persistence and validation.

use anyhow::{Context, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::logging::{log, obj, token_fingerprint, v_str, Domain, Level};

/// Minimal key-value persistence, the analogue of browser local storage.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten whole on every mutation.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Map<String, Value> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, Value::Object(entries.clone()).to_string())
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.load().get(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load();
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Accepts padded or unpadded input and non-canonical trailing bits.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let padding = (4 - segment.len() % 4) % 4;
    let mut padded = String::with_capacity(segment.len() + padding);
    padded.push_str(segment);
    padded.extend(std::iter::repeat('=').take(padding));
    SEGMENT_ENGINE.decode(padded).ok()
}

/// Exactly three dot-separated segments, each valid base64url.
pub fn is_structurally_valid(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| decode_segment(p).is_some())
}

/// Subset of the JWT payload the dashboard cares about.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<Value>,
    #[serde(default)]
    pub exp: Option<Value>,
}

impl Claims {
    /// `exp` as whole seconds; fractional or string numbers are accepted.
    pub fn exp_secs(&self) -> Option<i64> {
        match self.exp.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

pub fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let bytes = decode_segment(payload)?;
    serde_json::from_slice(&bytes).ok()
}

/// Expired when `exp` is absent, unparseable or strictly before `now_secs`.
pub fn is_expired_at(token: &str, now_secs: i64) -> bool {
    match decode_claims(token).and_then(|c| c.exp_secs()) {
        Some(exp) => exp < now_secs,
        None => true,
    }
}

/// Strip surrounding quotes and whitespace from a raw sign-in response body.
pub fn clean_raw_token(raw: &str) -> String {
    raw.chars().filter(|c| *c != '"' && *c != '\'').collect::<String>().trim().to_string()
}

pub struct TokenStore<S: KeyValueStore> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> TokenStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    pub fn set(&mut self, token: &str) -> Result<()> {
        self.backend.write(&self.key, token)?;
        log(
            Level::Info,
            Domain::Auth,
            "token_stored",
            obj(&[("fingerprint", v_str(&token_fingerprint(token)))]),
        );
        Ok(())
    }

    /// Returns the token only if it is well formed and unexpired; otherwise the
    /// stored entry is removed.
    pub fn get(&mut self) -> Option<String> {
        self.get_at(chrono::Utc::now().timestamp())
    }

    pub fn get_at(&mut self, now_secs: i64) -> Option<String> {
        let token = self.backend.read(&self.key)?;
        let reason = if !is_structurally_valid(&token) {
            "malformed"
        } else if is_expired_at(&token, now_secs) {
            "expired"
        } else {
            return Some(token);
        };
        log(
            Level::Warn,
            Domain::Auth,
            "token_rejected",
            obj(&[("reason", v_str(reason)), ("fingerprint", v_str(&token_fingerprint(&token)))]),
        );
        self.clear();
        None
    }

    pub fn clear(&mut self) {
        if let Err(err) = self.backend.remove(&self.key) {
            log(
                Level::Error,
                Domain::Auth,
                "token_clear_failed",
                obj(&[("msg", v_str(&err.to_string()))]),
            );
        }
    }

    /// True when nothing is stored or the stored token has no future `exp`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        match self.backend.read(&self.key) {
            Some(token) => is_expired_at(&token, now_secs),
            None => true,
        }
    }

    pub fn claims(&mut self) -> Option<Claims> {
        self.get().and_then(|t| decode_claims(&t))
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }
}
