//! Structured JSONL logging for the dashboard pipeline.
//!
//! Every record carries a run id, a sequence number and an RFC3339 timestamp.
//! Records go to `LOG_DIR/<run_id>/events.jsonl` (trace/debug to
//! `trace.jsonl`) and are mirrored on stderr.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            _ => return None,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Auth,      // sign-in, token validation
    Fetch,     // GraphQL requests, per-section outcomes
    Aggregate, // derived stats
    Render,    // charts and widgets
    View,      // state transitions
    System,    // startup, output files
}

impl Domain {
    const ALL: [Domain; 6] = [Domain::Auth, Domain::Fetch, Domain::Aggregate, Domain::Render, Domain::View, Domain::System];

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Auth => "auth",
            Domain::Fetch => "fetch",
            Domain::Aggregate => "aggregate",
            Domain::Render => "render",
            Domain::View => "view",
            Domain::System => "system",
        }
    }
}

/// `LOG_DOMAINS=auth,fetch`; unset or `all` enables everything.
fn parse_domains(raw: Option<&str>) -> Vec<Domain> {
    match raw.map(str::trim) {
        None | Some("all") | Some("") => Domain::ALL.to_vec(),
        Some(list) => {
            let wanted: Vec<&str> = list.split(',').map(str::trim).collect();
            Domain::ALL.into_iter().filter(|d| wanted.contains(&d.name())).collect()
        }
    }
}

// ----------------------------------------------------------------------------
// Sinks
// ----------------------------------------------------------------------------

type Sink = Option<Mutex<BufWriter<File>>>;

struct RunContext {
    run_id: String,
    min_level: Level,
    domains: Vec<Domain>,
    events: Sink,
    trace: Sink,
}

static SEQ: AtomicU64 = AtomicU64::new(0);
static CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn open_sink(path: PathBuf) -> Sink {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map(|f| Mutex::new(BufWriter::new(f)))
        .map_err(|err| eprintln!("[log] cannot open {}: {}", path.display(), err))
        .ok()
}

/// Sinks for `dir`; `None` for both when the directory is `off` or unwritable.
fn open_sinks(dir: &str, run_id: &str) -> (Sink, Sink) {
    if dir == "off" {
        return (None, None);
    }
    let run_dir = PathBuf::from(dir).join(run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] cannot create {}: {}", run_dir.display(), err);
        return (None, None);
    }
    (open_sink(run_dir.join("events.jsonl")), open_sink(run_dir.join("trace.jsonl")))
}

fn context() -> &'static RunContext {
    CONTEXT.get_or_init(|| {
        let env = |k: &str| std::env::var(k).ok();
        let run_id = env("RUN_ID").unwrap_or_else(|| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let (events, trace) = open_sinks(env("LOG_DIR").as_deref().unwrap_or("out/runs"), &run_id);
        RunContext {
            min_level: env("LOG_LEVEL").as_deref().and_then(Level::parse).unwrap_or(Level::Info),
            domains: parse_domains(env("LOG_DOMAINS").as_deref()),
            run_id,
            events,
            trace,
        }
    })
}

const SECRET_KEYS: [&str; 5] = ["authorization", "Authorization", "token", "password", "credentials"];

fn redact(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in SECRET_KEYS {
        if let Some(v) = fields.get_mut(key) {
            *v = json!("[REDACTED]");
        }
    }
    fields
}

fn append(sink: &Sink, line: &str) {
    let Some(sink) = sink else { return };
    if let Ok(mut w) = sink.lock() {
        let _ = writeln!(w, "{}", line).and_then(|_| w.flush());
    }
}

// ----------------------------------------------------------------------------
// Entry points
// ----------------------------------------------------------------------------

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit one record. Filtered by `LOG_LEVEL` and `LOG_DOMAINS`.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = context();
    if level < ctx.min_level || !ctx.domains.contains(&domain) {
        return;
    }
    let line = format_record(&ctx.run_id, level, domain, event, fields);
    append(if level <= Level::Debug { &ctx.trace } else { &ctx.events }, &line);
    eprintln!("{}", line);
}

fn format_record(run_id: &str, level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let mut data = redact(fields);
    let msg = data.remove("msg").unwrap_or_else(|| json!(""));
    json!({
        "ts": ts_now(),
        "run_id": run_id,
        "seq": SEQ.fetch_add(1, Ordering::Relaxed),
        "lvl": level.label(),
        "domain": domain.name(),
        "event": event,
        "msg": msg,
        "data": data,
    })
    .to_string()
}

/// Short SHA-256 fingerprint so tokens can be correlated in logs without being written.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

pub fn log_section(section: &str, outcome: Result<usize, &str>) {
    match outcome {
        Ok(count) => log(
            Level::Info,
            Domain::Fetch,
            "section_loaded",
            obj(&[("section", v_str(section)), ("records", json!(count))]),
        ),
        Err(reason) => log(
            Level::Warn,
            Domain::Fetch,
            "section_failed",
            obj(&[("section", v_str(section)), ("msg", v_str(reason))]),
        ),
    }
}

pub fn log_transition(from: &str, to: &str) {
    log(
        Level::Info,
        Domain::View,
        "transition",
        obj(&[("from", v_str(from)), ("to", v_str(to))]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
