use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use profiledash::client::HttpTransport;
use profiledash::config::Config;
use profiledash::logging::{log, obj, token_fingerprint, v_str, Domain, Level};
use profiledash::stats::TimeRange;
use profiledash::token::{FileStore, TokenStore};
use profiledash::view::{Document, DrawOp, Target, ViewController, ViewState};

const USAGE: &str = "Usage: profiledash <login <username> | logout | status | render [--range=1|3|6|all]>";

fn read_password() -> Result<String> {
    if let Ok(pw) = std::env::var("PROFILE_PASSWORD") {
        return Ok(pw);
    }
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn parse_range(args: &[String], default: TimeRange) -> Result<TimeRange> {
    for arg in args {
        if let Some(value) = arg.strip_prefix("--range=") {
            return TimeRange::parse(value).with_context(|| format!("unknown range {:?}", value));
        }
    }
    Ok(default)
}

/// Writes the page plus one standalone SVG per rendered chart.
fn write_output(out_dir: &Path, doc: &Document) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let index = out_dir.join("index.html");
    fs::write(&index, doc.to_html())?;
    let mut files = vec![index.display().to_string()];
    for target in [Target::XpChart, Target::AuditChart, Target::SkillsChart] {
        if let Some(svg) = doc.svg(target) {
            let path = out_dir.join(format!("{}.svg", target.id()));
            fs::write(&path, svg)?;
            files.push(path.display().to_string());
        }
    }
    for file in &files {
        println!("wrote {}", file);
    }
    Ok(())
}

fn report_errors(ops: &[DrawOp]) {
    for op in ops {
        if let DrawOp::ShowError { target, message } = op {
            eprintln!("[{}] {}", target.id(), message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let cfg = Config::from_env();
    let tokens = TokenStore::new(FileStore::new(&cfg.storage_path), cfg.token_key.clone());
    let transport = HttpTransport::new(&cfg)?;
    let mut controller = ViewController::new(transport, tokens, &cfg);
    let mut doc = Document::new();

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("command", v_str(command)), ("api_base", v_str(&cfg.api_base))]),
    );

    match command.as_str() {
        "login" => {
            let Some(username) = args.get(1) else {
                bail!("{}", USAGE);
            };
            let password = read_password()?;
            let ops = controller.login(username, &password).await;
            report_errors(&ops);
            doc.apply_all(ops);
            if !matches!(controller.state(), ViewState::Dashboard(_)) {
                bail!("login failed");
            }
            write_output(Path::new(&cfg.out_dir), &doc)?;
        }
        "logout" => {
            doc.apply_all(controller.logout());
            println!("logged out");
        }
        "status" => match controller.tokens().get() {
            Some(token) => {
                let claims = controller.tokens().claims();
                let expires = claims
                    .and_then(|c| c.exp_secs())
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("session active (token {}, expires {})", token_fingerprint(&token), expires);
            }
            None => println!("not logged in"),
        },
        "render" => {
            let range = parse_range(&args[1..], cfg.default_range)?;
            let mut ops = controller.boot().await;
            if matches!(controller.state(), ViewState::Dashboard(_)) && range != controller.range() {
                ops.extend(controller.select_range(range));
            }
            report_errors(&ops);
            doc.apply_all(ops);
            write_output(Path::new(&cfg.out_dir), &doc)?;
            if let ViewState::Unauthenticated { .. } = controller.state() {
                bail!("not logged in; run `profiledash login <username>` first");
            }
        }
        other => {
            eprintln!("unknown command {:?}\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
    Ok(())
}
