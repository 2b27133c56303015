use chrono::{DateTime, Utc};
use serde_json::json;

use super::ops::{DrawOp, Page, Target};
use super::widgets;
use crate::chart::{render, ChartData, ChartOptions};
use crate::client::Transport;
use crate::config::Config;
use crate::error::DashError;
use crate::fetcher::{DataFetcher, ProfileBundle};
use crate::logging::{log, log_transition, obj, v_num, v_str, Domain, Level};
use crate::model::{AuditTotals, ProgressRecord, Transaction};
use crate::stats::{cumulative_series, DerivedStats, TimeRange};
use crate::token::{is_structurally_valid, KeyValueStore, TokenStore};

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardPhase {
    Loading,
    Ready,
    /// Profile loaded; the named secondary sections did not.
    PartiallyFailed(Vec<&'static str>),
    /// The essential profile fetch failed for a reason other than auth.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Unauthenticated { error: Option<String> },
    Authenticating,
    Dashboard(DashboardPhase),
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Unauthenticated { .. } => "unauthenticated",
            ViewState::Authenticating => "authenticating",
            ViewState::Dashboard(DashboardPhase::Loading) => "dashboard.loading",
            ViewState::Dashboard(DashboardPhase::Ready) => "dashboard.ready",
            ViewState::Dashboard(DashboardPhase::PartiallyFailed(_)) => "dashboard.partially_failed",
            ViewState::Dashboard(DashboardPhase::Failed(_)) => "dashboard.failed",
        }
    }
}

const UNAVAILABLE: &str = "N/A";

fn section_error(target: Target, label: &str, err: &DashError) -> DrawOp {
    DrawOp::ShowError { target, message: format!("Could not load {}: {}", label, err) }
}

/// Drives login, loading, range changes and logout, emitting draw ops for
/// whichever surface adapter is attached.
pub struct ViewController<T: Transport, S: KeyValueStore> {
    transport: T,
    tokens: TokenStore<S>,
    event_id: i64,
    options: ChartOptions,
    state: ViewState,
    /// XP transactions of the current session, for range re-filtering.
    xp_cache: Option<Vec<Transaction>>,
    clock: fn() -> DateTime<Utc>,
}

impl<T: Transport, S: KeyValueStore> ViewController<T, S> {
    pub fn new(transport: T, tokens: TokenStore<S>, cfg: &Config) -> Self {
        Self {
            transport,
            tokens,
            event_id: cfg.event_id,
            options: ChartOptions {
                range: cfg.default_range,
                colors: cfg.colors(),
                area_fill: true,
            },
            state: ViewState::Unauthenticated { error: None },
            xp_cache: None,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn range(&self) -> TimeRange {
        self.options.range
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn tokens(&mut self) -> &mut TokenStore<S> {
        &mut self.tokens
    }

    fn transition(&mut self, next: ViewState) {
        log_transition(self.state.name(), next.name());
        self.state = next;
    }

    /// Resumes a stored session or shows the login page.
    pub async fn boot(&mut self) -> Vec<DrawOp> {
        if self.tokens.get().is_some() {
            return self.load_dashboard().await;
        }
        self.transition(ViewState::Unauthenticated { error: None });
        vec![DrawOp::ShowPage(Page::Login)]
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Vec<DrawOp> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return self.login_failed("Please enter both username and password".to_string(), Vec::new());
        }

        self.transition(ViewState::Authenticating);
        let mut ops = vec![DrawOp::SetBusy(true), DrawOp::Clear { target: Target::LoginError }];

        let token = match self.transport.sign_in(username, password).await {
            Ok(token) => token,
            Err(err) => {
                ops.push(DrawOp::SetBusy(false));
                return self.login_failed(format!("Login failed: {}", err), ops);
            }
        };
        if !is_structurally_valid(&token) {
            ops.push(DrawOp::SetBusy(false));
            return self.login_failed("Login failed: Invalid token format received".to_string(), ops);
        }
        if let Err(err) = self.tokens.set(&token) {
            ops.push(DrawOp::SetBusy(false));
            return self.login_failed(format!("Login failed: could not store token: {}", err), ops);
        }

        log(Level::Info, Domain::Auth, "login_ok", obj(&[("login", v_str(username))]));
        ops.push(DrawOp::SetBusy(false));
        ops.extend(self.load_dashboard().await);
        ops
    }

    fn login_failed(&mut self, message: String, mut ops: Vec<DrawOp>) -> Vec<DrawOp> {
        log(Level::Warn, Domain::Auth, "login_failed", obj(&[("msg", v_str(&message))]));
        self.transition(ViewState::Unauthenticated { error: Some(message.clone()) });
        ops.push(DrawOp::ShowPage(Page::Login));
        ops.push(DrawOp::ShowError { target: Target::LoginError, message });
        ops
    }

    pub fn logout(&mut self) -> Vec<DrawOp> {
        self.tokens.clear();
        self.xp_cache = None;
        self.transition(ViewState::Unauthenticated { error: None });
        reset_ops()
    }

    fn force_logout(&mut self, err: &DashError) -> Vec<DrawOp> {
        self.tokens.clear();
        self.xp_cache = None;
        let message = format!("Session ended: {}. Please log in again.", err);
        self.transition(ViewState::Unauthenticated { error: Some(message.clone()) });
        let mut ops = reset_ops();
        ops.push(DrawOp::ShowError { target: Target::LoginError, message });
        ops
    }

    /// Fetch, aggregate and render every dashboard section.
    pub async fn load_dashboard(&mut self) -> Vec<DrawOp> {
        self.transition(ViewState::Dashboard(DashboardPhase::Loading));
        let mut ops = vec![DrawOp::ShowPage(Page::Dashboard), DrawOp::Clear { target: Target::Banner }];

        let fetcher = DataFetcher::new(&self.transport, self.event_id);
        let result = fetcher.fetch_profile(&mut self.tokens).await;
        match result {
            Err(err) if err.is_auth() => self.force_logout(&err),
            Err(err) => {
                let message = format!("Failed to load profile data: {}", err);
                ops.push(DrawOp::ShowError { target: Target::Banner, message: message.clone() });
                self.transition(ViewState::Dashboard(DashboardPhase::Failed(message)));
                ops
            }
            Ok(bundle) => {
                ops.extend(self.render_bundle(&bundle));
                let failed = bundle.failed_sections();
                let phase = if failed.is_empty() {
                    DashboardPhase::Ready
                } else {
                    DashboardPhase::PartiallyFailed(failed)
                };
                self.transition(ViewState::Dashboard(phase));
                ops
            }
        }
    }

    fn render_bundle(&mut self, bundle: &ProfileBundle) -> Vec<DrawOp> {
        let now = (self.clock)();
        let mut ops = widgets::profile_ops(&bundle.user);

        let xp: &[Transaction] = bundle.xp.as_deref().unwrap_or(&[]);
        let audit = bundle.audit.as_ref().copied().unwrap_or_default();
        let completed: Vec<&ProgressRecord> = bundle.completed.as_ref().map(|v| v.iter().collect()).unwrap_or_default();
        let pending: Vec<&ProgressRecord> = bundle.pending.as_ref().map(|v| v.iter().collect()).unwrap_or_default();
        let projects: Vec<ProgressRecord> = completed.iter().chain(pending.iter()).map(|p| (*p).clone()).collect();
        let stats = DerivedStats::compute(xp, audit, &projects);
        log(
            Level::Info,
            Domain::Aggregate,
            "derived_stats",
            obj(&[
                ("total_xp", json!(stats.total_xp)),
                ("level", json!(stats.level)),
                ("rank", v_str(stats.current_rank.name)),
                ("audit_ratio", v_num(stats.audit_ratio)),
            ]),
        );

        match &bundle.xp {
            Ok(transactions) => {
                self.xp_cache = Some(transactions.clone());
                ops.extend(widgets::xp_ops(&stats));
                ops.extend(self.xp_chart_ops(now));
            }
            Err(err) => {
                self.xp_cache = None;
                ops.push(DrawOp::SetText { target: Target::Level, text: UNAVAILABLE.to_string() });
                ops.push(DrawOp::SetText { target: Target::TotalXp, text: UNAVAILABLE.to_string() });
                ops.push(section_error(Target::RankCard, "rank", err));
                ops.push(DrawOp::Clear { target: Target::XpRangeSelector });
                ops.push(section_error(Target::XpChart, "XP history", err));
            }
        }

        match &bundle.audit {
            Ok(totals) => ops.extend(self.audit_ops(*totals, stats.audit_ratio)),
            Err(err) => {
                ops.push(DrawOp::SetText { target: Target::AuditRatio, text: UNAVAILABLE.to_string() });
                ops.push(section_error(Target::AuditChart, "audits", err));
            }
        }

        match &bundle.skills {
            Ok(skills) => ops.push(render(ChartData::Skills(skills), Target::SkillsChart, &self.options)),
            Err(err) => ops.push(section_error(Target::SkillsChart, "skills", err)),
        }

        match &bundle.completed {
            Ok(_) => {
                ops.push(DrawOp::SetText { target: Target::ProjectsCount, text: stats.completed_count.to_string() });
                ops.push(DrawOp::ReplaceChildren {
                    target: Target::CompletedProjects,
                    node: widgets::completed_list(&completed).into(),
                });
            }
            Err(err) => {
                ops.push(DrawOp::SetText { target: Target::ProjectsCount, text: UNAVAILABLE.to_string() });
                ops.push(section_error(Target::CompletedProjects, "completed projects", err));
            }
        }

        match &bundle.pending {
            Ok(_) => ops.push(DrawOp::ReplaceChildren {
                target: Target::PendingProjects,
                node: widgets::pending_list(&pending, now).into(),
            }),
            Err(err) => ops.push(section_error(Target::PendingProjects, "pending projects", err)),
        }

        ops.push(DrawOp::ReplaceChildren {
            target: Target::CurrentProject,
            node: widgets::current_project(&pending, &completed, now).into(),
        });
        ops
    }

    fn audit_ops(&self, totals: AuditTotals, ratio: f64) -> Vec<DrawOp> {
        vec![
            DrawOp::SetText { target: Target::AuditRatio, text: format!("{:.1}", ratio) },
            render(ChartData::Audit(totals), Target::AuditChart, &self.options),
        ]
    }

    fn xp_chart_ops(&self, now: DateTime<Utc>) -> Vec<DrawOp> {
        let Some(transactions) = &self.xp_cache else {
            return Vec::new();
        };
        let series = cumulative_series(transactions, self.options.range, now);
        vec![
            DrawOp::ReplaceChildren {
                target: Target::XpRangeSelector,
                node: widgets::range_selector(self.options.range).into(),
            },
            render(ChartData::Series(&series), Target::XpChart, &self.options),
        ]
    }

    /// Re-renders the XP chart for a new range from the session cache; no
    /// network traffic. Ignored outside a loaded dashboard. Derived stats
    /// span all history, so the range only changes the series.
    pub fn select_range(&mut self, range: TimeRange) -> Vec<DrawOp> {
        if !matches!(self.state, ViewState::Dashboard(_)) {
            return Vec::new();
        }
        self.options.range = range;
        log(Level::Info, Domain::View, "range_selected", obj(&[("range", v_str(&range.label()))]));
        self.xp_chart_ops((self.clock)())
    }
}

/// Back to the login page with every dashboard slot emptied.
fn reset_ops() -> Vec<DrawOp> {
    let mut ops = vec![DrawOp::ShowPage(Page::Login), DrawOp::SetBusy(false)];
    ops.extend(Target::ALL.iter().map(|t| DrawOp::Clear { target: *t }));
    ops
}
