//! XP, level, rank and audit aggregation. Pure functions over fetched records.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{AuditTotals, ProgressRecord, Transaction};
use crate::rank::{self, RankTier};

// =============================================================================
// XP totals
// =============================================================================

/// One transaction per `(path, object_id)`: the highest amount wins, ties go to
/// the earliest record. Output is ordered by creation time.
pub fn dedup_xp(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut best: BTreeMap<(&str, i64), &Transaction> = BTreeMap::new();
    for tx in transactions {
        let key = (tx.path.as_str(), tx.object_id);
        match best.get(&key) {
            Some(kept)
                if kept.amount > tx.amount
                    || (kept.amount == tx.amount && kept.created_at <= tx.created_at) => {}
            _ => {
                best.insert(key, tx);
            }
        }
    }
    let mut kept: Vec<Transaction> = best.into_values().cloned().collect();
    kept.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    kept
}

pub fn total_xp(transactions: &[Transaction]) -> i64 {
    dedup_xp(transactions).iter().map(|t| t.amount).sum()
}

/// Plain sum without deduplication, kept for diagnostics.
pub fn naive_total_xp(transactions: &[Transaction]) -> i64 {
    transactions.iter().map(|t| t.amount).sum()
}

/// `floor(log2(total / 1000 + 1))`; zero or negative totals are level 0.
pub fn level(total_xp: i64) -> u32 {
    if total_xp <= 0 {
        return 0;
    }
    (total_xp as f64 / 1000.0 + 1.0).log2().floor() as u32
}

// =============================================================================
// Audit
// =============================================================================

/// `up / down`, or `up` itself when nothing was received (unbounded).
pub fn audit_ratio(up: i64, down: i64) -> f64 {
    if down > 0 {
        up as f64 / down as f64
    } else {
        up as f64
    }
}

/// Share of done/received audits in percent; `None` when both are zero.
pub fn audit_percentages(totals: AuditTotals) -> Option<(f64, f64)> {
    let total = totals.up + totals.down;
    if total <= 0 {
        return None;
    }
    let up = totals.up as f64 / total as f64 * 100.0;
    Some((up, 100.0 - up))
}

// =============================================================================
// Formatting
// =============================================================================

fn round_hundredths(value: u64, unit: u64) -> u64 {
    ((value as u128 * 100 + unit as u128 / 2) / unit as u128) as u64
}

fn hundredths_str(h: u64) -> String {
    let (whole, frac) = (h / 100, h % 100);
    if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    }
}

/// `1_234_567 -> "1.23M"`, `1500 -> "1.5K"`, `999 -> "999"`. Rounds half up.
pub fn format_xp(xp: i64) -> String {
    let sign = if xp < 0 { "-" } else { "" };
    let abs = xp.unsigned_abs();
    if abs < 1_000 {
        return format!("{}{}", sign, abs);
    }
    let k = round_hundredths(abs, 1_000);
    if abs < 1_000_000 && k < 100_000 {
        return format!("{}{}K", sign, hundredths_str(k));
    }
    format!("{}{}M", sign, hundredths_str(round_hundredths(abs, 1_000_000)))
}

/// Inverse of `format_xp`, within its rounding.
pub fn parse_xp(s: &str) -> Option<f64> {
    let s = s.trim();
    let (num, mult) = match s.chars().last()? {
        'K' | 'k' => (&s[..s.len() - 1], 1_000.0),
        'M' | 'm' => (&s[..s.len() - 1], 1_000_000.0),
        _ => (s, 1.0),
    };
    num.trim().parse::<f64>().ok().map(|v| v * mult)
}

// =============================================================================
// Time series
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeRange {
    Months(u32),
    All,
}

impl TimeRange {
    pub const CHOICES: [TimeRange; 4] = [
        TimeRange::Months(1),
        TimeRange::Months(3),
        TimeRange::Months(6),
        TimeRange::All,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(TimeRange::All),
            other => other.parse::<u32>().ok().filter(|n| *n > 0).map(TimeRange::Months),
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::All => None,
            TimeRange::Months(n) => now.checked_sub_months(Months::new(*n)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TimeRange::All => "All Time".to_string(),
            TimeRange::Months(1) => "1 Month".to_string(),
            TimeRange::Months(n) => format!("{} Months", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: DateTime<Utc>,
    pub cumulative: i64,
    pub gain: i64,
    pub path: String,
}

/// Drops records at or before the range cutoff, deduplicates what is left,
/// then accumulates in time order.
pub fn cumulative_series(transactions: &[Transaction], range: TimeRange, now: DateTime<Utc>) -> Vec<SeriesPoint> {
    let cutoff = range.cutoff(now);
    let in_range: Vec<Transaction> = transactions
        .iter()
        .filter(|t| cutoff.map_or(true, |c| t.created_at > c))
        .cloned()
        .collect();
    let mut running = 0i64;
    dedup_xp(&in_range)
        .into_iter()
        .map(|t| {
            running += t.amount;
            SeriesPoint {
                date: t.created_at,
                cumulative: running,
                gain: t.amount,
                path: t.path,
            }
        })
        .collect()
}

// =============================================================================
// Projects
// =============================================================================

pub fn completed_projects(records: &[ProgressRecord]) -> Vec<&ProgressRecord> {
    records.iter().filter(|r| r.is_completed()).collect()
}

pub fn pending_projects(records: &[ProgressRecord]) -> Vec<&ProgressRecord> {
    records.iter().filter(|r| r.is_pending()).collect()
}

/// Coarse elapsed time: "42 seconds", "3 days", "5 months".
pub fn time_since(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - from).num_seconds().max(0);
    let (value, unit) = match seconds {
        s if s < 60 => (s, "second"),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 604_800 => (s / 86_400, "day"),
        s if s < 2_592_000 => (s / 604_800, "week"),
        s => (s / 2_592_000, "month"),
    };
    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

// =============================================================================
// Derived stats
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStats {
    pub total_xp: i64,
    pub level: u32,
    pub current_rank: &'static RankTier,
    pub next_rank: Option<&'static RankTier>,
    pub progress_percent: f64,
    pub audit_ratio: f64,
    pub completed_count: usize,
    pub pending_count: usize,
}

impl DerivedStats {
    pub fn compute(xp: &[Transaction], audit: AuditTotals, projects: &[ProgressRecord]) -> Self {
        let total_xp = total_xp(xp);
        let level = level(total_xp);
        Self {
            total_xp,
            level,
            current_rank: rank::rank_for(level),
            next_rank: rank::next_rank(level),
            progress_percent: rank::progress_percent(level),
            audit_ratio: audit_ratio(audit.up, audit.down),
            completed_count: completed_projects(projects).len(),
            pending_count: pending_projects(projects).len(),
        }
    }
}
