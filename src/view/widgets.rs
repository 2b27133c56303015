//! Summary widgets: profile header, stat tiles, rank card and project lists.

use chrono::{DateTime, Utc};

use super::ops::{DrawOp, Target};
use crate::markup::{fmt_num, Element};
use crate::model::{ProgressRecord, UserProfile, NOT_AVAILABLE};
use crate::stats::{format_xp, time_since, DerivedStats, TimeRange};

fn date(d: DateTime<Utc>) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn profile_ops(user: &UserProfile) -> Vec<DrawOp> {
    let joined = user.created_at.map(date).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let details = Element::new("ul").attr("class", "profile-details").children(
        [
            ("User ID", user.id.to_string()),
            ("Phone", user.phone()),
            ("Country", user.country()),
            ("City", user.city()),
            ("Joined", joined),
        ]
        .into_iter()
        .map(|(label, value)| {
            Element::new("li")
                .child(Element::new("span").attr("class", "label").text(label))
                .child(Element::new("span").attr("class", "value").text(value))
        }),
    );
    vec![
        DrawOp::SetText { target: Target::ProfileName, text: user.display_name() },
        DrawOp::SetText { target: Target::ProfileLogin, text: user.login.clone() },
        DrawOp::SetText { target: Target::ProfileEmail, text: user.email() },
        DrawOp::SetText { target: Target::ProfileInitial, text: user.initial() },
        DrawOp::ReplaceChildren { target: Target::ProfileDetails, node: details.into() },
    ]
}

pub fn xp_ops(stats: &DerivedStats) -> Vec<DrawOp> {
    vec![
        DrawOp::SetText { target: Target::Level, text: stats.level.to_string() },
        DrawOp::SetText { target: Target::TotalXp, text: format_xp(stats.total_xp) },
        DrawOp::ReplaceChildren { target: Target::RankCard, node: rank_card(stats).into() },
    ]
}

pub fn rank_card(stats: &DerivedStats) -> Element {
    let (next_name, progress_label) = match stats.next_rank {
        Some(next) => (
            next.name.to_string(),
            format!(
                "Level {} / {}",
                stats.level.saturating_sub(stats.current_rank.min_level),
                next.min_level - stats.current_rank.min_level
            ),
        ),
        None => ("Max Rank".to_string(), format!("Level {}", stats.level)),
    };
    Element::new("div")
        .attr("class", "rank-card")
        .child(Element::new("h3").attr("class", "current-rank").text(stats.current_rank.name))
        .child(Element::new("p").attr("class", "next-rank").text(format!("Next: {}", next_name)))
        .child(
            Element::new("div").attr("class", "progress-bar").child(
                Element::new("div")
                    .attr("class", "progress-fill")
                    .attr("style", format!("width: {}%", fmt_num(stats.progress_percent))),
            ),
        )
        .child(Element::new("p").attr("class", "progress-label").text(progress_label))
}

pub fn completed_list(records: &[&ProgressRecord]) -> Element {
    if records.is_empty() {
        return Element::new("p").attr("class", "empty").text("No completed projects yet");
    }
    Element::new("div").attr("class", "project-list").children(records.iter().map(|p| {
        Element::new("div")
            .attr("class", "project-card")
            .child(Element::new("h3").text(p.name()))
            .child(Element::new("p").text(format!("Completed: {}", date(p.created_at))))
    }))
}

pub fn pending_list(records: &[&ProgressRecord], now: DateTime<Utc>) -> Element {
    if records.is_empty() {
        return Element::new("p").attr("class", "empty").text("No pending projects");
    }
    Element::new("div").attr("class", "project-list").children(records.iter().map(|p| {
        Element::new("div")
            .attr("class", "pending-project")
            .child(Element::new("h4").text(p.name()))
            .child(
                Element::new("span")
                    .attr("class", "time-elapsed")
                    .text(format!("Started {} ago", time_since(p.created_at, now))),
            )
    }))
}

/// Oldest pending project, or else the most recent completed one.
pub fn current_project(pending: &[&ProgressRecord], completed: &[&ProgressRecord], now: DateTime<Utc>) -> Element {
    let card = Element::new("div").attr("class", "current-project");
    let pending_pick = pending.iter().min_by_key(|p| p.created_at);
    let completed_pick = completed.iter().max_by_key(|p| p.created_at);
    match (pending_pick, completed_pick) {
        (Some(p), _) => card
            .child(Element::new("h3").text("Current Project"))
            .child(Element::new("h4").text(p.name()))
            .child(Element::new("span").attr("class", "status").text("IN PROGRESS"))
            .child(Element::new("p").text(format!(
                "Started: {} ({} ago)",
                date(p.created_at),
                time_since(p.created_at, now)
            ))),
        (None, Some(p)) => card
            .child(Element::new("h3").text("Latest Project"))
            .child(Element::new("h4").text(p.name()))
            .child(Element::new("span").attr("class", "status").text("COMPLETED"))
            .child(Element::new("p").text(format!("Completed: {}", date(p.created_at)))),
        (None, None) => card
            .child(Element::new("h3").text("Current Project"))
            .child(Element::new("p").text("No active project")),
    }
}

pub fn range_selector(active: TimeRange) -> Element {
    Element::new("div").attr("class", "time-selector").children(TimeRange::CHOICES.iter().map(|r| {
        let period = match r {
            TimeRange::All => "all".to_string(),
            TimeRange::Months(n) => n.to_string(),
        };
        let class = if *r == active { "time-button active" } else { "time-button" };
        Element::new("button")
            .attr("class", class)
            .attr("data-period", period)
            .text(r.label())
    }))
}
