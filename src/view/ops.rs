use serde::Serialize;

use crate::markup::Node;

/// Named slots of the dashboard surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    LoginError,
    Banner,
    ProfileName,
    ProfileLogin,
    ProfileEmail,
    ProfileInitial,
    ProfileDetails,
    Level,
    TotalXp,
    AuditRatio,
    ProjectsCount,
    RankCard,
    XpRangeSelector,
    XpChart,
    AuditChart,
    SkillsChart,
    CompletedProjects,
    PendingProjects,
    CurrentProject,
}

impl Target {
    pub const ALL: [Target; 19] = [
        Target::LoginError,
        Target::Banner,
        Target::ProfileName,
        Target::ProfileLogin,
        Target::ProfileEmail,
        Target::ProfileInitial,
        Target::ProfileDetails,
        Target::Level,
        Target::TotalXp,
        Target::AuditRatio,
        Target::ProjectsCount,
        Target::RankCard,
        Target::XpRangeSelector,
        Target::XpChart,
        Target::AuditChart,
        Target::SkillsChart,
        Target::CompletedProjects,
        Target::PendingProjects,
        Target::CurrentProject,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Target::LoginError => "login-error",
            Target::Banner => "banner",
            Target::ProfileName => "profile-name",
            Target::ProfileLogin => "profile-login",
            Target::ProfileEmail => "profile-email",
            Target::ProfileInitial => "profile-initial",
            Target::ProfileDetails => "profile-details",
            Target::Level => "level",
            Target::TotalXp => "total-xp",
            Target::AuditRatio => "audit-ratio",
            Target::ProjectsCount => "projects-count",
            Target::RankCard => "rank-card",
            Target::XpRangeSelector => "xp-range",
            Target::XpChart => "xp-chart",
            Target::AuditChart => "audit-chart",
            Target::SkillsChart => "skills-chart",
            Target::CompletedProjects => "completed-projects",
            Target::PendingProjects => "pending-projects",
            Target::CurrentProject => "current-project",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    Login,
    Dashboard,
}

/// Declarative update applied by a surface adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    ShowPage(Page),
    SetText { target: Target, text: String },
    /// Drops whatever the target held before attaching `node`.
    ReplaceChildren { target: Target, node: Node },
    /// Inline error placeholder for one section.
    ShowError { target: Target, message: String },
    Clear { target: Target },
    /// Visual busy state of the login button.
    SetBusy(bool),
}

impl DrawOp {
    pub fn target(&self) -> Option<Target> {
        match self {
            DrawOp::SetText { target, .. }
            | DrawOp::ReplaceChildren { target, .. }
            | DrawOp::ShowError { target, .. }
            | DrawOp::Clear { target } => Some(*target),
            DrawOp::ShowPage(_) | DrawOp::SetBusy(_) => None,
        }
    }
}
