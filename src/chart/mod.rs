//! SVG chart rendering. Every entry point produces a `ReplaceChildren` op for
//! its target so a re-render never leaves old markup behind.

use serde::Serialize;

use crate::markup::Element;
use crate::model::{AuditTotals, Skill};
use crate::stats::{SeriesPoint, TimeRange};
use crate::view::ops::{DrawOp, Target};

pub mod audit;
pub mod skills;
pub mod xp;

pub use audit::render_audit_chart;
pub use skills::render_skills_chart;
pub use xp::render_xp_chart;

pub(crate) const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorScheme {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub grid: &'static str,
    pub text: &'static str,
    pub surface: &'static str,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: "#4fd1c5",
            secondary: "#805ad5",
            grid: "#edf2f7",
            text: "#718096",
            surface: "#ffffff",
        }
    }
}

impl ColorScheme {
    pub fn dark() -> Self {
        Self {
            primary: "#38b2ac",
            secondary: "#9f7aea",
            grid: "#2d3748",
            text: "#a0aec0",
            surface: "#1a202c",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeriesKind {
    Line,
    Donut,
    Radar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub range: TimeRange,
    pub colors: ColorScheme,
    /// Shade the area under the XP line.
    pub area_fill: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            range: TimeRange::Months(1),
            colors: ColorScheme::default(),
            area_fill: true,
        }
    }
}

/// Input for the single `render` entry point.
#[derive(Debug, Clone, Copy)]
pub enum ChartData<'a> {
    Series(&'a [SeriesPoint]),
    Audit(AuditTotals),
    Skills(&'a [Skill]),
}

impl ChartData<'_> {
    pub fn kind(&self) -> SeriesKind {
        match self {
            ChartData::Series(_) => SeriesKind::Line,
            ChartData::Audit(_) => SeriesKind::Donut,
            ChartData::Skills(_) => SeriesKind::Radar,
        }
    }
}

pub fn render(data: ChartData<'_>, target: Target, options: &ChartOptions) -> DrawOp {
    match data {
        ChartData::Series(series) => render_xp_chart(series, target, options),
        ChartData::Audit(totals) => render_audit_chart(totals.up, totals.down, target, options),
        ChartData::Skills(skills) => render_skills_chart(skills, target, options),
    }
}

/// Empty-state block shown instead of a chart.
pub fn placeholder(message: &str) -> Element {
    Element::new("div").attr("class", "chart-placeholder").text(message)
}

pub(crate) fn svg_root(width: u32, height: u32) -> Element {
    Element::new("svg")
        .attr("xmlns", SVG_NS)
        .attr("viewBox", format!("0 0 {} {}", width, height))
        .attr("preserveAspectRatio", "xMidYMid meet")
}

pub(crate) fn polar(cx: f64, cy: f64, r: f64, angle: f64) -> (f64, f64) {
    (cx + r * angle.cos(), cy + r * angle.sin())
}
