//! In-memory surface: applies draw ops and serialises the result as one
//! static HTML page. The CLI writes that page to disk.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::ops::{DrawOp, Page, Target};
use crate::markup::{escape, Element, Node};

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Text(String),
    Node(Node),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Document {
    page: Page,
    busy: bool,
    slots: BTreeMap<Target, Slot>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self { page: Page::Login, busy: false, slots: BTreeMap::new() }
    }

    pub fn apply(&mut self, op: DrawOp) {
        match op {
            DrawOp::ShowPage(page) => self.page = page,
            DrawOp::SetBusy(busy) => self.busy = busy,
            DrawOp::SetText { target, text } => {
                self.slots.insert(target, Slot::Text(text));
            }
            DrawOp::ReplaceChildren { target, node } => {
                self.slots.insert(target, Slot::Node(node));
            }
            DrawOp::ShowError { target, message } => {
                self.slots.insert(target, Slot::Error(message));
            }
            DrawOp::Clear { target } => {
                self.slots.remove(&target);
            }
        }
    }

    pub fn apply_all(&mut self, ops: impl IntoIterator<Item = DrawOp>) {
        for op in ops {
            self.apply(op);
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn slot(&self, target: Target) -> Option<&Slot> {
        self.slots.get(&target)
    }

    pub fn text(&self, target: Target) -> Option<&str> {
        match self.slots.get(&target)? {
            Slot::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn error(&self, target: Target) -> Option<&str> {
        match self.slots.get(&target)? {
            Slot::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn element(&self, target: Target) -> Option<&Element> {
        match self.slots.get(&target)? {
            Slot::Node(node) => node.as_element(),
            _ => None,
        }
    }

    /// Standalone SVG file contents for a chart slot: the first `svg` in it,
    /// wrappers included.
    pub fn svg(&self, target: Target) -> Option<String> {
        let root = self.element(target)?;
        root.find_all(&|e| e.name == "svg").first().map(|e| e.to_markup())
    }

    fn slot_markup(&self, target: Target) -> String {
        match self.slots.get(&target) {
            None => String::new(),
            Some(Slot::Text(t)) => escape(t),
            Some(Slot::Node(node)) => node.to_markup(),
            Some(Slot::Error(msg)) => format!("<div class=\"section-error\">{}</div>", escape(msg)),
        }
    }

    fn write_slot(&self, out: &mut String, tag: &str, class: &str, target: Target) {
        let _ = write!(
            out,
            "<{tag} id=\"{id}\" class=\"{class}\">{body}</{tag}>",
            tag = tag,
            id = target.id(),
            class = class,
            body = self.slot_markup(target)
        );
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<title>Student Profile</title>\n<style>");
        out.push_str(STYLE);
        out.push_str("</style>\n</head>\n<body>\n");
        match self.page {
            Page::Login => self.write_login(&mut out),
            Page::Dashboard => self.write_dashboard(&mut out),
        }
        out.push_str("\n</body>\n</html>\n");
        out
    }

    fn write_login(&self, out: &mut String) {
        out.push_str("<main class=\"login-page\"><h1>Sign in</h1>");
        out.push_str("<p class=\"hint\">Run <code>profiledash login &lt;username&gt;</code> to start a session.</p>");
        self.write_slot(out, "div", "error", Target::LoginError);
        out.push_str("</main>");
    }

    fn write_dashboard(&self, out: &mut String) {
        out.push_str("<main class=\"dashboard\">");
        self.write_slot(out, "div", "banner", Target::Banner);

        out.push_str("<header class=\"profile\">");
        self.write_slot(out, "div", "avatar", Target::ProfileInitial);
        out.push_str("<div class=\"identity\">");
        self.write_slot(out, "h1", "name", Target::ProfileName);
        self.write_slot(out, "p", "login", Target::ProfileLogin);
        self.write_slot(out, "p", "email", Target::ProfileEmail);
        out.push_str("</div>");
        self.write_slot(out, "div", "details", Target::ProfileDetails);
        out.push_str("</header>");

        out.push_str("<section class=\"stats\">");
        for (label, target) in [
            ("Level", Target::Level),
            ("Total XP", Target::TotalXp),
            ("Audit Ratio", Target::AuditRatio),
            ("Projects", Target::ProjectsCount),
        ] {
            let _ = write!(out, "<div class=\"stat\"><span class=\"label\">{}</span>", label);
            self.write_slot(out, "span", "value", target);
            out.push_str("</div>");
        }
        out.push_str("</section>");

        self.write_slot(out, "section", "rank", Target::RankCard);
        self.write_slot(out, "section", "current", Target::CurrentProject);

        out.push_str("<section class=\"chart xp\"><h2>XP Progress</h2>");
        self.write_slot(out, "div", "range", Target::XpRangeSelector);
        self.write_slot(out, "div", "chart-body", Target::XpChart);
        out.push_str("</section>");
        for (title, target) in [("Audits", Target::AuditChart), ("Skills", Target::SkillsChart)] {
            let _ = write!(out, "<section class=\"chart\"><h2>{}</h2>", title);
            self.write_slot(out, "div", "chart-body", target);
            out.push_str("</section>");
        }

        for (title, target) in [
            ("Completed Projects", Target::CompletedProjects),
            ("In Progress", Target::PendingProjects),
        ] {
            let _ = write!(out, "<section class=\"projects\"><h2>{}</h2>", title);
            self.write_slot(out, "div", "list", target);
            out.push_str("</section>");
        }
        out.push_str("</main>");
    }
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f7fafc;color:#2d3748}\
main{max-width:1100px;margin:0 auto;padding:24px}\
.profile{display:flex;gap:16px;align-items:center}\
.avatar{width:56px;height:56px;border-radius:50%;background:#4fd1c5;color:#fff;display:flex;align-items:center;justify-content:center;font-size:24px}\
.stats{display:grid;grid-template-columns:repeat(4,1fr);gap:12px;margin:16px 0}\
.stat{background:#fff;border-radius:8px;padding:12px}\
.stat .label{display:block;font-size:12px;color:#718096}\
.chart,.projects,.rank,.current{background:#fff;border-radius:8px;padding:16px;margin-bottom:16px}\
.progress-bar{background:#edf2f7;height:8px;border-radius:4px}\
.progress-fill{background:#805ad5;height:8px;border-radius:4px}\
.time-button.active{background:#4fd1c5;color:#fff}\
.section-error,.banner:not(:empty),.error:not(:empty){color:#c53030;background:#fff5f5;padding:8px;border-radius:4px}\
svg{width:100%;height:auto}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_children_drops_previous_content() {
        let mut doc = Document::new();
        doc.apply(DrawOp::ReplaceChildren {
            target: Target::XpChart,
            node: Element::new("svg").child(Element::new("circle")).into(),
        });
        doc.apply(DrawOp::ReplaceChildren {
            target: Target::XpChart,
            node: Element::new("svg").child(Element::new("rect")).into(),
        });
        let svg = doc.svg(Target::XpChart).unwrap();
        assert!(svg.contains("<rect/>"));
        assert!(!svg.contains("circle"));
    }

    #[test]
    fn svg_export_looks_inside_wrappers() {
        let mut doc = Document::new();
        doc.apply(DrawOp::ReplaceChildren {
            target: Target::AuditChart,
            node: Element::new("div")
                .attr("class", "audit-chart-wrapper")
                .child(Element::new("svg").child(Element::new("circle")))
                .child(Element::new("ul").text("Done"))
                .into(),
        });
        let svg = doc.svg(Target::AuditChart).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(!svg.contains("<ul"));

        doc.apply(DrawOp::ReplaceChildren {
            target: Target::SkillsChart,
            node: Element::new("div").attr("class", "chart-placeholder").text("No skills yet").into(),
        });
        assert_eq!(doc.svg(Target::SkillsChart), None);
    }

    #[test]
    fn errors_and_clears() {
        let mut doc = Document::new();
        doc.apply_all([
            DrawOp::ShowPage(Page::Dashboard),
            DrawOp::SetText { target: Target::Level, text: "12".to_string() },
            DrawOp::ShowError { target: Target::AuditChart, message: "Could not load audits: <boom>".to_string() },
        ]);
        assert_eq!(doc.text(Target::Level), Some("12"));
        assert_eq!(doc.error(Target::AuditChart), Some("Could not load audits: <boom>"));
        let html = doc.to_html();
        assert!(html.contains("id=\"level\" class=\"value\">12</span>"));
        assert!(html.contains("Could not load audits: &lt;boom&gt;"));

        doc.apply(DrawOp::Clear { target: Target::Level });
        assert_eq!(doc.slot(Target::Level), None);
    }

    #[test]
    fn login_page_shows_only_login_error() {
        let mut doc = Document::new();
        doc.apply_all([
            DrawOp::SetText { target: Target::Level, text: "3".to_string() },
            DrawOp::ShowPage(Page::Login),
            DrawOp::ShowError { target: Target::LoginError, message: "Please enter both username and password".to_string() },
        ]);
        let html = doc.to_html();
        assert!(html.contains("Please enter both username and password"));
        assert!(!html.contains("id=\"level\""));
        assert_eq!(doc.page(), Page::Login);
    }
}
