use std::f64::consts::{FRAC_PI_2, PI};

use super::{placeholder, polar, svg_root, ChartOptions};
use crate::logging::{log, obj, Domain, Level};
use crate::markup::{fmt_num, Element};
use crate::stats::{audit_ratio, format_xp};
use crate::view::ops::{DrawOp, Target};
use serde_json::json;

const SIZE: u32 = 200;
const CENTER: f64 = 100.0;
const OUTER: f64 = 90.0;
const INNER: f64 = 55.0;

/// `(start, end)` angles in radians for the up and down segments, starting at
/// twelve o'clock. `None` for a zero total.
pub fn segment_angles(up: i64, down: i64) -> Option<[(f64, f64); 2]> {
    let (up, down) = (up.max(0) as f64, down.max(0) as f64);
    let total = up + down;
    if total <= 0.0 {
        return None;
    }
    let start = -FRAC_PI_2;
    let split = start + up / total * 2.0 * PI;
    Some([(start, split), (split, start + 2.0 * PI)])
}

fn annular_sector(start: f64, end: f64) -> String {
    let large = if end - start > PI { 1 } else { 0 };
    let (x0, y0) = polar(CENTER, CENTER, OUTER, start);
    let (x1, y1) = polar(CENTER, CENTER, OUTER, end);
    let (x2, y2) = polar(CENTER, CENTER, INNER, end);
    let (x3, y3) = polar(CENTER, CENTER, INNER, start);
    format!(
        "M {} {} A {o} {o} 0 {l} 1 {} {} L {} {} A {i} {i} 0 {l} 0 {} {} Z",
        fmt_num(x0),
        fmt_num(y0),
        fmt_num(x1),
        fmt_num(y1),
        fmt_num(x2),
        fmt_num(y2),
        fmt_num(x3),
        fmt_num(y3),
        o = fmt_num(OUTER),
        i = fmt_num(INNER),
        l = large,
    )
}

fn segment(class: &str, start: f64, end: f64, color: &str, title: String) -> Element {
    // An SVG arc whose endpoints coincide draws nothing, so a full turn is a ring.
    let shape = if end - start >= 2.0 * PI - 1e-9 {
        Element::new("circle")
            .num("cx", CENTER)
            .num("cy", CENTER)
            .num("r", (OUTER + INNER) / 2.0)
            .attr("fill", "none")
            .attr("stroke", color)
            .num("stroke-width", OUTER - INNER)
    } else {
        Element::new("path").attr("d", annular_sector(start, end)).attr("fill", color)
    };
    Element::new("g")
        .attr("class", format!("audit-segment {}", class))
        .child(Element::new("title").text(title))
        .child(shape)
}

fn legend_item(color: &str, label: &str, amount: i64, pct: f64) -> Element {
    Element::new("li")
        .child(
            Element::new("span")
                .attr("class", "swatch")
                .attr("style", format!("background:{}", color)),
        )
        .text(format!("{}: {} ({}%)", label, format_xp(amount), fmt_num(pct)))
}

/// Done/received donut with ratio label and legend.
pub fn audit_chart(up: i64, down: i64, options: &ChartOptions) -> Element {
    let Some([(up_start, up_end), (down_start, down_end)]) = segment_angles(up, down) else {
        return placeholder("No audit data yet");
    };
    let total = (up.max(0) + down.max(0)) as f64;
    let up_pct = up.max(0) as f64 / total * 100.0;
    let down_pct = 100.0 - up_pct;

    let mut svg = svg_root(SIZE, SIZE).attr("class", "audit-chart");
    if up_end > up_start {
        svg = svg.child(segment(
            "up",
            up_start,
            up_end,
            options.colors.primary,
            format!("Done: {} ({}%)", up, fmt_num(up_pct)),
        ));
    }
    if down_end > down_start {
        svg = svg.child(segment(
            "down",
            down_start,
            down_end,
            options.colors.secondary,
            format!("Received: {} ({}%)", down, fmt_num(down_pct)),
        ));
    }
    svg = svg
        .child(
            Element::new("text")
                .attr("class", "audit-ratio")
                .num("x", CENTER)
                .num("y", CENTER)
                .attr("text-anchor", "middle")
                .attr("dominant-baseline", "middle")
                .attr("font-size", 28)
                .attr("fill", options.colors.text)
                .text(format!("{:.1}", audit_ratio(up, down))),
        )
        .child(
            Element::new("text")
                .num("x", CENTER)
                .num("y", CENTER + 22.0)
                .attr("text-anchor", "middle")
                .attr("font-size", 11)
                .attr("fill", options.colors.text)
                .text("ratio"),
        );

    Element::new("div")
        .attr("class", "audit-chart-wrapper")
        .child(svg)
        .child(
            Element::new("ul")
                .attr("class", "legend")
                .child(legend_item(options.colors.primary, "Done", up, up_pct))
                .child(legend_item(options.colors.secondary, "Received", down, down_pct)),
        )
}

pub fn render_audit_chart(up: i64, down: i64, target: Target, options: &ChartOptions) -> DrawOp {
    log(
        Level::Debug,
        Domain::Render,
        "audit_chart",
        obj(&[("up", json!(up)), ("down", json!(down))]),
    );
    DrawOp::ReplaceChildren { target, node: audit_chart(up, down, options).into() }
}
