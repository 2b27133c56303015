use chrono::{DateTime, Utc};

use super::{placeholder, svg_root, ChartOptions};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::markup::{fmt_num, Element};
use crate::stats::{format_xp, SeriesPoint};
use crate::view::ops::{DrawOp, Target};
use serde_json::json;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const LEFT: f64 = 60.0;
const RIGHT: f64 = 750.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 350.0;
const GRID_DIVISIONS: u32 = 5;

/// Linear time/value scales over the plotted series.
#[derive(Debug, Clone, Copy)]
pub struct Scales {
    min_ts: i64,
    span_secs: i64,
    max_xp: i64,
}

impl Scales {
    pub fn fit(series: &[SeriesPoint]) -> Option<Self> {
        let min_ts = series.iter().map(|p| p.date.timestamp()).min()?;
        let max_ts = series.iter().map(|p| p.date.timestamp()).max()?;
        let max_xp = series.iter().map(|p| p.cumulative).max()?.max(0);
        Some(Self { min_ts, span_secs: max_ts - min_ts, max_xp })
    }

    /// A zero-width time span centres every point.
    pub fn x(&self, date: DateTime<Utc>) -> f64 {
        if self.span_secs <= 0 {
            return (LEFT + RIGHT) / 2.0;
        }
        let t = (date.timestamp() - self.min_ts) as f64 / self.span_secs as f64;
        LEFT + t * (RIGHT - LEFT)
    }

    /// A zero maximum puts every point on the baseline.
    pub fn y(&self, value: i64) -> f64 {
        if self.max_xp <= 0 {
            return BOTTOM;
        }
        let v = value.clamp(0, self.max_xp) as f64 / self.max_xp as f64;
        BOTTOM - v * (BOTTOM - TOP)
    }
}

fn tooltip(p: &SeriesPoint) -> String {
    format!(
        "Total XP: {}\nGain: {:+}\nDate: {}\nPath: {}",
        p.cumulative,
        p.gain,
        p.date.format("%Y-%m-%d"),
        if p.path.is_empty() { "-" } else { &p.path }
    )
}

fn grid(scales: &Scales, options: &ChartOptions) -> Element {
    let mut g = Element::new("g").attr("class", "grid");
    for i in 0..=GRID_DIVISIONS {
        let y = BOTTOM - i as f64 * (BOTTOM - TOP) / GRID_DIVISIONS as f64;
        let value = (i as f64 * scales.max_xp as f64 / GRID_DIVISIONS as f64).round() as i64;
        g = g
            .child(
                Element::new("path")
                    .attr("d", format!("M{},{} L{},{}", fmt_num(LEFT), fmt_num(y), fmt_num(RIGHT), fmt_num(y)))
                    .attr("stroke", options.colors.grid)
                    .attr("stroke-width", 1),
            )
            .child(
                Element::new("text")
                    .attr("class", "y-label")
                    .num("x", LEFT - 10.0)
                    .num("y", y)
                    .attr("text-anchor", "end")
                    .attr("dominant-baseline", "middle")
                    .attr("fill", options.colors.text)
                    .attr("font-size", 12)
                    .text(format_xp(value)),
            );
    }
    g
}

fn date_labels(series: &[SeriesPoint], scales: &Scales, options: &ChartOptions) -> Element {
    let mut g = Element::new("g").attr("class", "x-labels");
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return g;
    };
    let mut marks = vec![(first.date, "start")];
    if last.date.date_naive() != first.date.date_naive() {
        marks.push((last.date, "end"));
    }
    for (date, anchor) in marks {
        g = g.child(
            Element::new("text")
                .attr("class", "x-label")
                .num("x", scales.x(date))
                .num("y", BOTTOM + 20.0)
                .attr("text-anchor", if scales.span_secs <= 0 { "middle" } else { anchor })
                .attr("fill", options.colors.text)
                .attr("font-size", 12)
                .text(date.format("%Y-%m-%d").to_string()),
        );
    }
    g
}

fn point_group(p: &SeriesPoint, x: f64, y: f64, options: &ChartOptions) -> Element {
    let tip = tooltip(p);
    Element::new("g")
        .attr("class", "xp-point-group")
        .child(Element::new("title").text(tip.clone()))
        .child(
            Element::new("circle")
                .attr("class", "xp-hit")
                .num("cx", x)
                .num("cy", y)
                .attr("r", 10)
                .attr("fill", "transparent"),
        )
        .child(
            Element::new("circle")
                .attr("class", "xp-point")
                .num("cx", x)
                .num("cy", y)
                .attr("r", 4)
                .attr("fill", options.colors.primary)
                .attr("data-tooltip", tip),
        )
}

/// Cumulative XP line chart, or a placeholder when there is nothing to plot.
pub fn xp_chart(series: &[SeriesPoint], options: &ChartOptions) -> Element {
    let Some(scales) = Scales::fit(series) else {
        return placeholder(&format!("No XP earned in range: {}", options.range.label()));
    };
    let coords: Vec<(f64, f64)> = series.iter().map(|p| (scales.x(p.date), scales.y(p.cumulative))).collect();

    let mut svg = svg_root(WIDTH, HEIGHT)
        .attr("class", "xp-chart")
        .child(
            Element::new("defs").child(
                Element::new("linearGradient")
                    .attr("id", "xp-line-gradient")
                    .attr("x1", 0)
                    .attr("y1", 0)
                    .attr("x2", 0)
                    .attr("y2", 1)
                    .child(Element::new("stop").attr("offset", "0%").attr("stop-color", options.colors.primary))
                    .child(
                        Element::new("stop")
                            .attr("offset", "100%")
                            .attr("stop-color", options.colors.primary)
                            .attr("stop-opacity", 0),
                    ),
            ),
        )
        .child(
            Element::new("text")
                .attr("class", "chart-title")
                .num("x", LEFT)
                .num("y", TOP - 20.0)
                .attr("fill", options.colors.text)
                .attr("font-size", 14)
                .text(format!("XP progression ({})", options.range.label())),
        )
        .child(grid(&scales, options))
        .child(date_labels(series, &scales, options));

    if options.area_fill {
        let (x0, _) = coords[0];
        let (xn, _) = coords[coords.len() - 1];
        let mut d = format!("M{},{}", fmt_num(x0), fmt_num(BOTTOM));
        for (x, y) in &coords {
            d.push_str(&format!(" L{},{}", fmt_num(*x), fmt_num(*y)));
        }
        d.push_str(&format!(" L{},{} Z", fmt_num(xn), fmt_num(BOTTOM)));
        svg = svg.child(
            Element::new("path")
                .attr("class", "xp-area")
                .attr("d", d)
                .attr("fill", "url(#xp-line-gradient)")
                .attr("opacity", 0.3),
        );
    }

    if coords.len() > 1 {
        let d = coords
            .iter()
            .enumerate()
            .map(|(i, (x, y))| format!("{}{},{}", if i == 0 { "M" } else { "L" }, fmt_num(*x), fmt_num(*y)))
            .collect::<Vec<_>>()
            .join(" ");
        svg = svg.child(
            Element::new("path")
                .attr("class", "xp-line")
                .attr("d", d)
                .attr("stroke", options.colors.primary)
                .attr("stroke-width", 3)
                .attr("fill", "none"),
        );
    }

    let points = Element::new("g")
        .attr("class", "xp-points")
        .children(series.iter().zip(&coords).map(|(p, (x, y))| point_group(p, *x, *y, options)));
    svg.child(points)
}

pub fn render_xp_chart(series: &[SeriesPoint], target: Target, options: &ChartOptions) -> DrawOp {
    log(
        Level::Debug,
        Domain::Render,
        "xp_chart",
        obj(&[("points", json!(series.len())), ("range", v_str(&options.range.label()))]),
    );
    DrawOp::ReplaceChildren { target, node: xp_chart(series, options).into() }
}
