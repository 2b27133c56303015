use std::f64::consts::PI;

use super::{placeholder, polar, svg_root, ChartOptions};
use crate::markup::{fmt_num, Element};
use crate::model::Skill;
use crate::view::ops::{DrawOp, Target};

const SIZE: u32 = 500;
const CENTER: f64 = 250.0;
const RING_STEP: f64 = 40.0;
const RINGS: u32 = 5;
const AXIS: f64 = 200.0;
const LABEL: f64 = 220.0;

fn angle(i: usize, n: usize) -> f64 {
    -PI / 2.0 + i as f64 * 2.0 * PI / n as f64
}

/// Radius for a skill amount on the 0..=100 scale.
pub fn radius(amount: i64) -> f64 {
    amount.clamp(0, 100) as f64 / 100.0 * AXIS
}

pub fn skills_chart(skills: &[Skill], options: &ChartOptions) -> Element {
    if skills.is_empty() {
        return placeholder("No skill data available");
    }
    let n = skills.len();

    let rings = Element::new("g").attr("class", "radar-grid").children((1..=RINGS).map(|i| {
        Element::new("circle")
            .num("cx", CENTER)
            .num("cy", CENTER)
            .num("r", i as f64 * RING_STEP)
            .attr("fill", "none")
            .attr("stroke", options.colors.grid)
            .attr("stroke-width", 1)
    }));

    let mut axes = Element::new("g").attr("class", "radar-axes");
    for (i, skill) in skills.iter().enumerate() {
        let a = angle(i, n);
        let (x, y) = polar(CENTER, CENTER, AXIS, a);
        let (lx, ly) = polar(CENTER, CENTER, LABEL, a);
        axes = axes
            .child(
                Element::new("line")
                    .num("x1", CENTER)
                    .num("y1", CENTER)
                    .num("x2", x)
                    .num("y2", y)
                    .attr("stroke", options.colors.grid)
                    .attr("stroke-width", 1),
            )
            .child(
                Element::new("text")
                    .attr("class", "radar-label")
                    .num("x", lx)
                    .num("y", ly)
                    .attr("text-anchor", "middle")
                    .attr("dominant-baseline", "middle")
                    .attr("fill", options.colors.text)
                    .attr("font-size", 12)
                    .text(skill.name.clone()),
            );
    }

    let points = skills
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let (x, y) = polar(CENTER, CENTER, radius(s.amount), angle(i, n));
            format!("{},{}", fmt_num(x), fmt_num(y))
        })
        .collect::<Vec<_>>()
        .join(" ");

    let dots = Element::new("g").attr("class", "radar-points").children(skills.iter().enumerate().map(|(i, s)| {
        let (x, y) = polar(CENTER, CENTER, radius(s.amount), angle(i, n));
        Element::new("circle")
            .attr("class", "radar-point")
            .num("cx", x)
            .num("cy", y)
            .attr("r", 3)
            .attr("fill", options.colors.primary)
            .child(Element::new("title").text(format!("{}: {}%", s.name, s.amount)))
    }));

    svg_root(SIZE, SIZE)
        .attr("class", "skills-chart")
        .child(rings)
        .child(axes)
        .child(
            Element::new("polygon")
                .attr("class", "radar-shape")
                .attr("points", points)
                .attr("fill", options.colors.primary)
                .attr("fill-opacity", 0.4)
                .attr("stroke", options.colors.primary)
                .attr("stroke-width", 2),
        )
        .child(dots)
}

pub fn render_skills_chart(skills: &[Skill], target: Target, options: &ChartOptions) -> DrawOp {
    DrawOp::ReplaceChildren { target, node: skills_chart(skills, options).into() }
}
