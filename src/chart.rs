// src/chart.rs
//
// Four-panel comparison dashboard rendered as SVG with maud.

use crate::domain::property::format_thousands;
use crate::services::compare::PropertyView;
use base64::Engine;
use maud::{html, Markup};
use thiserror::Error;

const COLORS: [&str; 2] = ["#3B82F6", "#EF4444"];
const NEUTRAL: &str = "#6B7280";
const LABELS: [&str; 2] = ["Property 1", "Property 2"];

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 820.0;
const PANEL_W: f64 = 460.0;
const PANEL_H: f64 = 330.0;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("nothing to plot")]
    NoData,
}

pub trait ChartRenderer: Send + Sync {
    /// Base64-encoded `image/svg+xml` document.
    fn render(&self, left: &PropertyView, right: &PropertyView) -> Result<String, ChartError>;
}

#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    pub current_year: i32,
}

impl SvgChartRenderer {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn render_svg(&self, left: &PropertyView, right: &PropertyView) -> Result<String, ChartError> {
        let prices = [chart_price(left), chart_price(right)];
        if prices.iter().all(|p| *p <= 0.0) {
            return Err(ChartError::NoData);
        }

        let features = [feature_values(left), feature_values(right)];
        let costs = [annual_costs(left), annual_costs(right)];
        let scores = [
            investment_score(left, self.current_year),
            investment_score(right, self.current_year),
        ];

        let (recommendation, rec_color) = if scores[0] > scores[1] {
            ("Property 1 Recommended", COLORS[0])
        } else if scores[1] > scores[0] {
            ("Property 2 Recommended", COLORS[1])
        } else {
            ("Both Properties Equal", NEUTRAL)
        };

        let doc = html! {
            svg xmlns="http://www.w3.org/2000/svg"
                width=(WIDTH) height=(HEIGHT)
                viewBox={ "0 0 " (WIDTH) " " (HEIGHT) }
                font-family="Helvetica, Arial, sans-serif" {
                rect width="100%" height="100%" fill="#FFFFFF" {}
                text x=(WIDTH / 2.0) y="32" text-anchor="middle" font-size="22" font-weight="bold" {
                    "Property Comparison Dashboard"
                }

                (panel(20.0, 50.0, "Market Value Comparison", bar_pair(&prices, |v| format!("${}", format_thousands(v as i64)))))
                (panel(520.0, 50.0, "Property Features Comparison", grouped_bars(&features)))
                (panel(20.0, 400.0, "Annual Costs", cost_bars(&costs)))
                (panel(520.0, 400.0, "Investment Score (0-10)", score_bars(&scores)))

                text x=(WIDTH / 2.0) y=(HEIGHT - 20.0) text-anchor="middle" font-size="18"
                    font-weight="bold" fill=(rec_color) {
                    (recommendation)
                }
            }
        };

        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push_str(&doc.into_string());
        Ok(out)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, left: &PropertyView, right: &PropertyView) -> Result<String, ChartError> {
        let svg = self.render_svg(left, right)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(svg))
    }
}

/// Weighted 0-10 score: price per square foot (cheaper is better), age
/// (newer is better), school rating and amenity count.
pub fn investment_score(view: &PropertyView, current_year: i32) -> f64 {
    let rec = &view.record;
    let mut score: f64 = 0.0;

    if let Some(market) = rec.known_market_value() {
        if rec.square_footage > 0 {
            let ppsf = market as f64 / rec.square_footage as f64;
            score += (10.0 - ppsf / 100.0).max(0.0);
        }
    }
    if rec.year_built > 0 {
        let age = current_year.saturating_sub(rec.year_built) as f64;
        score += (10.0 - age / 5.0).max(0.0);
    }
    score += rec.school_rating as f64;
    score += rec.amenities.len().min(5) as f64;

    score.clamp(0.0, 10.0)
}

fn chart_price(view: &PropertyView) -> f64 {
    view.record
        .known_market_value()
        .unwrap_or(view.display_price) as f64
}

/// Bedrooms, bathrooms, year built and property tax, the last two scaled to 0-10.
fn feature_values(view: &PropertyView) -> [f64; 4] {
    let rec = &view.record;
    [
        rec.bedrooms as f64,
        rec.bathrooms as f64,
        (rec.year_built.saturating_sub(1950) as f64 / 7.5).min(10.0),
        (rec.property_tax.unwrap_or(0) as f64 / 2000.0).min(10.0),
    ]
}

/// Property tax and twelve months of HOA.
fn annual_costs(view: &PropertyView) -> [f64; 2] {
    [
        view.record.property_tax.unwrap_or(0) as f64,
        view.record.hoa_fee.unwrap_or(0).saturating_mul(12) as f64,
    ]
}

fn panel(x: f64, y: f64, title: &str, body: Markup) -> Markup {
    html! {
        g transform={ "translate(" (x) "," (y) ")" } {
            rect width=(PANEL_W) height=(PANEL_H) fill="#F9FAFB" stroke="#E5E7EB" {}
            text x=(PANEL_W / 2.0) y="24" text-anchor="middle" font-size="15" font-weight="bold" {
                (title)
            }
            line x1="40" y1=(PANEL_H - 40.0) x2=(PANEL_W - 20.0) y2=(PANEL_H - 40.0) stroke="#9CA3AF" {}
            (body)
        }
    }
}

/// Height in pixels for `value` on a 0..`max` axis.
fn scale(value: f64, max: f64) -> f64 {
    let plot_h = PANEL_H - 100.0;
    if max <= 0.0 {
        0.0
    } else {
        (value.max(0.0) / max * plot_h).min(plot_h)
    }
}

fn bar(x: f64, w: f64, h: f64, color: &str, label: &str) -> Markup {
    let base = PANEL_H - 40.0;
    html! {
        rect x=(x) y=(base - h) width=(w) height=(h) fill=(color) fill-opacity="0.8" {}
        text x=(x + w / 2.0) y=(base - h - 6.0) text-anchor="middle" font-size="11" { (label) }
    }
}

fn axis_label(x: f64, text: &str) -> Markup {
    html! {
        text x=(x) y=(PANEL_H - 22.0) text-anchor="middle" font-size="11" fill="#374151" { (text) }
    }
}

fn bar_pair(values: &[f64; 2], fmt: impl Fn(f64) -> String) -> Markup {
    let max = values.iter().cloned().fold(0.0, f64::max);
    html! {
        @for (i, v) in values.iter().enumerate() {
            @let x = 90.0 + i as f64 * 180.0;
            (bar(x, 120.0, scale(*v, max), COLORS[i], &fmt(*v)))
            (axis_label(x + 60.0, LABELS[i]))
        }
    }
}

fn grouped_bars(values: &[[f64; 4]; 2]) -> Markup {
    const NAMES: [&str; 4] = ["Bedrooms", "Bathrooms", "Year Built", "Property Tax"];
    let max = values
        .iter()
        .flat_map(|row| row.iter().cloned())
        .fold(0.0, f64::max);

    html! {
        @for (f, name) in NAMES.iter().enumerate() {
            @let group_x = 60.0 + f as f64 * 95.0;
            @for (p, row) in values.iter().enumerate() {
                (bar(group_x + p as f64 * 36.0, 32.0, scale(row[f], max), COLORS[p], &format!("{:.1}", row[f])))
            }
            (axis_label(group_x + 34.0, name))
        }
        (legend())
    }
}

fn cost_bars(costs: &[[f64; 2]; 2]) -> Markup {
    let max = costs
        .iter()
        .flat_map(|c| c.iter().cloned())
        .fold(0.0, f64::max);

    if max <= 0.0 {
        return html! {
            text x=(PANEL_W / 2.0) y=(PANEL_H / 2.0) text-anchor="middle" font-size="13" fill=(NEUTRAL) {
                "No cost data available"
            }
        };
    }

    html! {
        @for (c, name) in ["Property Tax", "HOA (Annual)"].iter().enumerate() {
            @let group_x = 90.0 + c as f64 * 180.0;
            @for (p, row) in costs.iter().enumerate() {
                (bar(group_x + p as f64 * 60.0, 52.0, scale(row[c], max), COLORS[p],
                    &format!("${}", format_thousands(row[c] as i64))))
            }
            (axis_label(group_x + 56.0, name))
        }
        (legend())
    }
}

fn score_bars(scores: &[f64; 2]) -> Markup {
    html! {
        @for (i, s) in scores.iter().enumerate() {
            @let x = 90.0 + i as f64 * 180.0;
            (bar(x, 120.0, scale(*s, 10.0), COLORS[i], &format!("{s:.1}")))
            (axis_label(x + 60.0, LABELS[i]))
        }
    }
}

fn legend() -> Markup {
    html! {
        @for (i, label) in LABELS.iter().enumerate() {
            @let y = 40.0 + i as f64 * 16.0;
            rect x=(PANEL_W - 110.0) y=(y) width="10" height="10" fill=(COLORS[i]) {}
            text x=(PANEL_W - 95.0) y=(y + 9.0) font-size="11" { (label) }
        }
    }
}
