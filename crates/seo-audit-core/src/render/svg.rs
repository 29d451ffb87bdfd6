//! Lays a [`ReportView`] out as one tall SVG page, the visual form that gets rasterised
//! for document export.

use std::f64::consts::PI;
use std::fmt::{self, Write};

use super::ReportView;
use crate::radar::{radar_svg, RadarChart};
use crate::report::Priority;

/// Page width in CSS pixels, matching A4 at 96 dpi.
pub const CANVAS_WIDTH: f64 = 794.0;
const MARGIN: f64 = 24.0;
const PADDING: f64 = 24.0;
const CARD_GAP: f64 = 24.0;
const FONT: &str = "Inter, Segoe UI, Helvetica, Arial, sans-serif";
const BACKGROUND: &str = "#f8fafc";
const INK: &str = "#1e293b";
const MUTED: &str = "#475569";
const ACCENT: &str = "#0369a1";

/// Rendered report page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCanvas {
    pub width: f64,
    pub height: f64,
    pub svg: String,
}

/// Lay out the whole report; the height grows with the content.
pub fn layout_report(view: &ReportView) -> Result<ReportCanvas, fmt::Error> {
    let mut page = Page::new();

    let card = page.begin_card();
    page.line(PADDING, 24.0, "700", INK, "SEO Report Summary")?;
    page.paragraph(
        PADDING,
        15.0,
        MUTED,
        "An overview of the website's SEO performance across key categories.",
    )?;
    page.gap(8.0);
    page.grade_ring(view)?;
    page.embed_radar(view)?;
    page.end_card(card);

    let card = page.begin_card();
    page.line(PADDING, 20.0, "700", INK, "Priority Actions")?;
    page.gap(4.0);
    for rec in &view.recommendations {
        page.badge_line(&rec.category, &rec.badge, priority_color(rec.priority))?;
        page.paragraph(PADDING + 8.0, 14.0, INK, &rec.text)?;
        page.gap(6.0);
    }
    page.end_card(card);

    for panel in &view.categories {
        let card = page.begin_card();
        page.line(PADDING, 20.0, "700", INK, panel.title)?;
        for factor in &panel.factors {
            page.gap(6.0);
            page.score_line(&factor.label, &factor.score_label, factor.status.hex())?;
            page.line(PADDING, 13.0, "600", MUTED, "Analysis")?;
            page.paragraph(PADDING, 13.0, MUTED, &factor.analysis)?;
            page.line(PADDING, 13.0, "600", ACCENT, "Recommendation")?;
            page.paragraph(PADDING, 13.0, INK, &factor.recommendation)?;
        }
        page.end_card(card);
    }

    page.finish()
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "#991b1b",
        Priority::Medium => "#92400e",
        Priority::Low => "#065f46",
    }
}

struct CardMark {
    top: f64,
    offset: usize,
}

struct Page {
    body: String,
    y: f64,
}

impl Page {
    fn new() -> Self {
        Self {
            body: String::new(),
            y: MARGIN,
        }
    }

    fn inner_width() -> f64 {
        CANVAS_WIDTH - 2.0 * MARGIN - 2.0 * PADDING
    }

    fn gap(&mut self, height: f64) {
        self.y += height;
    }

    fn begin_card(&mut self) -> CardMark {
        let mark = CardMark {
            top: self.y,
            offset: self.body.len(),
        };
        self.y += PADDING;
        mark
    }

    /// Card backgrounds are inserted behind content once the card height is known.
    fn end_card(&mut self, mark: CardMark) {
        self.y += PADDING;
        let rect = format!(
            "<rect x=\"{MARGIN:.0}\" y=\"{top:.1}\" width=\"{width:.0}\" height=\"{height:.1}\" rx=\"12\" fill=\"#ffffff\" stroke=\"#e2e8f0\"/>\n",
            top = mark.top,
            width = CANVAS_WIDTH - 2.0 * MARGIN,
            height = self.y - mark.top
        );
        self.body.insert_str(mark.offset, &rect);
        self.y += CARD_GAP;
    }

    fn line(
        &mut self,
        x: f64,
        size: f64,
        weight: &str,
        color: &str,
        text: &str,
    ) -> fmt::Result {
        self.y += size * 1.4;
        writeln!(
            self.body,
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-family=\"{FONT}\" font-size=\"{size}\" font-weight=\"{weight}\" fill=\"{color}\">{text}</text>",
            x = MARGIN + x,
            y = self.y,
            text = escape_xml(text)
        )
    }

    fn paragraph(&mut self, x: f64, size: f64, color: &str, text: &str) -> fmt::Result {
        let width = Self::inner_width() - (x - PADDING);
        let max_chars = (width / (size * 0.52)).floor().max(1.0) as usize;
        for line in wrap_text(text, max_chars) {
            self.line(x, size, "400", color, &line)?;
        }
        Ok(())
    }

    fn score_line(&mut self, label: &str, score: &str, color: &str) -> fmt::Result {
        self.line(PADDING, 15.0, "600", INK, label)?;
        writeln!(
            self.body,
            "<text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"end\" font-family=\"{FONT}\" font-size=\"14\" font-weight=\"700\" fill=\"{color}\">{score}</text>",
            x = CANVAS_WIDTH - MARGIN - PADDING,
            y = self.y,
            score = escape_xml(score)
        )
    }

    fn badge_line(&mut self, category: &str, badge: &str, color: &str) -> fmt::Result {
        self.line(PADDING + 8.0, 13.0, "700", MUTED, category)?;
        writeln!(
            self.body,
            "<text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"end\" font-family=\"{FONT}\" font-size=\"12\" font-weight=\"700\" fill=\"{color}\">{badge}</text>",
            x = CANVAS_WIDTH - MARGIN - PADDING,
            y = self.y,
            badge = escape_xml(badge)
        )
    }

    /// Circular score gauge; does not advance `y`, the radar beside it does.
    fn grade_ring(&mut self, view: &ReportView) -> fmt::Result {
        let radius = 80.0;
        let cx = MARGIN + PADDING + 40.0 + radius;
        let cy = self.y + RadarChart::SIZE / 2.0;
        let circumference = 2.0 * PI * radius;
        let offset = circumference * (1.0 - f64::from(view.badge.score) / 100.0);
        let color = view.badge.color;
        writeln!(
            self.body,
            "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{radius:.0}\" fill=\"none\" stroke=\"#e2e8f0\" stroke-width=\"12\"/>"
        )?;
        writeln!(
            self.body,
            "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{radius:.0}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"12\" stroke-linecap=\"round\" stroke-dasharray=\"{circumference:.2}\" stroke-dashoffset=\"{offset:.2}\" transform=\"rotate(-90 {cx:.1} {cy:.1})\"/>"
        )?;
        writeln!(
            self.body,
            "<text x=\"{cx:.1}\" y=\"{y:.1}\" text-anchor=\"middle\" font-family=\"{FONT}\" font-size=\"56\" font-weight=\"700\" fill=\"{color}\">{grade}</text>",
            y = cy + 10.0,
            grade = escape_xml(view.badge.grade.as_str())
        )?;
        writeln!(
            self.body,
            "<text x=\"{cx:.1}\" y=\"{y:.1}\" text-anchor=\"middle\" font-family=\"{FONT}\" font-size=\"18\" font-weight=\"500\" fill=\"{color}\">{score}</text>",
            y = cy + 40.0,
            score = escape_xml(&view.badge.score_label)
        )
    }

    fn embed_radar(&mut self, view: &ReportView) -> fmt::Result {
        let x = CANVAS_WIDTH - MARGIN - PADDING - RadarChart::SIZE;
        let radar = radar_svg(&view.radar, RadarChart::SIZE)?;
        writeln!(
            self.body,
            "<g transform=\"translate({x:.1} {y:.1})\">\n{radar}</g>",
            y = self.y
        )?;
        self.y += RadarChart::SIZE;
        Ok(())
    }

    fn finish(self) -> Result<ReportCanvas, fmt::Error> {
        let height = (self.y - CARD_GAP + MARGIN).ceil();
        let mut svg = String::with_capacity(self.body.len() + 256);
        writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{CANVAS_WIDTH:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {CANVAS_WIDTH:.0} {height:.0}\">"
        )?;
        writeln!(
            svg,
            "<rect width=\"{CANVAS_WIDTH:.0}\" height=\"{height:.0}\" fill=\"{BACKGROUND}\"/>"
        )?;
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        Ok(ReportCanvas {
            width: CANVAS_WIDTH,
            height,
            svg,
        })
    }
}

/// Greedy word wrap on a character budget. Overlong words get a line of their own.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
