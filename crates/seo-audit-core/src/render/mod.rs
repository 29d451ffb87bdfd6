use std::fmt::Write;

use serde::Serialize;

use crate::grade::{grade, FactorStatus, Grade, Tier};
use crate::label::factor_label;
use crate::radar::{category_averages, RadarAxis, VisualError};
use crate::report::{CategoryKind, Priority, SeoReportData};

pub mod svg;

pub use svg::{layout_report, ReportCanvas};

/// Format styles supported when printing a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Display-ready projection of a validated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub badge: GradeBadge,
    pub radar: Vec<RadarAxis>,
    pub recommendations: Vec<RecommendationEntry>,
    pub categories: Vec<CategoryPanel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeBadge {
    pub grade: Grade,
    pub tier: Tier,
    pub score: u8,
    /// `"{score}/100"`.
    pub score_label: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationEntry {
    pub priority: Priority,
    /// `"High Priority"` and friends.
    pub badge: String,
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPanel {
    pub category: CategoryKind,
    pub title: &'static str,
    pub factors: Vec<FactorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactorEntry {
    pub key: &'static str,
    pub label: String,
    pub score: u8,
    pub score_label: String,
    pub status: FactorStatus,
    pub analysis: String,
    pub recommendation: String,
}

/// Project a report into its display tree. Recommendation order is preserved as given.
pub fn render_view(report: &SeoReportData) -> Result<ReportView, VisualError> {
    let info = grade(report.overall_score);
    let badge = GradeBadge {
        grade: info.grade,
        tier: info.tier,
        score: report.overall_score,
        score_label: format!("{}/100", report.overall_score),
        color: info.tier.hex(),
    };

    let recommendations = report
        .recommendations
        .iter()
        .map(|rec| RecommendationEntry {
            priority: rec.priority,
            badge: format!("{} Priority", rec.priority.as_str()),
            category: rec.category.clone(),
            text: rec.text.clone(),
        })
        .collect();

    let categories = report
        .categories()
        .into_iter()
        .map(|(category, factors)| CategoryPanel {
            category,
            title: category.title(),
            factors: factors
                .into_iter()
                .map(|(key, factor)| FactorEntry {
                    key,
                    label: factor_label(key),
                    score: factor.score,
                    score_label: format!("{}/100", factor.score),
                    status: FactorStatus::from_score(factor.score),
                    analysis: factor.analysis.clone(),
                    recommendation: factor.recommendation.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(ReportView {
        badge,
        radar: category_averages(report)?,
        recommendations,
        categories,
    })
}

/// Produce a report string from a `ReportView` using the desired format.
pub fn render_report(view: &ReportView, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(view),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
    }
}

fn render_human(view: &ReportView) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "SEO Report Summary")?;
    writeln!(
        out,
        "Overall Grade: {} ({})",
        view.badge.grade.as_str(),
        view.badge.score_label
    )?;
    writeln!(out)?;

    writeln!(out, "Category Averages:")?;
    for axis in &view.radar {
        writeln!(
            out,
            "  - {label:<12} {avg:>5.1}",
            label = axis.label,
            avg = axis.average
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Priority Actions:")?;
    for (idx, rec) in view.recommendations.iter().enumerate() {
        writeln!(
            out,
            "  {rank}. [{badge}] {category}: {text}",
            rank = idx + 1,
            badge = rec.badge,
            category = rec.category,
            text = single_line(&rec.text)
        )?;
    }

    for panel in &view.categories {
        writeln!(out)?;
        writeln!(out, "{}", panel.title)?;
        for factor in &panel.factors {
            writeln!(
                out,
                "  - {label}: {score} [{status}]",
                label = factor.label,
                score = factor.score_label,
                status = factor.status.as_str()
            )?;
            writeln!(out, "    Analysis: {}", single_line(&factor.analysis))?;
            writeln!(
                out,
                "    Recommendation: {}",
                single_line(&factor.recommendation)
            )?;
        }
    }

    Ok(out)
}

fn single_line(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}
