use std::fmt::Write;

use crate::label::factor_label;
use crate::report::SeoReportData;

const FACTOR_HEADER: [&str; 5] = ["Category", "Factor", "Score", "Analysis", "Recommendation"];
const RECOMMENDATION_HEADER: [&str; 3] = ["Category", "Priority", "Recommendation"];

/// One flattened factor as it appears in the tabular export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorRow {
    pub category: &'static str,
    pub factor: String,
    pub score: u8,
    pub analysis: String,
    pub recommendation: String,
}

impl FactorRow {
    pub fn fields(&self) -> [String; 5] {
        [
            self.category.to_string(),
            self.factor.clone(),
            self.score.to_string(),
            self.analysis.clone(),
            self.recommendation.clone(),
        ]
    }
}

/// Every factor of every group, groups and keys in display order.
pub fn flatten_factors(report: &SeoReportData) -> Vec<FactorRow> {
    report
        .categories()
        .into_iter()
        .flat_map(|(category, factors)| {
            factors.into_iter().map(move |(key, factor)| FactorRow {
                category: category.title(),
                factor: factor_label(key),
                score: factor.score,
                analysis: factor.analysis.clone(),
                recommendation: factor.recommendation.clone(),
            })
        })
        .collect()
}

/// Serialise the report as CSV: a summary block, the factor table, then the
/// recommendation table in input order.
pub fn to_csv(report: &SeoReportData) -> Result<String, std::fmt::Error> {
    let mut csv = String::new();
    let overall = report.overall_score.to_string();
    writeln!(csv, "SEO Report")?;
    write_row(&mut csv, ["Overall Score", overall.as_str()])?;
    writeln!(csv)?;

    write_row(&mut csv, FACTOR_HEADER)?;
    for row in flatten_factors(report) {
        write_row(&mut csv, row.fields().iter().map(String::as_str))?;
    }

    writeln!(csv)?;
    writeln!(csv, "Top Recommendations")?;
    write_row(&mut csv, RECOMMENDATION_HEADER)?;
    for rec in &report.recommendations {
        write_row(
            &mut csv,
            [rec.category.as_str(), rec.priority.as_str(), rec.text.as_str()],
        )?;
    }
    Ok(csv)
}

fn write_row<'a>(
    out: &mut String,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<(), std::fmt::Error> {
    let line = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{line}")
}

/// Quote a field when it holds a delimiter, quote or line break; embedded quotes are doubled.
pub fn escape_field(value: &str) -> String {
    let needs_quotes = value.contains([',', '"', '\n', '\r']);
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_report;
    use proptest::prelude::*;

    fn parse_records(input: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes())
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn escapes_quotes_and_delimiters() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn flattens_all_nineteen_factors_in_order() {
        let rows = flatten_factors(&sample_report());
        assert_eq!(rows.len(), 19);
        assert_eq!(rows[0].category, "On-Page SEO");
        assert_eq!(rows[0].factor, "Title Tag");
        assert_eq!(rows[10].factor, "Robots Txt");
        assert_eq!(rows[18].category, "Social Presence");
        assert_eq!(rows[18].factor, "Open Graph Tags");
    }

    #[test]
    fn round_trips_through_standard_parser() {
        let report = sample_report();
        let csv = to_csv(&report).unwrap();
        let records = parse_records(&csv);

        assert_eq!(records[0], vec!["SEO Report"]);
        assert_eq!(records[1], vec!["Overall Score", "82"]);
        assert_eq!(
            records[2],
            vec!["Category", "Factor", "Score", "Analysis", "Recommendation"]
        );

        let rows = flatten_factors(&report);
        for (record, row) in records[3..3 + rows.len()].iter().zip(&rows) {
            assert_eq!(record.as_slice(), row.fields().as_slice());
        }
        assert!(records[3][3].contains("\"Example Domain\""));

        let tail = &records[3 + rows.len()..];
        assert_eq!(tail[0], vec!["Top Recommendations"]);
        assert_eq!(tail[1], vec!["Category", "Priority", "Recommendation"]);
        assert_eq!(tail.len(), 2 + report.recommendations.len());
        for (record, rec) in tail[2..].iter().zip(&report.recommendations) {
            assert_eq!(record[0], rec.category);
            assert_eq!(record[1], rec.priority.as_str());
            assert_eq!(record[2], rec.text);
        }
    }

    proptest! {
        #[test]
        fn arbitrary_analysis_text_round_trips(
            analysis in "[a-zA-Z0-9 ,\"\n.'-]{1,80}",
            recommendation in "[a-zA-Z0-9 ,\".-]{1,80}",
        ) {
            let mut report = sample_report();
            report.on_page_seo.headings.analysis = analysis.clone();
            report.on_page_seo.headings.recommendation = recommendation.clone();
            let csv = to_csv(&report).unwrap();
            let records = parse_records(&csv);
            // Row 3 is Title Tag, row 5 is Headings.
            prop_assert_eq!(&records[5][1], "Headings");
            prop_assert_eq!(&records[5][3], &analysis);
            prop_assert_eq!(&records[5][4], &recommendation);
        }
    }
}
