//! Report text generation.
//!
//! This module renders indicator summaries into the plain-text payload sent
//! to the analysis service, a human overview with the statistics, and a JSON
//! export. The payload must be byte-identical for identical input, so it
//! never depends on locale, clock or hash ordering.

use crate::models::{ComparisonReport, IndicatorSummary, MeasurementValue, SelectionTotals};
use chrono::NaiveDate;

/// Title line opening every payload.
pub const REPORT_TITLE: &str = "COMPARATIVE INDICATOR ANALYSIS:";

/// Rendered in place of a missing achieved or target value.
pub const MISSING_VALUE: &str = "-";

/// Payload used when there is nothing to compare.
pub const EMPTY_REPORT: &str = "No data available for analysis.\n";

const PERIOD_WIDTH: usize = 20;
const ACHIEVED_WIDTH: usize = 9;
const RULE_WIDTH: usize = 50;

/// Generate the analysis payload: one section per summary, in order.
pub fn generate_report_text(summaries: &[IndicatorSummary]) -> String {
    if summaries.is_empty() {
        return EMPTY_REPORT.to_string();
    }

    let mut output = String::new();

    output.push_str(REPORT_TITLE);
    output.push_str("\n\n");

    for summary in summaries {
        output.push_str(&generate_indicator_section(summary));
    }

    output
}

/// Generate the section for one indicator, blank line included.
fn generate_indicator_section(summary: &IndicatorSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "=== INDICATOR: {} ===\n",
        single_line(&summary.indicator.name)
    ));
    section.push_str(&table_row("Reference Period", "Achieved", "Target"));
    section.push_str(&"-".repeat(RULE_WIDTH));
    section.push('\n');

    for period in &summary.periods {
        section.push_str(&table_row(
            &format_date(period.period),
            &render_value(period.achieved.as_ref()),
            &render_value(period.target.as_ref()),
        ));
    }

    section.push('\n');

    section
}

fn table_row(period: &str, achieved: &str, target: &str) -> String {
    format!(
        "{:<pw$} | {:<aw$} | {}\n",
        period,
        achieved,
        target,
        pw = PERIOD_WIDTH,
        aw = ACHIEVED_WIDTH
    )
}

/// Day/month/year with two-digit day and month.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Raw value as stored, or the placeholder when absent.
fn render_value(value: Option<&MeasurementValue>) -> String {
    match value {
        Some(MeasurementValue::Text(s)) if s.trim().is_empty() => MISSING_VALUE.to_string(),
        Some(value) => single_line(&value.to_string()),
        None => MISSING_VALUE.to_string(),
    }
}

/// Keep one table row per period even if stored text contains line breaks.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}

/// Format a statistic with at most two decimals.
pub fn format_stat(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Generate the human-readable overview shown before an analysis is run.
pub fn generate_overview(report: &ComparisonReport) -> String {
    let mut output = String::new();

    output.push_str(&generate_totals_section(&report.totals));

    for summary in &report.summaries {
        output.push_str(&generate_summary_block(summary));
    }

    if !report.missing.is_empty() {
        let missing: Vec<String> = report.missing.iter().map(|id| id.to_string()).collect();
        output.push_str(&format!(
            "Without data ({}): {}\n",
            missing.len(),
            missing.join(", ")
        ));
    }

    output
}

fn generate_totals_section(totals: &SelectionTotals) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "Indicators: {} | Records: {} | Achieved: {} | Targets: {}\n",
        totals.indicators, totals.records, totals.achieved, totals.targets
    ));
    section.push_str(&format!(
        "Total: {} (achieved) | {} (targets)\n\n",
        format_stat(totals.sum_achieved),
        format_stat(totals.sum_target)
    ));

    section
}

fn generate_summary_block(summary: &IndicatorSummary) -> String {
    let mut block = String::new();

    block.push_str(&format!("{}\n", single_line(&summary.indicator.name)));
    block.push_str(&format!(
        "  Periods: {} ({} - {}) | Records: {}\n",
        summary.unique_periods(),
        format_date(summary.first_period),
        format_date(summary.last_period),
        summary.record_count
    ));
    block.push_str(&format!(
        "  Achieved: {} values, sum {}, mean {}\n",
        summary.achieved_count,
        format_stat(summary.sum_achieved),
        format_stat(summary.mean_achieved)
    ));
    block.push_str(&format!(
        "  Target: {} values, sum {}, mean {}\n\n",
        summary.target_count,
        format_stat(summary.sum_target),
        format_stat(summary.mean_target)
    ));

    block
}

/// Generate a JSON export of the whole comparison.
pub fn generate_json_report(report: &ComparisonReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregatedPeriod, Indicator, IndicatorId};
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn summary(name: &str, periods: Vec<AggregatedPeriod>) -> IndicatorSummary {
        let first = periods.first().map(|p| p.period).unwrap();
        let last = periods.last().map(|p| p.period).unwrap();
        IndicatorSummary {
            indicator: Indicator::new(name.to_lowercase(), name),
            periods,
            record_count: 0,
            achieved_count: 0,
            target_count: 0,
            sum_achieved: 0.0,
            sum_target: 0.0,
            mean_achieved: 0.0,
            mean_target: 0.0,
            first_period: first,
            last_period: last,
        }
    }

    fn period(
        period: NaiveDate,
        achieved: Option<MeasurementValue>,
        target: Option<MeasurementValue>,
    ) -> AggregatedPeriod {
        AggregatedPeriod {
            period,
            achieved,
            target,
        }
    }

    #[test]
    fn test_generate_report_text_layout() {
        let summaries = vec![summary(
            "Alpha",
            vec![
                period(date(2024, 1, 1), Some(10.into()), Some(12.into())),
                period(date(2024, 2, 1), Some(15.into()), None),
            ],
        )];

        let text = generate_report_text(&summaries);
        let expected = "COMPARATIVE INDICATOR ANALYSIS:\n\
                        \n\
                        === INDICATOR: Alpha ===\n\
                        Reference Period     | Achieved  | Target\n\
                        --------------------------------------------------\n\
                        01/01/2024           | 10        | 12\n\
                        01/02/2024           | 15        | -\n\
                        \n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(generate_report_text(&[]), EMPTY_REPORT);
    }

    #[test]
    fn test_sections_follow_summary_order() {
        let summaries = vec![
            summary("Beta", vec![period(date(2024, 1, 1), None, None)]),
            summary("Alpha", vec![period(date(2024, 1, 1), None, None)]),
        ];

        let text = generate_report_text(&summaries);
        let beta = text.find("=== INDICATOR: Beta ===").unwrap();
        let alpha = text.find("=== INDICATOR: Alpha ===").unwrap();
        assert!(beta < alpha);
        assert_eq!(text.matches("=== INDICATOR:").count(), 2);
    }

    #[test]
    fn test_missing_and_blank_values_render_placeholder() {
        assert_eq!(render_value(None), "-");
        assert_eq!(render_value(Some(&MeasurementValue::from("  "))), "-");
        assert_eq!(render_value(Some(&MeasurementValue::from("7,5"))), "7,5");
        assert_eq!(render_value(Some(&MeasurementValue::from("a\nb"))), "a b");
    }

    #[test]
    fn test_format_date_is_day_month_year() {
        assert_eq!(format_date(date(2024, 2, 1)), "01/02/2024");
        assert_eq!(format_date(date(2023, 12, 31)), "31/12/2023");
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(25.0), "25");
        assert_eq!(format_stat(12.5), "12.5");
        assert_eq!(format_stat(1.0 / 3.0), "0.33");
        assert_eq!(format_stat(-0.001), "0");
        assert_eq!(format_stat(0.0), "0");
    }

    #[test]
    fn test_report_text_is_deterministic() {
        let summaries = vec![summary(
            "Alpha",
            vec![period(date(2024, 1, 1), Some("3.14".into()), Some(3.into()))],
        )];
        assert_eq!(
            generate_report_text(&summaries),
            generate_report_text(&summaries.clone())
        );
    }

    #[test]
    fn test_generate_overview_and_json() {
        let mut alpha = summary(
            "Alpha",
            vec![
                period(date(2024, 1, 1), Some(10.into()), Some(12.into())),
                period(date(2024, 2, 1), Some(15.into()), None),
            ],
        );
        alpha.record_count = 3;
        alpha.achieved_count = 2;
        alpha.target_count = 1;
        alpha.sum_achieved = 25.0;
        alpha.sum_target = 12.0;
        alpha.mean_achieved = 12.5;
        alpha.mean_target = 12.0;

        let summaries = vec![alpha];
        let report = ComparisonReport {
            generated_at: Utc::now(),
            selection: vec![IndicatorId::from("alpha"), IndicatorId::from("gamma")],
            totals: SelectionTotals::from_summaries(&summaries),
            text: generate_report_text(&summaries),
            summaries,
            missing: vec![IndicatorId::from("gamma")],
        };

        let overview = generate_overview(&report);
        assert!(overview.contains("Indicators: 1 | Records: 3 | Achieved: 2 | Targets: 1"));
        assert!(overview.contains("Periods: 2 (01/01/2024 - 01/02/2024)"));
        assert!(overview.contains("sum 25, mean 12.5"));
        assert!(overview.contains("Without data (1): gamma"));

        let json = generate_json_report(&report).unwrap();
        assert!(json.contains("\"summaries\""));
        assert!(json.contains("\"sum_achieved\": 25.0"));
        assert!(json.contains("\"missing\""));
    }
}
