//! Per-indicator summary statistics.

use crate::models::{IndicatorSummary, MeasurementKind, MeasurementValue, PeriodSeries};
use tracing::debug;

/// The only interpretation of loosely typed measurement values.
///
/// Numbers pass through. Strings contribute their leading number, so
/// `"12 units"` is `12` and `"7,5"` is `7`. Everything else is `0`.
pub fn parse_numeric_or_zero(value: Option<&MeasurementValue>) -> f64 {
    let parsed = match value {
        Some(MeasurementValue::Number(n)) => Some(*n),
        Some(MeasurementValue::Text(s)) => leading_number(s.trim()),
        Some(MeasurementValue::Other(_)) | None => None,
    };

    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Longest prefix of `text` that reads as a decimal float.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse().ok()
}

/// Attach statistics to one aggregated series.
///
/// Returns `None` for a series without periods; the aggregator never emits one.
pub fn summarize(series: PeriodSeries) -> Option<IndicatorSummary> {
    let first_period = series.periods.iter().map(|p| p.period).min()?;
    let last_period = series.periods.iter().map(|p| p.period).max()?;

    let (sum_achieved, achieved_count) = sum_and_count(&series, MeasurementKind::Achieved);
    let (sum_target, target_count) = sum_and_count(&series, MeasurementKind::Target);

    Some(IndicatorSummary {
        indicator: series.indicator,
        periods: series.periods,
        record_count: series.record_count,
        achieved_count,
        target_count,
        sum_achieved,
        sum_target,
        mean_achieved: mean(sum_achieved, achieved_count),
        mean_target: mean(sum_target, target_count),
        first_period,
        last_period,
    })
}

/// Summarize every series, keeping input order.
pub fn summarize_all(series: Vec<PeriodSeries>) -> Vec<IndicatorSummary> {
    series
        .into_iter()
        .filter_map(|s| {
            let id = s.indicator.id.clone();
            let summary = summarize(s);
            if summary.is_none() {
                debug!("Indicator {} has no periods to summarize", id);
            }
            summary
        })
        .collect()
}

fn sum_and_count(series: &PeriodSeries, kind: MeasurementKind) -> (f64, usize) {
    series
        .periods
        .iter()
        .filter_map(|p| p.value(kind))
        .fold((0.0, 0), |(sum, count), value| {
            (sum + parse_numeric_or_zero(Some(value)), count + 1)
        })
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregatedPeriod, Indicator};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
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
    fn test_parse_numeric_or_zero() {
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from(3.5))), 3.5);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from(" 42 "))), 42.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("-1.25"))), -1.25);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("abc"))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("12 units"))), 12.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("7,5"))), 7.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from(".5%"))), 0.5);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("1e3x"))), 1000.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("2e"))), 2.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("-."))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("R$ 10"))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("1e999"))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from(""))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("NaN"))), 0.0);
        assert_eq!(parse_numeric_or_zero(Some(&MeasurementValue::from("inf"))), 0.0);
        assert_eq!(parse_numeric_or_zero(None), 0.0);

        let flag = MeasurementValue::Other(serde_json::Value::Bool(true));
        assert_eq!(parse_numeric_or_zero(Some(&flag)), 0.0);
    }

    #[test]
    fn test_summarize_example_indicator() {
        let series = PeriodSeries {
            indicator: Indicator::new("a", "Alpha"),
            periods: vec![
                period(date(2024, 1, 1), Some(10.into()), Some(12.into())),
                period(date(2024, 2, 1), Some(15.into()), None),
            ],
            record_count: 3,
        };

        let summary = summarize(series).unwrap();
        assert_eq!(summary.sum_achieved, 25.0);
        assert_eq!(summary.sum_target, 12.0);
        assert_eq!(summary.achieved_count, 2);
        assert_eq!(summary.target_count, 1);
        assert_eq!(summary.mean_achieved, 12.5);
        assert_eq!(summary.mean_target, 12.0);
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.unique_periods(), 2);
        assert_eq!(summary.first_period, date(2024, 1, 1));
        assert_eq!(summary.last_period, date(2024, 2, 1));
    }

    #[test]
    fn test_mean_is_zero_without_values() {
        let series = PeriodSeries {
            indicator: Indicator::new("t", "Targets only"),
            periods: vec![period(date(2024, 5, 1), None, Some("7".into()))],
            record_count: 1,
        };

        let summary = summarize(series).unwrap();
        assert_eq!(summary.achieved_count, 0);
        assert_eq!(summary.sum_achieved, 0.0);
        assert_eq!(summary.mean_achieved, 0.0);
        assert_eq!(summary.mean_target, 7.0);
    }

    #[test]
    fn test_unparseable_values_count_but_add_zero() {
        let series = PeriodSeries {
            indicator: Indicator::new("x", "Mixed"),
            periods: vec![
                period(date(2024, 1, 1), Some("n/a".into()), None),
                period(date(2024, 2, 1), Some("8".into()), None),
            ],
            record_count: 2,
        };

        let summary = summarize(series).unwrap();
        assert_eq!(summary.achieved_count, 2);
        assert_eq!(summary.sum_achieved, 8.0);
        assert_eq!(summary.mean_achieved, 4.0);
    }

    #[test]
    fn test_summarize_all_skips_empty_series() {
        let series = vec![
            PeriodSeries {
                indicator: Indicator::new("e", "Empty"),
                periods: vec![],
                record_count: 0,
            },
            PeriodSeries {
                indicator: Indicator::new("b", "Beta"),
                periods: vec![period(date(2024, 1, 1), Some(5.into()), Some(5.into()))],
                record_count: 2,
            },
        ];

        let summaries = summarize_all(series);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].indicator.name, "Beta");
    }
}
