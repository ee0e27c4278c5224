//! Progress, percentage and summation helpers.

use crate::model::artifact::Artifact;
use serde_json::Value;

/// Clamped `[0, 100]` percentage of `numerator / denominator`.
///
/// A zero, negative or non-finite denominator yields `0.0`.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if !numerator.is_finite() || !denominator.is_finite() || denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator * 100.0).clamp(0.0, 100.0)
}

/// Percentage of two numeric data fields on one artifact.
pub fn percent_of_fields(artifact: &Artifact, numerator: &str, denominator: &str) -> f64 {
    percent(
        numeric_value(artifact.data.get(numerator)),
        numeric_value(artifact.data.get(denominator)),
    )
}

/// Percentage of one numeric data field against a fixed maximum.
pub fn percent_of_max(artifact: &Artifact, field: &str, max: f64) -> f64 {
    percent(numeric_value(artifact.data.get(field)), max)
}

/// `done / total` as a fraction rounded to two decimals; `0.0` when empty.
pub fn completion_ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(done as f64 / total as f64, 2)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Sums one data field across a collection.
///
/// Absent, non-numeric and non-finite values count as zero. Numeric strings
/// (as produced by form inputs) are parsed.
pub fn sum_field<'a>(items: impl IntoIterator<Item = &'a Artifact>, field: &str) -> f64 {
    items
        .into_iter()
        .map(|artifact| numeric_value(artifact.data.get(field)))
        .sum()
}

pub(crate) fn numeric_value(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::{completion_ratio, percent, percent_of_fields, sum_field};
    use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId};
    use serde_json::json;

    fn bill(id: &str, amount: serde_json::Value) -> Artifact {
        Artifact::from_draft(
            ArtifactId::new(id),
            "Bill",
            ArtifactDraft::new(id).with_field("amount", amount),
        )
    }

    #[test]
    fn percent_handles_zero_denominator() {
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(percent(0.0, 0.0), 0.0);
    }

    #[test]
    fn percent_is_exact_at_parity_and_clamped_above() {
        assert_eq!(percent(7.0, 7.0), 100.0);
        assert_eq!(percent(12.0, 7.0), 100.0);
        assert_eq!(percent(-3.0, 7.0), 0.0);
        assert_eq!(percent(f64::NAN, 7.0), 0.0);
    }

    #[test]
    fn percent_of_fields_treats_missing_as_zero() {
        let artifact = Artifact::from_draft(
            ArtifactId::new("job"),
            "ImportJob",
            ArtifactDraft::new("csv").with_field("recordsImported", 25),
        );
        assert_eq!(percent_of_fields(&artifact, "recordsImported", "recordsTotal"), 0.0);
    }

    #[test]
    fn completion_ratio_rounds_to_two_decimals() {
        assert_eq!(completion_ratio(2, 3), 0.67);
        assert_eq!(completion_ratio(0, 0), 0.0);
        assert_eq!(completion_ratio(3, 3), 1.0);
    }

    #[test]
    fn sum_field_skips_non_numeric_values() {
        let items = vec![
            bill("a", json!(12.5)),
            bill("b", json!("7.5")),
            bill("c", json!("n/a")),
            bill("d", json!(null)),
            bill("e", json!(true)),
        ];
        assert_eq!(sum_field(&items, "amount"), 20.0);
        assert_eq!(sum_field(&items, "missing"), 0.0);
    }
}
