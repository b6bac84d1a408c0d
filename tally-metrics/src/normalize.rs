//! Pulls numbers and labels out of loosely typed aggregate records.
//!
//! Upstream rows are inconsistent: a revenue column may be a JSON number, a
//! string like `"$1,204.50"`, `null`, or missing and spelled differently.
//! Callers pass an ordered alias list; the first alias that is present and
//! non-null decides the value. Anything unusable is logged and treated as
//! absent.

use crate::provider::MetricRecord;
use serde_json::Value;
use tracing::warn;

/// First present, non-null value among `aliases`, with the alias that matched.
fn first_present<'a>(record: &'a MetricRecord, aliases: &[&'a str]) -> Option<(&'a str, &'a Value)> {
    let Some(object) = record.as_object() else {
        warn!(record = %record, "Aggregate record is not an object");
        return None;
    };
    aliases.iter().find_map(|alias| match object.get(*alias) {
        Some(Value::Null) | None => None,
        Some(value) => Some((*alias, value)),
    })
}

/// Parse a numeric string, tolerating `$`, group separators and whitespace.
fn parse_numeric_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let cleaned: String = rest
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    let value = if negative { -value } else { value };
    value.is_finite().then_some(value)
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

/// Extract a floating point metric.
pub fn extract_numeric(record: &MetricRecord, aliases: &[&str]) -> Option<f64> {
    let (alias, value) = first_present(record, aliases)?;
    let parsed = value_as_f64(value);
    if parsed.is_none() {
        warn!(alias = alias, value = %value, "Non-numeric metric value treated as absent");
    }
    parsed
}

/// Extract an integer metric. Fractional values are rejected.
pub fn extract_integer(record: &MetricRecord, aliases: &[&str]) -> Option<i64> {
    let (alias, value) = first_present(record, aliases)?;
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let Some(parsed) = value_as_f64(value) else {
        warn!(alias = alias, value = %value, "Non-numeric metric value treated as absent");
        return None;
    };
    if parsed.fract() != 0.0 || parsed.abs() > i64::MAX as f64 {
        warn!(alias = alias, value = %value, "Fractional or out-of-range integer metric treated as absent");
        return None;
    }
    Some(parsed as i64)
}

/// Extract a label such as a state code or product name.
///
/// Numbers are accepted and rendered with `to_string` (store numbers often
/// arrive as integers).
pub fn extract_text(record: &MetricRecord, aliases: &[&str]) -> Option<String> {
    let (alias, value) = first_present(record, aliases)?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => {
            warn!(alias = alias, value = %value, "Unusable label value treated as absent");
            None
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_integer_string_and_number_agree(n in -1_000_000_000i64..1_000_000_000) {
            let record = json!({"as_number": n, "as_string": n.to_string()});
            prop_assert_eq!(extract_integer(&record, &["as_number"]), Some(n));
            prop_assert_eq!(extract_integer(&record, &["as_string"]), Some(n));
        }

        #[test]
        fn prop_arbitrary_strings_never_panic(s in "\\PC{0,32}") {
            let record = json!({"v": s});
            let _ = extract_numeric(&record, &["v"]);
            let _ = extract_integer(&record, &["v"]);
        }
    }
}
