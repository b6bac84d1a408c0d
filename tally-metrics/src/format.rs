//! Presentation formatting for context displays.
//!
//! Every display string produced here is scanned by the numeric tokenizer to
//! build a context's literal set, so formats must stay inside its grammar.

/// Insert `,` every three digits of an unsigned digit string.
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$50,211,527.85`. Rounded to cents.
pub fn format_currency(value: f64) -> String {
    let cents = (value * 100.0).round() as i128;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}${}.{:02}",
        sign,
        group_digits(&(cents / 100).to_string()),
        cents % 100
    )
}

/// `2,046,713`.
pub fn format_count(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}", sign, group_digits(&value.unsigned_abs().to_string()))
}

/// Signed change with one decimal, e.g. `+4.2%` or `-3.0%`. The sign is part
/// of the literal, so a reversed direction does not validate.
pub fn format_percent_change(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded > 0.0 {
        format!("+{:.1}%", rounded)
    } else if rounded < 0.0 {
        format!("{:.1}%", rounded)
    } else {
        "0.0%".to_string()
    }
}
