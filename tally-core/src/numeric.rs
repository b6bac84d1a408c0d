//! Numeric literal tokenizer shared by the context reference set and the
//! generated-text scanner.
//!
//! Grammar:
//!
//! ```text
//! token    := [sign] [currency] (integer [fraction] | fraction) [percent]
//! sign     := '+' | '-'
//! currency := '$'
//! integer  := digit{1,3} (',' digit{3})+  |  digit+
//! fraction := '.' digit+
//! percent  := '%'
//! ```
//!
//! The scanner fails closed: a digit run is a token wherever it appears,
//! including right after letters (`USD52000000`). The only exemptions are the
//! period labels `Q1`..`Q4` and `H1`/`H2` standing as whole words. A sign
//! counts only at a word boundary, so `10-20` is two unsigned tokens.
//!
//! The normalized form keeps an explicit sign, drops the currency symbol,
//! group separators and percent sign, and writes a bare fraction as `0.5`.

use std::collections::BTreeSet;

/// A numeric literal found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericToken {
    /// Text exactly as written, e.g. `$1,234.50`.
    pub raw: String,
    /// Canonical `[sign]digits[.digits]` form, e.g. `1234.50` or `-3.0`.
    pub normalized: String,
    /// Byte offset of the token in the scanned text.
    pub offset: usize,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn digit_at(bytes: &[u8], i: usize) -> bool {
    bytes.get(i).is_some_and(u8::is_ascii_digit)
}

/// End of a whole-word `Q1`..`Q4` / `H1`..`H2` label starting at `i`.
fn period_label_end(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_word_byte(bytes[i - 1]) {
        return None;
    }
    let in_range = match (bytes[i], bytes.get(i + 1)) {
        (b'Q', Some(d)) => (b'1'..=b'4').contains(d),
        (b'H', Some(d)) => (b'1'..=b'2').contains(d),
        _ => false,
    };
    if !in_range {
        return None;
    }
    let end = i + 2;
    let continues = match bytes.get(end) {
        None => false,
        Some(&b) if is_word_byte(b) => true,
        Some(b'.') | Some(b',') => digit_at(bytes, end + 1),
        Some(_) => false,
    };
    (!continues).then_some(end)
}

/// Whether a token body (`$`, digit or `.digit`) starts at `i`.
fn body_starts(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i) {
        Some(b'$') => digit_at(bytes, i + 1) || (bytes.get(i + 1) == Some(&b'.') && digit_at(bytes, i + 2)),
        Some(b'.') => digit_at(bytes, i + 1),
        Some(b) => b.is_ascii_digit(),
        None => false,
    }
}

fn sign_allowed(prev: Option<u8>) -> bool {
    prev.map_or(true, |p| !(is_word_byte(p) || p == b'.' || p == b','))
}

/// Scan `text` for numeric literals, left to right.
pub fn scan(text: &str) -> Vec<NumericToken> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        if let Some(end) = period_label_end(bytes, i) {
            i = end;
            continue;
        }

        let b = bytes[i];
        let prev = i.checked_sub(1).map(|k| bytes[k]);
        let signed = (b == b'+' || b == b'-') && sign_allowed(prev) && body_starts(bytes, i + 1);
        if !signed {
            // `3.14.15` is not followed by a bare `.15`.
            let dot_after_digit = b == b'.' && prev.is_some_and(|p| p.is_ascii_digit());
            if dot_after_digit || !body_starts(bytes, i) {
                i += 1;
                continue;
            }
        }

        let start = i;
        let mut normalized = String::new();
        let mut j = i;
        if signed {
            normalized.push(char::from(b));
            j += 1;
        }
        if bytes[j] == b'$' {
            j += 1;
        }

        let int_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }

        if j == int_start {
            normalized.push('0');
        } else {
            normalized.push_str(&text[int_start..j]);
            if j - int_start <= 3 {
                while j + 4 <= len
                    && bytes[j] == b','
                    && bytes[j + 1..j + 4].iter().all(u8::is_ascii_digit)
                    && !digit_at(bytes, j + 4)
                {
                    normalized.push_str(&text[j + 1..j + 4]);
                    j += 4;
                }
            }
        }

        if bytes.get(j) == Some(&b'.') && digit_at(bytes, j + 1) {
            let frac_start = j + 1;
            let mut k = frac_start;
            while k < len && bytes[k].is_ascii_digit() {
                k += 1;
            }
            normalized.push('.');
            normalized.push_str(&text[frac_start..k]);
            j = k;
        }

        if bytes.get(j) == Some(&b'%') {
            j += 1;
        }

        tokens.push(NumericToken {
            raw: text[start..j].to_string(),
            normalized,
            offset: start,
        });
        i = j;
    }

    tokens
}

/// Normalize a single literal. Returns `None` unless the whole trimmed input
/// is exactly one token.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut tokens = scan(trimmed);
    if tokens.len() != 1 {
        return None;
    }
    let token = tokens.remove(0);
    (token.raw.len() == trimmed.len()).then_some(token.normalized)
}

/// Normalized literals appearing anywhere in `texts`.
pub fn literal_set<'a, I>(texts: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .flat_map(scan)
        .map(|token| token.normalized)
        .collect()
}

/// Forms considered the same value as `normalized`: itself, and the variant
/// with or without a trailing `.00`. The sign is kept.
pub fn equivalent_forms(normalized: &str) -> Vec<String> {
    let mut forms = vec![normalized.to_string()];
    if let Some(stripped) = normalized.strip_suffix(".00") {
        forms.push(stripped.to_string());
    } else if !normalized.contains('.') {
        forms.push(format!("{}.00", normalized));
    }
    forms
}

fn split_sign(normalized: &str) -> (Option<char>, &str) {
    match normalized.chars().next() {
        Some(c @ ('+' | '-')) => (Some(c), &normalized[1..]),
        _ => (None, normalized),
    }
}

/// Whether `normalized` (or an equivalent form) is in `reference`.
///
/// An unsigned figure matches a reference of either sign, since prose like
/// "fell 3.0%" carries the direction in words. An explicit `+` matches `+x`
/// or unsigned `x`; an explicit `-` matches only `-x`.
pub fn is_referenced(normalized: &str, reference: &BTreeSet<String>) -> bool {
    let (sign, magnitude) = split_sign(normalized);
    let prefixes: &[&str] = match sign {
        None => &["", "+", "-"],
        Some('+') => &["+", ""],
        Some(_) => &["-"],
    };
    equivalent_forms(magnitude).iter().any(|form| {
        prefixes
            .iter()
            .any(|prefix| reference.contains(&format!("{}{}", prefix, form)))
    })
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn group(n: u64) -> String {
        let digits = n.to_string();
        let mut out = String::new();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_grouped_currency_normalizes_to_plain(whole in 0u64..10_000_000_000, cents in 0u32..100) {
            let text = format!("${}.{:02}", group(whole), cents);
            let expected = format!("{}.{:02}", whole, cents);
            prop_assert_eq!(normalize(&text), Some(expected));
        }

        #[test]
        fn prop_scan_never_panics(text in "\\PC{0,64}") {
            for token in scan(&text) {
                let unsigned = token.normalized.trim_start_matches(['+', '-']);
                prop_assert!(unsigned.starts_with(|c: char| c.is_ascii_digit()));
                prop_assert!(unsigned.chars().all(|c| c.is_ascii_digit() || c == '.'));
                prop_assert_eq!(&text[token.offset..token.offset + token.raw.len()], token.raw.as_str());
            }
        }

        #[test]
        fn prop_literal_found_in_sentence(n in 0u64..1_000_000_000) {
            let display = group(n);
            let sentence = format!("We sold {} units this week.", display);
            let reference = literal_set([display.as_str()]);
            for token in scan(&sentence) {
                prop_assert!(is_referenced(&token.normalized, &reference));
            }
        }
    }
}
