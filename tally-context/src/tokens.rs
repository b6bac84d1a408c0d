//! Token estimates and line clipping for prompt sections.
//!
//! History lines and reference notes are rendered as single lines within a
//! token budget. A clipped line ends with [`CLIP_MARKER`] and never ends
//! partway through a figure, so the backend never sees a shortened number
//! like `$50,211` cut from `$50,211,527.85`.

use tally_core::numeric;

/// Appended to a line that was clipped.
pub const CLIP_MARKER: &str = "...";

/// Rough estimate: ~0.75 tokens per byte of English text.
const TOKENS_PER_BYTE: f64 = 0.75;

pub(crate) fn estimate_tokens(text: &str) -> usize {
    (text.len() as f64 * TOKENS_PER_BYTE).ceil() as usize
}

/// Collapse whitespace in `text` to single spaces and clip it to `budget` tokens.
///
/// Clips at the last word boundary that fits, or mid-word when the first
/// word alone is too long. Either way the cut is moved back to the start of
/// any numeric literal it would split.
pub fn clip_line(text: &str, budget: usize) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if estimate_tokens(&line) <= budget {
        return line;
    }

    let max_bytes = (budget as f64 / TOKENS_PER_BYTE).floor() as usize;
    let Some(room) = max_bytes.checked_sub(CLIP_MARKER.len()).filter(|r| *r > 0) else {
        return String::new();
    };

    let mut end = room;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    if let Some(space) = line[..end].rfind(' ') {
        end = space;
    }
    if let Some(split) = numeric::scan(&line)
        .into_iter()
        .find(|t| t.offset < end && end < t.offset + t.raw.len())
    {
        end = split.offset;
    }

    format!("{}{}", line[..end].trim_end(), CLIP_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_is_kept() {
        assert_eq!(clip_line("hello", 100), "hello");
        assert_eq!(clip_line("", 0), "");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(clip_line("  How are\n\tsales  today? ", 100), "How are sales today?");
    }

    #[test]
    fn test_zero_budget_is_empty() {
        assert_eq!(clip_line("hello world", 0), "");
        assert_eq!(clip_line("hello world", 2), "");
    }

    #[test]
    fn test_clips_at_word_boundary() {
        // 18 tokens leave room for 21 bytes before the marker.
        assert_eq!(
            clip_line("alpha beta gamma delta epsilon zeta", 18),
            "alpha beta gamma..."
        );
    }

    #[test]
    fn test_never_splits_a_figure() {
        // Room for 9 bytes lands inside the currency literal.
        assert_eq!(clip_line("$50,211,527.85total", 9), "...");
        assert_eq!(clip_line("Revenue:$50,211,527.85", 16), "Revenue:...");
    }

    #[test]
    fn test_multibyte_cut_is_on_char_boundary() {
        let clipped = clip_line("ééééééééééé", 6);
        assert!(clipped.ends_with(CLIP_MARKER));
        assert!(estimate_tokens(&clipped) <= 6);
    }
}
