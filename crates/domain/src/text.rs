//! Text helpers shared by the aggregator and the composer
//!
//! All lengths here are measured in characters, not bytes.

use scraper::Html;

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";
const ELLIPSIS_LEN: usize = 3;

/// Character count of a string
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Strip tags from an HTML fragment and collapse whitespace
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let joined = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    let collapsed = collapse_whitespace(&joined);

    // Text nodes are joined with spaces; undo the ones that land before punctuation
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && matches!(chars.peek(), Some(',' | '.' | ';' | ':' | '!' | '?' | ')')) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Collapse runs of whitespace to a single space and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars`, preserving word boundaries
///
/// The result, ellipsis included, never exceeds `max_chars`. A single word
/// longer than the allowance is cut mid-word.
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS_LEN {
        return text.chars().take(max_chars).collect();
    }

    let keep = max_chars - ELLIPSIS_LEN;
    let head: String = text.chars().take(keep).collect();
    let at_boundary = text.chars().nth(keep).is_some_and(char::is_whitespace);

    let cut = if at_boundary {
        head.trim_end()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(idx) => head[..idx].trim_end(),
            None => head.as_str(),
        }
    };
    let cut = if cut.is_empty() { head.trim_end() } else { cut };

    format!("{cut}{ELLIPSIS}")
}

/// Cut to `budget - 3` characters and append the ellipsis
///
/// Last-resort enforcement; ignores word boundaries.
pub fn hard_truncate(text: &str, budget: usize) -> String {
    if char_len(text) <= budget {
        return text.to_string();
    }
    if budget < ELLIPSIS_LEN {
        return text.chars().take(budget).collect();
    }
    let head: String = text.chars().take(budget - ELLIPSIS_LEN).collect();
    format!("{head}{ELLIPSIS}")
}
