//! Text cleanup for feed-supplied titles and summaries.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Node};
use unicode_segmentation::UnicodeSegmentation;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"))
}

/// Collapse runs of whitespace and trim.
pub fn compact(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

/// Elements whose content starts on a new line when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dt", "figcaption", "h1", "h2", "h3",
    "h4", "h5", "h6", "li", "p", "pre", "section", "td", "th", "tr",
];

/// Drop markup (and the contents of `script`/`style`), decoding entities.
///
/// Inline markup joins without extra spaces; block boundaries become a space.
pub fn strip_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(text);
    let mut out = String::with_capacity(text.len());
    for node in fragment.root_element().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let parent = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()));
        if matches!(parent, Some("script" | "style")) {
            continue;
        }

        let starts_block = match node.prev_sibling() {
            None => parent.is_some_and(|name| BLOCK_ELEMENTS.contains(&name)),
            Some(prev) => prev
                .value()
                .as_element()
                .is_some_and(|e| BLOCK_ELEMENTS.contains(&e.name())),
        };
        if starts_block {
            out.push(' ');
        }
        out.push_str(chunk);
    }
    compact(&out)
}

/// Strip markup and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    strip_html(text)
}

/// Truncate to at most `max_chars` graphemes, avoiding a mid-word cut.
///
/// Whitespace is collapsed first. Truncated text ends with `…`.
pub fn safe_truncate(text: &str, max_chars: usize) -> String {
    truncate_text(&compact(text), max_chars)
}

/// Like [`safe_truncate`], but keeps line breaks and inner spacing.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.graphemes(true).count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.graphemes(true).take(max_chars).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}

/// Key used to detect the same headline across sources and runs.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    non_word_re().replace_all(&lowered, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact() {
        assert_eq!(compact("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Bond <b>passes</b> &amp; funds</p><script>track()</script>"),
            "Bond passes & funds"
        );
        assert_eq!(strip_html("<p>One.</p><p>Two <i>more</i>.</p>"), "One. Two more.");
        assert_eq!(strip_html("line<br>break"), "line break");
        assert_eq!(strip_html("plain text"), "plain text");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_safe_truncate() {
        assert_eq!(safe_truncate("short", 10), "short");
        assert_eq!(safe_truncate("one two three four", 10), "one two…");
        assert_eq!(safe_truncate("abcdefghijkl", 5), "abcde…");
    }

    #[test]
    fn test_truncate_text_keeps_lines() {
        assert_eq!(truncate_text("# Title\n\n- one\n", 20), "# Title\n\n- one");
        assert_eq!(truncate_text("# Title\n- one two", 14), "# Title\n- one…");
        assert_eq!(truncate_text("# Title\nnext", 9), "# Title…");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("  HISD: Board   Votes, Again! "),
            "hisd board votes again"
        );
        assert_eq!(normalize_title("Café—Opens"), "café opens");
        assert_eq!(normalize_title("🎉🎉 !!!"), "");
    }
}
