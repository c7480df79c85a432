//! Inline emphasis markers inside paragraph text.
//!
//! `*text*` is gold, `~text~` is red, `_text_` is blue. Markers never nest,
//! never span lines and never wrap empty text; anything that does not form a
//! complete pair is plain text.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Gold(String),
    Red(String),
    Blue(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t) | Span::Gold(t) | Span::Red(t) | Span::Blue(t) => t,
        }
    }
}

fn marker_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\*([^*\n]+)\*|~([^~\n]+)~|_([^_\n]+)_").ok())
        .as_ref()
}

fn push_plain(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Plain(prev)) = spans.last_mut() {
        prev.push_str(text);
    } else {
        spans.push(Span::Plain(text.to_string()));
    }
}

/// Split `text` into styled spans, left to right.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let Some(pattern) = marker_pattern() else {
        push_plain(&mut spans, text);
        return spans;
    };

    let mut cursor = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_plain(&mut spans, &text[cursor..whole.start()]);
        let span = if let Some(m) = caps.get(1) {
            Span::Gold(m.as_str().to_string())
        } else if let Some(m) = caps.get(2) {
            Span::Red(m.as_str().to_string())
        } else if let Some(m) = caps.get(3) {
            Span::Blue(m.as_str().to_string())
        } else {
            Span::Plain(whole.as_str().to_string())
        };
        spans.push(span);
        cursor = whole.end();
    }
    push_plain(&mut spans, &text[cursor..]);
    spans
}

/// Plain-text rendition with all complete markers removed.
pub fn strip(text: &str) -> String {
    parse_inline(text).iter().map(Span::text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_colours() {
        let spans = parse_inline("The *right to privacy* was ~denied~ under _Article 21_.");
        assert_eq!(
            spans,
            vec![
                Span::Plain("The ".into()),
                Span::Gold("right to privacy".into()),
                Span::Plain(" was ".into()),
                Span::Red("denied".into()),
                Span::Plain(" under ".into()),
                Span::Blue("Article 21".into()),
                Span::Plain(".".into()),
            ]
        );
    }

    #[test]
    fn unmatched_and_empty_markers_stay_plain() {
        assert_eq!(parse_inline("5 * 3 = 15"), vec![Span::Plain("5 * 3 = 15".into())]);
        assert_eq!(parse_inline("**"), vec![Span::Plain("**".into())]);
        assert_eq!(parse_inline("a ~b\nc~ d"), vec![Span::Plain("a ~b\nc~ d".into())]);
    }

    #[test]
    fn markers_do_not_nest() {
        let spans = parse_inline("*gold _inner_ gold*");
        assert_eq!(spans, vec![Span::Gold("gold _inner_ gold".into())]);
    }

    #[test]
    fn strip_removes_markers_only() {
        assert_eq!(strip("See _Section 43A_ and *note*"), "See Section 43A and note");
        assert_eq!(strip("no markers"), "no markers");
    }
}
