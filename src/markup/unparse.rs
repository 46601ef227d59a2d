use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{Span, SpanKind};

/// Render text and spans back into markup.
///
/// Text between delimiters is escaped exactly once. Span bounds past the end
/// of the text are clamped.
pub fn unparse(text: &str, spans: &[Span]) -> String {
    if text.is_empty() {
        return String::new();
    }
    if spans.is_empty() {
        return encode_text(text).into_owned();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // (position, tie-break, delimiter): starts use +i and ends -i, so at a
    // shared position closing tags of later spans come first.
    let mut inserts: Vec<(usize, i64, String)> = Vec::with_capacity(spans.len() * 2);
    for (i, span) in spans.iter().enumerate() {
        let start = span.offset.min(len);
        let end = span.end().min(len);
        let covered: String = chars[start..end].iter().collect();
        let (open, close) = delimiters(&span.kind, &covered);
        let key = i as i64;
        inserts.push((start, key, open));
        inserts.push((end, -key, close));
    }
    inserts.sort_by_key(|&(at, key, _)| (at, key));

    let mut out = String::with_capacity(text.len() + inserts.len() * 8);
    let mut cursor = 0;
    for (at, _, delimiter) in inserts {
        if at > cursor {
            let segment: String = chars[cursor..at].iter().collect();
            out.push_str(&encode_text(&segment));
            cursor = at;
        }
        out.push_str(&delimiter);
    }
    if cursor < len {
        let segment: String = chars[cursor..].iter().collect();
        out.push_str(&encode_text(&segment));
    }

    out
}

fn delimiters(kind: &SpanKind, covered: &str) -> (String, String) {
    let simple = |tag: &str| (format!("<{tag}>"), format!("</{tag}>"));
    let link = |href: &str| {
        (
            format!("<a href=\"{}\">", encode_double_quoted_attribute(href)),
            "</a>".to_string(),
        )
    };

    match kind {
        SpanKind::Bold => simple("b"),
        SpanKind::Italic => simple("i"),
        SpanKind::Underline => simple("u"),
        SpanKind::Strike => simple("s"),
        SpanKind::Code => simple("code"),
        SpanKind::Spoiler => simple("tg-spoiler"),
        SpanKind::Blockquote { collapsed: true } => (
            "<blockquote expandable>".to_string(),
            "</blockquote>".to_string(),
        ),
        SpanKind::Blockquote { collapsed: false } => simple("blockquote"),
        SpanKind::Pre { language } if language.is_empty() => simple("pre"),
        SpanKind::Pre { language } => (
            format!(
                "<pre><code class=\"language-{}\">",
                encode_double_quoted_attribute(language)
            ),
            "</code></pre>".to_string(),
        ),
        SpanKind::Url => link(covered),
        SpanKind::Email => link(&format!("mailto:{covered}")),
        SpanKind::TextLink { url } => link(url),
        SpanKind::Mention { user_id } => link(&format!("tg://user?id={user_id}")),
        SpanKind::CustomEmoji { document_id } => (
            format!("<tg-emoji emoji-id=\"{document_id}\">"),
            "</tg-emoji>".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    #[test]
    fn test_unparse_without_spans_escapes() {
        assert_eq!(unparse("a < b & c", &[]), "a &lt; b &amp; c");
        assert_eq!(unparse("", &[Span::new(0, 1, SpanKind::Bold)]), "");
    }

    #[test]
    fn test_unparse_simple_span() {
        let spans = vec![Span::new(6, 5, SpanKind::Bold)];
        assert_eq!(unparse("hello world", &spans), "hello <b>world</b>");
    }

    #[test]
    fn test_unparse_shared_start_nests_in_list_order() {
        let spans = vec![Span::new(0, 1, SpanKind::Bold), Span::new(0, 1, SpanKind::Italic)];
        assert_eq!(unparse("x", &spans), "<b><i>x</i></b>");
    }

    #[test]
    fn test_unparse_adjacent_spans() {
        let spans = vec![Span::new(0, 1, SpanKind::Bold), Span::new(1, 1, SpanKind::Italic)];
        assert_eq!(unparse("ab", &spans), "<b>a</b><i>b</i>");
    }

    #[test]
    fn test_unparse_astral_text() {
        let spans = vec![Span::new(1, 1, SpanKind::Underline)];
        assert_eq!(unparse("😀x", &spans), "😀<u>x</u>");
    }

    #[test]
    fn test_unparse_links() {
        let spans = vec![
            Span::new(0, 4, SpanKind::TextLink { url: "https://a.b/?q=\"1\"".into() }),
            Span::new(5, 7, SpanKind::Url),
            Span::new(13, 5, SpanKind::Email),
            Span::new(19, 3, SpanKind::Mention { user_id: 42 }),
        ];
        assert_eq!(
            unparse("link a.b/xy2 x@y.z bob", &spans),
            concat!(
                "<a href=\"https://a.b/?q=&quot;1&quot;\">link</a> ",
                "<a href=\"a.b/xy2\">a.b/xy2</a> ",
                "<a href=\"mailto:x@y.z\">x@y.z</a> ",
                "<a href=\"tg://user?id=42\">bob</a>"
            )
        );
    }

    #[test]
    fn test_unparse_clamps_out_of_range() {
        let spans = vec![Span::new(2, 50, SpanKind::Code)];
        assert_eq!(unparse("abcd", &spans), "ab<code>cd</code>");
    }

    #[test]
    fn test_unparse_span_past_usize_max() {
        let spans = vec![Span::new(usize::MAX - 1, 5, SpanKind::Bold)];
        assert_eq!(unparse("abc", &spans), "abc<b></b>");

        let spans = vec![Span::new(1, usize::MAX, SpanKind::Italic)];
        assert_eq!(unparse("abc", &spans), "a<i>bc</i>");
    }

    #[test]
    fn test_pre_body_is_not_indented() {
        let markup = "Code:\n<pre>fn main() {\n    run();\n}</pre>";
        let first = parse(markup);
        assert_eq!(first.text, "Code:\nfn main() {\n    run();\n}");

        let rebuilt = unparse(&first.text, &first.spans);
        assert_eq!(rebuilt, markup);
        assert_eq!(parse(&rebuilt), first);
    }

    #[test]
    fn test_unparse_pre_and_blockquote() {
        let spans = vec![
            Span::new(0, 2, SpanKind::Pre { language: "py".into() }),
            Span::new(4, 1, SpanKind::Blockquote { collapsed: false }),
        ];
        assert_eq!(
            unparse("x=1 q", &spans),
            "<pre><code class=\"language-py\">x=</code></pre>1 <blockquote>q</blockquote>"
        );
    }

    #[test]
    fn test_round_trip_keeps_text_and_kinds() {
        let markup = concat!(
            "<b>bold <i>both</i></b> <u>u</u> <s>s</s> <tg-spoiler>sp</tg-spoiler> ",
            "<code>c</code> <a href=\"https://e.x/\">e</a> ",
            "<tg-emoji emoji-id=\"5434010992474349724\">😐</tg-emoji> ",
            "<pre><code class=\"language-rust\">let x;</code></pre>"
        );
        let first = parse(markup);
        let rebuilt = unparse(&first.text, &first.spans);
        let second = parse(&rebuilt);

        assert_eq!(first.text, second.text);
        assert_eq!(first.spans, second.spans);
    }
}
