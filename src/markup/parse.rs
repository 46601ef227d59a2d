use html_escape::decode_html_entities;

use super::{RichText, Span, SpanKind};

/// Elements that never have a closing tag and so never enter the open stack.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Parse markup into plain text and spans.
///
/// Unknown tags are dropped and their content kept. Spans still open at the
/// end of the input are discarded.
pub fn parse(markup: &str) -> RichText {
    if markup.is_empty() {
        return RichText::default();
    }

    let mut builder = Builder::default();
    for token in Tokenizer::new(markup) {
        match token {
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                builder.start_tag(&name, &attrs);
                if self_closing {
                    builder.end_tag(&name);
                }
            }
            Token::End { name } => builder.end_tag(&name),
            Token::Text(raw) => builder.data(&decode_html_entities(raw)),
        }
    }

    builder.finish()
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(&'a str),
}

/// A forgiving scanner: anything that does not look like a tag is text.
struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Try to read a markup construct at `self.pos` (which points at `<`).
    /// Returns `None` if the `<` is literal text.
    fn markup_at_cursor(&mut self) -> Option<Option<Token<'a>>> {
        let rest = self.rest();
        let after = &rest[1..];

        if let Some(body) = after.strip_prefix("!--") {
            let end = body.find("-->").map(|i| i + 3).unwrap_or(body.len());
            self.pos += 4 + end;
            return Some(None);
        }
        if after.starts_with('!') || after.starts_with('?') {
            let end = after.find('>').map(|i| i + 1).unwrap_or(after.len());
            self.pos += 1 + end;
            return Some(None);
        }

        let (closing, body) = match after.strip_prefix('/') {
            Some(body) => (true, body),
            None => (false, after),
        };
        if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let close = find_tag_end(body)?;
        let inner = &body[..close];
        self.pos += 1 + usize::from(closing) + close + 1;

        let name_end = inner
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();

        if closing {
            return Some(Some(Token::End { name }));
        }

        let attr_src = &inner[name_end..];
        let self_closing = attr_src.trim_end().ends_with('/');
        Some(Some(Token::Start {
            name,
            attrs: parse_attributes(attr_src),
            self_closing,
        }))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }

            if self.rest().starts_with('<') {
                match self.markup_at_cursor() {
                    Some(Some(token)) => return Some(token),
                    Some(None) => continue,
                    None => {}
                }
            }

            // Text runs until the next `<` that starts real markup.
            let start = self.pos;
            let first = self.rest().chars().next().map_or(1, char::len_utf8);
            let mut cursor = start + first;
            while let Some(found) = self.input[cursor..].find('<') {
                let at = cursor + found;
                let ahead = &self.input[at + 1..];
                let ahead = ahead.strip_prefix('/').unwrap_or(ahead);
                if ahead.starts_with(|c: char| c.is_ascii_alphabetic() || c == '!' || c == '?') {
                    cursor = at;
                    break;
                }
                cursor = at + 1;
            }
            if !self.input[cursor..].starts_with('<') {
                cursor = self.input.len();
            }
            self.pos = cursor;
            return Some(Token::Text(&self.input[start..cursor]));
        }
    }
}

/// Index of the `>` closing a tag, skipping over quoted attribute values.
fn find_tag_end(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attributes(src: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() || c == '/' {
            chars.next();
            continue;
        }

        let mut name_end = src.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                name_end = i;
                break;
            }
            chars.next();
        }
        let name = src[start..name_end].to_ascii_lowercase();

        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().map(|&(_, c)| c) != Some('=') {
            attrs.push((name, String::new()));
            continue;
        }
        chars.next();
        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek().copied() {
            Some((i, q @ ('"' | '\''))) => {
                chars.next();
                let mut end = src.len();
                for (j, c) in chars.by_ref() {
                    if c == q {
                        end = j;
                        break;
                    }
                }
                &src[i + 1..end]
            }
            Some((i, _)) => {
                let mut end = src.len();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                &src[i..end]
            }
            None => "",
        };
        attrs.push((name, decode_html_entities(value).into_owned()));
    }

    attrs
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

struct OpenTag {
    name: String,
    /// Text emitted in place of the element's content (email links).
    replacement: Option<String>,
}

struct PendingSpan {
    tag: String,
    offset: usize,
    length: usize,
    kind: SpanKind,
}

#[derive(Default)]
struct Builder {
    text: String,
    emitted: usize,
    open: Vec<OpenTag>,
    building: Vec<PendingSpan>,
    finished: Vec<Span>,
}

impl Builder {
    fn start_tag(&mut self, tag: &str, attrs: &[(String, String)]) {
        if !VOID_ELEMENTS.contains(&tag) {
            self.open.push(OpenTag {
                name: tag.to_string(),
                replacement: None,
            });
        }

        let kind = match tag {
            "strong" | "b" => SpanKind::Bold,
            "em" | "i" => SpanKind::Italic,
            "u" => SpanKind::Underline,
            "del" | "s" => SpanKind::Strike,
            "blockquote" => SpanKind::Blockquote { collapsed: true },
            "tg-spoiler" => SpanKind::Spoiler,
            "code" => {
                // Inside <pre>, <code class="language-x"> only names the language.
                if let Some(pre) = self.building.iter_mut().find(|p| p.tag == "pre") {
                    if let Some(language) =
                        attr(attrs, "class").and_then(|c| c.strip_prefix("language-"))
                    {
                        pre.kind = SpanKind::Pre {
                            language: language.to_string(),
                        };
                    }
                    return;
                }
                SpanKind::Code
            }
            "pre" => SpanKind::Pre {
                language: String::new(),
            },
            "a" => {
                let Some(href) = attr(attrs, "href").filter(|h| !h.is_empty()) else {
                    return;
                };
                match href.strip_prefix("mailto:") {
                    Some(address) => {
                        let address = address.to_string();
                        if let Some(top) = self.open.last_mut() {
                            top.replacement = Some(address);
                        }
                        SpanKind::Email
                    }
                    None => SpanKind::TextLink {
                        url: href.to_string(),
                    },
                }
            }
            "tg-emoji" => {
                let Some(document_id) = attr(attrs, "emoji-id").and_then(|id| id.parse().ok())
                else {
                    return;
                };
                SpanKind::CustomEmoji { document_id }
            }
            _ => return,
        };

        if !self.building.iter().any(|p| p.tag == tag) {
            self.building.push(PendingSpan {
                tag: tag.to_string(),
                offset: self.emitted,
                length: 0,
                kind,
            });
        }
    }

    fn data(&mut self, data: &str) {
        let data = match self.open.last() {
            Some(OpenTag {
                name,
                replacement: Some(replacement),
            }) if name == "a" => replacement.clone(),
            _ => data.to_string(),
        };

        let count = data.chars().count();
        for pending in &mut self.building {
            pending.length += count;
        }
        self.emitted += count;
        self.text.push_str(&data);
    }

    fn end_tag(&mut self, tag: &str) {
        if let Some(pos) = self.open.iter().rposition(|open| open.name == tag) {
            self.open.truncate(pos);
        }

        let Some(index) = self.building.iter().position(|p| p.tag == tag) else {
            return;
        };
        let pending = self.building.remove(index);

        let kind = match pending.kind {
            SpanKind::TextLink { url } if self.covered(pending.offset, pending.length) == url => {
                SpanKind::Url
            }
            kind => kind,
        };
        self.finished
            .push(Span::new(pending.offset, pending.length, kind));
    }

    fn covered(&self, offset: usize, length: usize) -> String {
        self.text.chars().skip(offset).take(length).collect()
    }

    fn finish(self) -> RichText {
        let Builder {
            text, mut finished, ..
        } = self;

        let text = strip_text(&text, &mut finished);

        // Outer spans close later, so after reversing they precede inner
        // spans that start at the same offset.
        finished.reverse();
        finished.sort_by_key(|span| span.offset);

        RichText::new(text, finished)
    }
}

/// Trim surrounding whitespace, moving spans to stay over the same characters.
fn strip_text(text: &str, spans: &mut Vec<Span>) -> String {
    let original_len = text.chars().count();
    let left = text.trim_start();
    let left_offset = original_len - left.chars().count();
    let stripped = left.trim_end();
    let final_len = stripped.chars().count();

    spans.retain_mut(|span| {
        if span.length == 0 || span.end() <= left_offset {
            return false;
        }
        if span.offset >= left_offset {
            span.offset -= left_offset;
        } else {
            span.length = span.end() - left_offset;
            span.offset = 0;
        }

        if span.end() <= final_len {
            return true;
        }
        if span.offset >= final_len {
            return false;
        }
        span.length = final_len - span.offset;
        true
    });

    stripped.to_string()
}
