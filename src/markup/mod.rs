//! Conversion between the Telegram-flavoured HTML subset the formatter
//! emits and a flat text string annotated with formatting spans.
//!
//! ```text
//! "<b>Hi</b> there" ⇄ ("Hi there", [Span { offset: 0, length: 2, kind: Bold }])
//! ```
//!
//! Offsets and lengths count Unicode scalar values. Transports that count
//! UTF-16 code units use [`RichText::utf16_spans`].

mod parse;
mod unparse;

pub use parse::parse;
pub use unparse::unparse;

/// The formatting carried by a [`Span`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Pre { language: String },
    Blockquote { collapsed: bool },
    Spoiler,
    /// A link whose visible text is the URL itself.
    Url,
    /// A `mailto:` link; the covered text is the address.
    Email,
    TextLink { url: String },
    Mention { user_id: i64 },
    CustomEmoji { document_id: i64 },
}

/// A half-open range `[offset, offset + length)` of the plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(offset: usize, length: usize, kind: SpanKind) -> Self {
        Self {
            offset,
            length,
            kind,
        }
    }

    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

/// Plain text plus the spans annotating it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub text: String,
    pub spans: Vec<Span>,
}

impl RichText {
    pub fn new(text: String, spans: Vec<Span>) -> Self {
        Self { text, spans }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Render back into markup.
    pub fn to_markup(&self) -> String {
        unparse(&self.text, &self.spans)
    }

    /// Spans re-expressed in UTF-16 code units, clamped to the text.
    pub fn utf16_spans(&self) -> Vec<Span> {
        let mut units = Vec::with_capacity(self.text.len() + 1);
        let mut acc = 0;
        units.push(acc);
        for c in self.text.chars() {
            acc += c.len_utf16();
            units.push(acc);
        }
        let last = units.len() - 1;

        self.spans
            .iter()
            .map(|span| {
                let start = units[span.offset.min(last)];
                let end = units[span.end().min(last)];
                Span::new(start, end - start, span.kind.clone())
            })
            .collect()
    }
}
