//! Splits an entry's description HTML into poster, spoiler flag and the
//! review body, and rewrites the body into messenger markup.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html};

use crate::markup::{self, RichText};

const SPOILER_NOTICE: &str = "This review may contain spoilers.";
const WATCHED_ON: &str = "Watched on";
/// Blockquotes are flattened, so quoted lines are indented instead.
const QUOTE_INDENT: &str = "\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}\u{a0}";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewParts {
    pub poster_url: Option<String>,
    pub has_spoilers: bool,
    pub body: Option<RichText>,
}

/// A child node worth rendering.
#[derive(Clone, Copy)]
enum Piece<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

impl<'a> Piece<'a> {
    fn element(self) -> Option<ElementRef<'a>> {
        match self {
            Piece::Element(element) => Some(element),
            Piece::Text(_) => None,
        }
    }
}

fn pieces(element: ElementRef<'_>) -> impl Iterator<Item = Piece<'_>> {
    element.children().filter_map(|node| {
        if let Some(child) = ElementRef::wrap(node) {
            return Some(Piece::Element(child));
        }
        node.value().as_text().map(|text| Piece::Text(&**text))
    })
}

/// Element children plus any non-blank text between them.
fn blocks(element: ElementRef<'_>) -> Vec<Piece<'_>> {
    pieces(element)
        .filter(|piece| match piece {
            Piece::Element(_) => true,
            Piece::Text(text) => !text.trim().is_empty(),
        })
        .collect()
}

pub fn extract(description: &str) -> ReviewParts {
    let fragment = Html::parse_fragment(description);
    let mut blocks = blocks(fragment.root_element());
    let mut parts = ReviewParts::default();

    if let Some(img) = blocks
        .first()
        .and_then(|b| b.element())
        .and_then(|b| find_descendant(b, "img"))
    {
        parts.poster_url = img.value().attr("src").map(String::from);
        blocks.remove(0);
    }

    if let Some(first) = blocks.first().and_then(|b| b.element()) {
        if find_descendant(first, "em").is_some() && block_text(first).starts_with(SPOILER_NOTICE)
        {
            parts.has_spoilers = true;
            blocks.remove(0);
        }
    }

    if let Some(last) = blocks.last().and_then(|b| b.element()) {
        if block_text(last).starts_with(WATCHED_ON) {
            blocks.pop();
        }
    }

    let paragraphs: Vec<String> = blocks.into_iter().flat_map(render_block).collect();
    let body = markup::parse(&paragraphs.join("\n\n"));
    if !body.is_empty() {
        parts.body = Some(body);
    }

    parts
}

fn find_descendant<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

fn block_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim_start().to_string()
}

/// One top-level piece to zero or more paragraphs of markup.
fn render_block(piece: Piece<'_>) -> Vec<String> {
    match piece {
        Piece::Text(text) => vec![encode_text(text.trim()).into_owned()],
        Piece::Element(element) if element.value().name() == "blockquote" => blocks(element)
            .into_iter()
            .map(|child| {
                let mut out = String::from(QUOTE_INDENT);
                render_inline(child, &mut out, QUOTE_INDENT);
                out
            })
            .collect(),
        Piece::Element(element) => {
            let mut out = String::new();
            for child in pieces(element) {
                render_inline(child, &mut out, "");
            }
            if out.trim().is_empty() {
                Vec::new()
            } else {
                vec![out]
            }
        }
    }
}

/// Keep the inline tags the messenger understands, unwrap everything else.
fn render_inline(piece: Piece<'_>, out: &mut String, indent: &str) {
    let element = match piece {
        Piece::Text(text) => {
            out.push_str(&encode_text(text));
            return;
        }
        Piece::Element(element) => element,
    };

    let name = element.value().name();
    if name == "br" {
        out.push('\n');
        out.push_str(indent);
        return;
    }

    let open = match name {
        "b" | "strong" | "i" | "em" | "u" | "s" | "del" | "code" => Some(format!("<{name}>")),
        "a" => element
            .value()
            .attr("href")
            .filter(|href| !href.is_empty())
            .map(|href| format!("<a href=\"{}\">", encode_double_quoted_attribute(href))),
        _ => None,
    };

    if let Some(open) = &open {
        out.push_str(open);
    }
    for child in pieces(element) {
        render_inline(child, out, indent);
    }
    if open.is_some() {
        out.push_str(&format!("</{name}>"));
    }
}
