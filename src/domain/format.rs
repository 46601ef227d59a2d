//! Rendering of entries into the markup understood by [`crate::markup`].
//!
//! Formatting is pure: supplemental fields are read as they are, so they
//! must be resolved beforehand.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::domain::rating::emoji_for;
use crate::domain::{ListLog, LogEntry, MovieLog, UserFeed};

pub const REWATCH_GLYPH: &str = "🔁";
pub const LIKED_GLYPH: &str = "❤️";
pub const NEW_LIST_GLYPH: &str = "📝";
pub const SPOILER_BANNER: &str = "Це ревʼю містить спойлери.";
const HEADER_PREFIX: &str = "Оновлення від";

/// Grammatical number of a count, by its last one or two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    One,
    Few,
    Many,
}

pub fn plural_form(n: u32) -> PluralForm {
    let last = n % 10;
    let last_two = n % 100;

    if last == 1 && last_two != 11 {
        PluralForm::One
    } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
        PluralForm::Few
    } else {
        PluralForm::Many
    }
}

/// `"3 фільми"`, `"11 фільмів"`, ...
pub fn film_count(n: u32) -> String {
    let noun = match plural_form(n) {
        PluralForm::One => "фільм",
        PluralForm::Few => "фільми",
        PluralForm::Many => "фільмів",
    };
    format!("{n} {noun}")
}

fn link(href: &str, inner: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        encode_double_quoted_attribute(href),
        inner
    )
}

impl MovieLog {
    pub fn format(&self) -> String {
        let mut prefix = Vec::with_capacity(4);
        if self.is_rewatch == Some(true) {
            prefix.push(REWATCH_GLYPH.to_string());
        }
        if self.liked() {
            prefix.push(LIKED_GLYPH.to_string());
        }
        prefix.push(emoji_for(self.rating).markup());
        if let Some(rating) = self.rating {
            prefix.push(rating.stars().to_string());
        }

        let title = match &self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        };
        let mut out = format!(
            "{} {}",
            prefix.join(" "),
            link(&self.link, &format!("<i>{}</i>", encode_text(&title)))
        );

        if let Some(review) = &self.review {
            out.push_str("\n<blockquote expandable>");
            if self.has_spoilers {
                out.push_str(&format!("<b><i>{SPOILER_BANNER}</i></b>\n"));
            }
            out.push_str(&review.to_markup());
            out.push_str("</blockquote>");
        }

        out
    }
}

impl ListLog {
    pub fn format(&self) -> String {
        let mut out = format!(
            "{NEW_LIST_GLYPH} {}",
            link(&self.link, &format!("<i>{}</i>", encode_text(&self.title)))
        );
        if let Some(count) = self.film_count() {
            out.push_str(&format!(" ({})", film_count(count)));
        }
        out
    }
}

impl LogEntry {
    pub fn format(&self) -> String {
        match self {
            LogEntry::Movie(movie) => movie.format(),
            LogEntry::List(list) => list.format(),
        }
    }
}

impl UserFeed {
    /// Header line followed by one line per entry.
    pub fn format(&self) -> String {
        let header = format!(
            "<b>{HEADER_PREFIX} {}:</b>",
            link(&self.user_link, &encode_text(&self.display_name))
        );

        std::iter::once(header)
            .chain(self.entries.iter().map(LogEntry::format))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rating;
    use crate::markup::{parse, Span, SpanKind};
    use chrono::Utc;

    fn movie() -> MovieLog {
        MovieLog::new(
            "https://letterboxd.com/jane/film/dune/".into(),
            "Dune".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_plural_forms() {
        assert_eq!(plural_form(1), PluralForm::One);
        assert_eq!(plural_form(22), PluralForm::Few);
        assert_eq!(plural_form(21), PluralForm::One);
        assert_eq!(plural_form(11), PluralForm::Many);
        assert_eq!(plural_form(3), PluralForm::Few);
        assert_eq!(plural_form(12), PluralForm::Many);
        assert_eq!(plural_form(14), PluralForm::Many);
        assert_eq!(plural_form(0), PluralForm::Many);
        assert_eq!(plural_form(111), PluralForm::Many);
        assert_eq!(plural_form(101), PluralForm::One);
    }

    #[test]
    fn test_film_count_text() {
        assert_eq!(film_count(1), "1 фільм");
        assert_eq!(film_count(3), "3 фільми");
        assert_eq!(film_count(11), "11 фільмів");
        assert_eq!(film_count(25), "25 фільмів");
    }

    #[test]
    fn test_unrated_movie() {
        let formatted = movie().format();
        assert_eq!(
            formatted,
            "<tg-emoji emoji-id=\"5433986691549387917\">😋</tg-emoji> \
             <a href=\"https://letterboxd.com/jane/film/dune/\"><i>Dune</i></a>"
        );
    }

    #[test]
    fn test_rated_liked_rewatch_with_year() {
        let mut movie = movie();
        movie.year = Some("2021".into());
        movie.rating = Some(Rating::FourAndHalf);
        movie.is_rewatch = Some(true);
        movie.is_liked.resolve(true);

        let formatted = movie.format();
        assert!(formatted.starts_with(
            "🔁 ❤️ <tg-emoji emoji-id=\"5436196100035862776\">😭</tg-emoji> ★★★★½ "
        ));
        assert!(formatted.ends_with("<i>Dune (2021)</i></a>"));
    }

    #[test]
    fn test_review_with_spoilers() {
        let mut movie = movie();
        movie.review = Some(parse("Great <b>film</b> &amp; more"));
        movie.has_spoilers = true;

        let formatted = movie.format();
        assert!(formatted.ends_with(
            "\n<blockquote expandable><b><i>Це ревʼю містить спойлери.</i></b>\n\
             Great <b>film</b> &amp; more</blockquote>"
        ));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut movie = movie();
        movie.title = "Fast & <Furious>".into();
        let rich = parse(&movie.format());
        assert!(rich.text.ends_with("Fast & <Furious>"));
    }

    #[test]
    fn test_list_with_and_without_size() {
        let mut list = ListLog::new(
            "https://letterboxd.com/jane/list/best/".into(),
            "Best".into(),
            Utc::now(),
        );
        assert_eq!(
            list.format(),
            "📝 <a href=\"https://letterboxd.com/jane/list/best/\"><i>Best</i></a>"
        );

        list.size.resolve(Some(22));
        assert!(list.format().ends_with("</a> (22 фільми)"));
    }

    #[test]
    fn test_user_feed_format() {
        let mut feed = UserFeed::new("https://letterboxd.com/jane/".into(), "Jane".into());
        feed.entries.push(LogEntry::Movie(movie()));

        let formatted = feed.format();
        let lines: Vec<_> = formatted.lines().collect();
        assert_eq!(
            lines[0],
            "<b>Оновлення від <a href=\"https://letterboxd.com/jane/\">Jane</a>:</b>"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_formatter_output_round_trips() {
        let mut movie = movie();
        movie.rating = Some(Rating::Three);
        movie.review = Some(parse("line one\n\nline <i>two</i>"));
        let mut feed = UserFeed::new("https://letterboxd.com/jane/".into(), "Jane".into());
        feed.entries.push(LogEntry::Movie(movie));

        let first = parse(&feed.format());
        let second = parse(&first.to_markup());
        assert_eq!(first.text, second.text);

        let mut a: Vec<_> = first.spans.iter().map(|s: &Span| s.kind.clone()).collect();
        let mut b: Vec<_> = second.spans.iter().map(|s| s.kind.clone()).collect();
        a.sort_by_key(|k| format!("{k:?}"));
        b.sort_by_key(|k| format!("{k:?}"));
        assert_eq!(a, b);
        assert!(a.contains(&SpanKind::Blockquote { collapsed: true }));
    }
}
