pub mod review;

use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::app::{DigestError, Result};
use crate::digest::window::parse_timestamp;
use crate::domain::{ListLog, LogEntry, MovieLog, Rating, UserFeed};

const TITLE_PREFIX: &str = "Letterboxd - ";

/// Text collected from one `<item>`. Empty strings mean the element was absent.
#[derive(Debug, Default)]
struct RawItem {
    guid: String,
    title: String,
    link: String,
    pub_date: String,
    description: String,
    creator: String,
    film_title: String,
    film_year: String,
    member_rating: String,
    rewatch: String,
    member_like: String,
}

impl RawItem {
    fn field(&mut self, name: &[u8]) -> Option<&mut String> {
        let field = match name {
            b"guid" => &mut self.guid,
            b"title" => &mut self.title,
            b"link" => &mut self.link,
            b"pubDate" => &mut self.pub_date,
            b"description" => &mut self.description,
            b"dc:creator" => &mut self.creator,
            b"letterboxd:filmTitle" => &mut self.film_title,
            b"letterboxd:filmYear" => &mut self.film_year,
            b"letterboxd:memberRating" => &mut self.member_rating,
            b"letterboxd:rewatch" => &mut self.rewatch,
            b"letterboxd:memberLike" => &mut self.member_like,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Default)]
struct RawChannel {
    title: String,
    link: String,
    items: Vec<RawItem>,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse one user's feed into classified entries.
    ///
    /// Items without a usable `pubDate` are skipped; anything else wrong with
    /// the document fails the whole feed.
    pub fn normalize(&self, body: &[u8]) -> Result<UserFeed> {
        let text = std::str::from_utf8(body)
            .map_err(|e| DigestError::FeedParse(format!("feed is not UTF-8: {e}")))?;
        let channel = read_channel(text)?;

        let mut display_name = channel
            .title
            .strip_prefix(TITLE_PREFIX)
            .unwrap_or(&channel.title)
            .trim()
            .to_string();
        if display_name.is_empty() {
            if let Some(item) = channel.items.iter().find(|i| !i.creator.is_empty()) {
                display_name = item.creator.clone();
            }
        }

        let mut feed = UserFeed::new(channel.link.trim().to_string(), display_name);
        feed.entries = channel.items.into_iter().filter_map(classify).collect();

        Ok(feed)
    }
}

fn read_channel(text: &str) -> Result<RawChannel> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut channel: Option<RawChannel> = None;
    let mut item: Option<RawItem> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"channel" => channel = Some(RawChannel::default()),
                    b"item" if channel.is_some() => item = Some(RawItem::default()),
                    _ => {}
                }
                path.push(name);
            }
            Event::End(_) => {
                if let Some(name) = path.pop() {
                    if name == b"item" {
                        if let (Some(done), Some(channel)) = (item.take(), channel.as_mut()) {
                            channel.items.push(done);
                        }
                    }
                }
            }
            Event::Text(t) => {
                let value = match t.unescape() {
                    Ok(value) => value.into_owned(),
                    Err(_) => decode_html_entities(&String::from_utf8_lossy(&t)).into_owned(),
                };
                append(&path, &mut channel, &mut item, &value);
            }
            Event::CData(c) => {
                let value = String::from_utf8_lossy(&c).into_owned();
                append(&path, &mut channel, &mut item, &value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    channel.ok_or_else(|| DigestError::FeedParse("document has no <channel>".into()))
}

/// Route text to the field of the element directly enclosing it.
fn append(path: &[Vec<u8>], channel: &mut Option<RawChannel>, item: &mut Option<RawItem>, value: &str) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let parent = parents.last().map(Vec::as_slice);

    if let (Some(b"item"), Some(item)) = (parent, item.as_mut()) {
        if let Some(field) = item.field(leaf) {
            field.push_str(value);
        }
        return;
    }

    if let (Some(b"channel"), Some(channel)) = (parent, channel.as_mut()) {
        match leaf.as_slice() {
            b"title" => channel.title.push_str(value),
            b"link" => channel.link.push_str(value),
            _ => {}
        }
    }
}

/// Watches and reviews carry a `w` in their guid; everything else is a list.
fn classify(raw: RawItem) -> Option<LogEntry> {
    let published = match parse_timestamp(&raw.pub_date) {
        Ok(published) => published,
        Err(e) => {
            tracing::debug!("Skipping {}: {}", raw.link, e);
            return None;
        }
    };

    if raw.guid.contains('w') {
        Some(LogEntry::Movie(movie_log(raw, published)))
    } else {
        let title = raw.title.trim().to_string();
        Some(LogEntry::List(ListLog::new(raw.link.trim().to_string(), title, published)))
    }
}

fn movie_log(raw: RawItem, published: chrono::DateTime<chrono::Utc>) -> MovieLog {
    let title = if raw.film_title.trim().is_empty() {
        raw.title.trim()
    } else {
        raw.film_title.trim()
    };
    let mut movie = MovieLog::new(raw.link.trim().to_string(), title.to_string(), published);

    let year = raw.film_year.trim();
    if !year.is_empty() {
        movie.year = Some(year.to_string());
    }

    let rating = raw.member_rating.trim();
    if !rating.is_empty() {
        movie.rating = match rating.parse::<Rating>() {
            Ok(rating) => Some(rating),
            Err(e) => {
                tracing::warn!("{} in {}", e, movie.link);
                None
            }
        };
    }

    if raw.rewatch.trim() == "Yes" {
        movie.is_rewatch = Some(true);
    }

    match raw.member_like.trim() {
        "Yes" => {
            movie.is_liked.resolve(true);
        }
        "No" => {
            movie.is_liked.resolve(false);
        }
        _ => {}
    }

    let parts = review::extract(&raw.description);
    movie.poster_url = parts.poster_url;
    movie.has_spoilers = parts.has_spoilers;
    movie.review = parts.body;

    movie
}
