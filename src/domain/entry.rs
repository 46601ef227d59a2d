use chrono::{DateTime, Utc};

use crate::domain::Rating;
use crate::markup::RichText;

/// A field that can only be filled in by a second request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Supplemental<T> {
    #[default]
    Unknown,
    Resolved(T),
}

impl<T> Supplemental<T> {
    /// Record the value. Only the first resolution sticks; returns whether
    /// this call set it.
    pub fn resolve(&mut self, value: T) -> bool {
        match self {
            Supplemental::Unknown => {
                *self = Supplemental::Resolved(value);
                true
            }
            Supplemental::Resolved(_) => false,
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Supplemental::Unknown => None,
            Supplemental::Resolved(value) => Some(value),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Supplemental::Resolved(_))
    }
}

/// A diary entry or review of a single film.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieLog {
    pub link: String,
    pub title: String,
    pub year: Option<String>,
    pub rating: Option<Rating>,
    /// `Some(true)` only when the feed says so; otherwise unknown.
    pub is_rewatch: Option<bool>,
    pub has_spoilers: bool,
    pub poster_url: Option<String>,
    pub review: Option<RichText>,
    pub is_liked: Supplemental<bool>,
    pub published: DateTime<Utc>,
}

impl MovieLog {
    pub fn new(link: String, title: String, published: DateTime<Utc>) -> Self {
        Self {
            link,
            title,
            year: None,
            rating: None,
            is_rewatch: None,
            has_spoilers: false,
            poster_url: None,
            review: None,
            is_liked: Supplemental::Unknown,
            published,
        }
    }

    pub fn liked(&self) -> bool {
        self.is_liked.get().copied().unwrap_or(false)
    }
}

/// A newly published list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLog {
    pub link: String,
    pub title: String,
    /// Resolved to `None` when the list page could not be read.
    pub size: Supplemental<Option<u32>>,
    pub published: DateTime<Utc>,
}

impl ListLog {
    pub fn new(link: String, title: String, published: DateTime<Utc>) -> Self {
        Self {
            link,
            title,
            size: Supplemental::Unknown,
            published,
        }
    }

    pub fn film_count(&self) -> Option<u32> {
        self.size.get().copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Movie(MovieLog),
    List(ListLog),
}

impl LogEntry {
    pub fn published(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Movie(movie) => movie.published,
            LogEntry::List(list) => list.published,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            LogEntry::Movie(movie) => &movie.link,
            LogEntry::List(list) => &list.link,
        }
    }

    pub fn needs_supplemental(&self) -> bool {
        match self {
            LogEntry::Movie(movie) => !movie.is_liked.is_resolved(),
            LogEntry::List(list) => !list.size.is_resolved(),
        }
    }
}
