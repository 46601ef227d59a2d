//! Best-effort secondary page fetches for fields the feed leaves out.
//!
//! A movie entry's page shows whether the member liked the film, a list's
//! page says how many films it holds. Pages that cannot be fetched or read
//! resolve to the defaults (`false` and unknown size).

use std::sync::Arc;

use scraper::{Html, Selector};

use crate::domain::{LogEntry, UserFeed};
use crate::fetcher::parallel::ParallelFetcher;

const LIST_SIZE_PREFIX: &str = "A list of ";

pub struct Enricher {
    fetcher: Arc<ParallelFetcher>,
}

impl Enricher {
    pub fn new(fetcher: Arc<ParallelFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolve every unresolved supplemental field across all feeds.
    ///
    /// All pages are requested at once; the fetcher's connection cap bounds
    /// how many are in flight.
    pub async fn enrich(&self, feeds: &mut [UserFeed]) {
        let urls: Vec<String> = pending(feeds).map(|entry| entry.link().to_string()).collect();
        if urls.is_empty() {
            return;
        }

        tracing::debug!("Fetching {} supplemental pages", urls.len());
        let pages = self.fetcher.fetch_urls(urls).await;

        for (entry, page) in pending_mut(feeds).zip(pages) {
            let page = page.map(|body| String::from_utf8_lossy(&body).into_owned());
            if page.is_none() {
                tracing::debug!("No supplemental page for {}", entry.link());
            }
            apply(entry, page.as_deref());
        }
    }
}

fn pending(feeds: &[UserFeed]) -> impl Iterator<Item = &LogEntry> {
    feeds
        .iter()
        .flat_map(|feed| feed.entries.iter())
        .filter(|entry| entry.needs_supplemental())
}

fn pending_mut(feeds: &mut [UserFeed]) -> impl Iterator<Item = &mut LogEntry> {
    feeds
        .iter_mut()
        .flat_map(|feed| feed.entries.iter_mut())
        .filter(|entry| entry.needs_supplemental())
}

fn apply(entry: &mut LogEntry, page: Option<&str>) {
    match entry {
        LogEntry::Movie(movie) => {
            movie.is_liked.resolve(page.is_some_and(parse_liked));
        }
        LogEntry::List(list) => {
            list.size.resolve(page.and_then(parse_list_size));
        }
    }
}

/// The entry page marks a liked film with an `.icon-liked` element.
pub fn parse_liked(html: &str) -> bool {
    let Ok(selector) = Selector::parse(".icon-liked") else {
        return false;
    };
    Html::parse_document(html).select(&selector).next().is_some()
}

/// Film count from a list page's description, `"A list of 12 films ..."`.
pub fn parse_list_size(html: &str) -> Option<u32> {
    let selector =
        Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#).ok()?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(count_from_description)
}

fn count_from_description(description: &str) -> Option<u32> {
    let rest = description.trim().strip_prefix(LIST_SIZE_PREFIX)?;
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::app::{DigestError, Result};
    use crate::domain::{ListLog, MovieLog, Supplemental};
    use crate::fetcher::Fetcher;

    const LIKED_PAGE: &str = r#"<html><body><div class="film-poster"></div>
<span class="icon-liked" title="Liked"></span></body></html>"#;
    const PLAIN_PAGE: &str = "<html><body><p>Nothing to see</p></body></html>";
    const LIST_PAGE: &str = r#"<html><head>
<meta name="description" content="A list of 1,204 films compiled on Letterboxd, including Heat and Dune." />
</head><body></body></html>"#;

    /// Serves fixed pages by URL suffix; anything else is a 404.
    struct Pages;

    #[async_trait]
    impl Fetcher for Pages {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let body = if url.ends_with("/liked/") {
                LIKED_PAGE
            } else if url.ends_with("/plain/") {
                PLAIN_PAGE
            } else if url.ends_with("/list/") {
                LIST_PAGE
            } else {
                return Err(DigestError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            };
            Ok(body.as_bytes().to_vec())
        }
    }

    fn movie(link: &str) -> LogEntry {
        LogEntry::Movie(MovieLog::new(link.into(), "Film".into(), Utc::now()))
    }

    fn list(link: &str) -> LogEntry {
        LogEntry::List(ListLog::new(link.into(), "List".into(), Utc::now()))
    }

    #[test]
    fn test_parse_liked() {
        assert!(parse_liked(LIKED_PAGE));
        assert!(!parse_liked(PLAIN_PAGE));
        assert!(!parse_liked(""));
    }

    #[test]
    fn test_parse_list_size() {
        assert_eq!(parse_list_size(LIST_PAGE), Some(1204));
        assert_eq!(parse_list_size(PLAIN_PAGE), None);

        let og = r#"<meta property="og:description" content="A list of 3 films compiled on Letterboxd">"#;
        assert_eq!(parse_list_size(og), Some(3));

        let other = r#"<meta name="description" content="Films I like.">"#;
        assert_eq!(parse_list_size(other), None);
    }

    #[tokio::test]
    async fn test_enrich_resolves_all_users() {
        let fetcher = Arc::new(ParallelFetcher::new(Arc::new(Pages), "https://x.org"));
        let enricher = Enricher::new(fetcher);

        let mut jane = UserFeed::new("j".into(), "Jane".into());
        jane.entries = vec![movie("https://x.org/a/liked/"), list("https://x.org/b/list/")];
        let mut bob = UserFeed::new("b".into(), "Bob".into());
        bob.entries = vec![movie("https://x.org/c/plain/"), list("https://x.org/gone/")];
        let mut feeds = vec![jane, bob];

        enricher.enrich(&mut feeds).await;

        let all: Vec<&LogEntry> = feeds.iter().flat_map(|f| f.entries.iter()).collect();
        assert!(all.iter().all(|e| !e.needs_supplemental()));

        let LogEntry::Movie(liked) = all[0] else { panic!() };
        assert_eq!(liked.is_liked, Supplemental::Resolved(true));
        let LogEntry::List(sized) = all[1] else { panic!() };
        assert_eq!(sized.film_count(), Some(1204));
        let LogEntry::Movie(plain) = all[2] else { panic!() };
        assert_eq!(plain.is_liked, Supplemental::Resolved(false));
        let LogEntry::List(gone) = all[3] else { panic!() };
        assert_eq!(gone.size, Supplemental::Resolved(None));
    }

    #[tokio::test]
    async fn test_enrich_skips_resolved_entries() {
        let fetcher = Arc::new(ParallelFetcher::new(Arc::new(Pages), "https://x.org"));
        let enricher = Enricher::new(fetcher);

        let mut entry = MovieLog::new("https://x.org/a/plain/".into(), "Film".into(), Utc::now());
        entry.is_liked.resolve(true);
        let mut feed = UserFeed::new("j".into(), "Jane".into());
        feed.entries = vec![LogEntry::Movie(entry)];
        let mut feeds = vec![feed];

        enricher.enrich(&mut feeds).await;

        let LogEntry::Movie(movie) = &feeds[0].entries[0] else { panic!() };
        assert!(movie.liked());
    }
}
