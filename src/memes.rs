//! Meme pictures for extreme ratings.
//!
//! Loved (4.5 and up) and hated (1.0 and below) films that came with a
//! poster are picked out of the digest. The poster is downloaded and handed
//! to a [`MemeRenderer`] together with the member's name.

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{LogEntry, Rating, Sentiment, UserFeed};
use crate::fetcher::parallel::ParallelFetcher;

#[derive(Debug, Clone, PartialEq)]
pub struct MemeCandidate {
    pub member: String,
    pub title: String,
    pub rating: Rating,
    pub sentiment: Sentiment,
    pub poster_url: String,
}

/// A finished picture, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Meme {
    pub candidate: MemeCandidate,
    pub image: Vec<u8>,
}

#[async_trait]
pub trait MemeRenderer: Send + Sync {
    /// Compose the picture from the poster bytes.
    async fn render(&self, candidate: &MemeCandidate, poster: &[u8]) -> Result<Vec<u8>>;
}

/// Sends the poster itself.
pub struct PosterOnly;

#[async_trait]
impl MemeRenderer for PosterOnly {
    async fn render(&self, _candidate: &MemeCandidate, poster: &[u8]) -> Result<Vec<u8>> {
        Ok(poster.to_vec())
    }
}

pub fn select_candidates(feeds: &[UserFeed]) -> Vec<MemeCandidate> {
    feeds
        .iter()
        .flat_map(|feed| {
            feed.entries.iter().filter_map(move |entry| {
                let LogEntry::Movie(movie) = entry else {
                    return None;
                };
                let rating = movie.rating?;
                Some(MemeCandidate {
                    member: feed.display_name.clone(),
                    title: movie.title.clone(),
                    rating,
                    sentiment: rating.sentiment()?,
                    poster_url: movie.poster_url.clone()?,
                })
            })
        })
        .collect()
}

/// Download posters and render. Candidates whose poster or rendering fails
/// are left out.
pub async fn render_memes(
    fetcher: &ParallelFetcher,
    renderer: &dyn MemeRenderer,
    candidates: Vec<MemeCandidate>,
) -> Vec<Meme> {
    let urls = candidates.iter().map(|c| c.poster_url.clone()).collect();
    let posters = fetcher.fetch_urls(urls).await;

    let mut memes = Vec::new();
    for (candidate, poster) in candidates.into_iter().zip(posters) {
        let Some(poster) = poster else {
            continue;
        };
        match renderer.render(&candidate, &poster).await {
            Ok(image) => memes.push(Meme { candidate, image }),
            Err(e) => tracing::warn!("Could not render meme for {}: {}", candidate.title, e),
        }
    }

    memes
}
