use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::digest::{chunker, window};
use crate::domain::UserFeed;
use crate::enricher::Enricher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::memes::{self, Meme, MemeRenderer, PosterOnly};
use crate::normalizer::Normalizer;

/// Everything one cycle produced. Empty when nobody posted anything new.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digest {
    /// Markup messages, each within the configured length limit.
    pub chunks: Vec<String>,
    pub memes: Vec<Meme>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub struct Pipeline {
    fetcher: Arc<ParallelFetcher>,
    normalizer: Normalizer,
    enricher: Enricher,
    renderer: Arc<dyn MemeRenderer>,
    message_limit: usize,
}

impl Pipeline {
    pub fn new(fetcher: Arc<ParallelFetcher>, message_limit: usize) -> Self {
        Self {
            enricher: Enricher::new(fetcher.clone()),
            fetcher,
            normalizer: Normalizer::new(),
            renderer: Arc::new(PosterOnly),
            message_limit,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MemeRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn run_cycle(&self, users: Vec<String>, max_age_minutes: u64) -> Digest {
        self.run_cycle_at(users, max_age_minutes, Utc::now()).await
    }

    /// Fetch, parse, filter, enrich, format and chunk, with `now` as the
    /// end of the window.
    pub async fn run_cycle_at(
        &self,
        users: Vec<String>,
        max_age_minutes: u64,
        now: DateTime<Utc>,
    ) -> Digest {
        let started = Instant::now();
        let user_count = users.len();

        let responses = self.fetcher.fetch_all(users).await;
        let feeds = self.parse_feeds(responses);

        let cutoff = window::cutoff(now, max_age_minutes);
        let mut feeds = window::retain_new(feeds, cutoff);
        if feeds.is_empty() {
            tracing::info!(
                "No new entries from {} users in {:.1}s",
                user_count,
                started.elapsed().as_secs_f64()
            );
            return Digest::default();
        }

        self.enricher.enrich(&mut feeds).await;

        let blocks = feeds.iter().map(UserFeed::format).collect();
        let chunks = chunker::chunk(blocks, self.message_limit);

        let candidates = memes::select_candidates(&feeds);
        let memes = memes::render_memes(&self.fetcher, self.renderer.as_ref(), candidates).await;

        let entry_count: usize = feeds.iter().map(|f| f.entries.len()).sum();
        tracing::info!(
            "{} new entries from {} of {} users, {} messages, {} memes in {:.1}s",
            entry_count,
            feeds.len(),
            user_count,
            chunks.len(),
            memes.len(),
            started.elapsed().as_secs_f64()
        );

        Digest { chunks, memes }
    }

    fn parse_feeds(&self, responses: Vec<(String, Option<Vec<u8>>)>) -> Vec<UserFeed> {
        responses
            .into_iter()
            .filter_map(|(user, body)| {
                let body = body?;
                match self.normalizer.normalize(&body) {
                    Ok(feed) => Some(feed),
                    Err(e) => {
                        tracing::warn!("Dropping feed of {}: {}", user, e);
                        None
                    }
                }
            })
            .collect()
    }
}
