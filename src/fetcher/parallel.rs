use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::fetcher::Fetcher;

pub const DEFAULT_CONNECTIONS: usize = 25;

/// Fans requests out over a shared [`Fetcher`], never exceeding the
/// configured number of requests in flight.
pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
    host: String,
}

impl ParallelFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, host: &str) -> Self {
        Self::with_connections(fetcher, host, DEFAULT_CONNECTIONS)
    }

    pub fn with_connections(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        host: &str,
        connections: usize,
    ) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(connections.max(1))),
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn feed_url(&self, username: &str) -> String {
        format!("{}/{}/rss/", self.host, username)
    }

    /// Fetch every user's feed.
    ///
    /// Users are shuffled before dispatch; the result keeps that order and
    /// pairs each user with their body, or `None` if the request failed.
    pub async fn fetch_all(&self, mut usernames: Vec<String>) -> Vec<(String, Option<Vec<u8>>)> {
        usernames.shuffle(&mut rand::thread_rng());

        let urls = usernames.iter().map(|u| self.feed_url(u)).collect();
        let bodies = self.fetch_urls(urls).await;

        usernames.into_iter().zip(bodies).collect()
    }

    /// Fetch arbitrary URLs. `result[i]` belongs to `urls[i]`.
    ///
    /// Dropping the returned future aborts every request still pending.
    pub async fn fetch_urls(&self, urls: Vec<String>) -> Vec<Option<Vec<u8>>> {
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };

                match fetcher.fetch(&url).await {
                    Ok(body) => Some(body),
                    Err(e) => {
                        tracing::warn!("Failed to fetch {}: {}", url, e);
                        None
                    }
                }
            });

            handles.push(AbortOnDrop(handle));
        }

        join_all(handles.iter_mut().map(|guard| &mut guard.0))
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    tracing::error!("Task join error: {}", e);
                    None
                })
            })
            .collect()
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::app::{DigestError, Result};

    /// Echoes the URL back, failing for any URL containing `fail_on`.
    struct EchoFetcher {
        fail_on: &'static str,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EchoFetcher {
        fn new(fail_on: &'static str) -> Self {
            Self {
                fail_on,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for EchoFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains(self.fail_on) {
                return Err(DigestError::Status {
                    url: url.to_string(),
                    status: 500,
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_feed_url() {
        let fetcher = ParallelFetcher::new(Arc::new(EchoFetcher::new("-")), "https://letterboxd.com/");
        assert_eq!(fetcher.feed_url("jane"), "https://letterboxd.com/jane/rss/");
    }

    #[tokio::test]
    async fn test_fetch_urls_keeps_positions() {
        let fetcher = ParallelFetcher::new(Arc::new(EchoFetcher::new("/b/")), "https://x.org");
        let urls = ["a", "b", "c"].map(|u| fetcher.feed_url(u)).to_vec();

        let results = fetcher.fetch_urls(urls).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref(), Some(&b"https://x.org/a/rss/"[..]));
        assert!(results[1].is_none());
        assert_eq!(results[2].as_deref(), Some(&b"https://x.org/c/rss/"[..]));
    }

    #[tokio::test]
    async fn test_fetch_all_pairs_users_with_bodies() {
        let fetcher = ParallelFetcher::new(Arc::new(EchoFetcher::new("/b/")), "https://x.org");
        let users = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let results = fetcher.fetch_all(users).await;

        assert_eq!(results.len(), 3);
        for (user, body) in results {
            if user == "b" {
                assert!(body.is_none());
            } else {
                let expected = format!("https://x.org/{}/rss/", user);
                assert_eq!(body.as_deref(), Some(expected.as_bytes()));
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_all_shuffles_dispatch_order() {
        let fetcher = ParallelFetcher::new(Arc::new(EchoFetcher::new("-")), "https://x.org");
        let users: Vec<String> = (0..12).map(|i| format!("user{i}")).collect();

        let mut reordered = false;
        for _ in 0..3 {
            let order: Vec<String> = fetcher
                .fetch_all(users.clone())
                .await
                .into_iter()
                .map(|(user, _)| user)
                .collect();

            let mut sorted = order.clone();
            sorted.sort_by_key(|u| u[4..].parse::<u32>().unwrap());
            assert_eq!(sorted, users);
            reordered |= order != users;
        }
        assert!(reordered);
    }

    /// Counts requests that ran to completion.
    struct SlowFetcher {
        completed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(url.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_dropped_batch_aborts_pending_requests() {
        let completed = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(SlowFetcher {
            completed: completed.clone(),
        });
        let fetcher = ParallelFetcher::with_connections(slow, "https://x.org", 2);
        let urls = (0..4).map(|i| format!("https://x.org/{i}")).collect();

        let batch = tokio::time::timeout(Duration::from_millis(50), fetcher.fetch_urls(urls)).await;
        assert!(batch.is_err());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.semaphore.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_connection_cap_respected() {
        let echo = Arc::new(EchoFetcher::new("never"));
        let fetcher = ParallelFetcher::with_connections(echo.clone(), "https://x.org", 3);
        let urls = (0..12).map(|i| format!("https://x.org/{i}")).collect();

        let results = fetcher.fetch_urls(urls).await;

        assert!(results.iter().all(Option::is_some));
        assert!(echo.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_fetch_all_empty() {
        let fetcher = ParallelFetcher::new(Arc::new(EchoFetcher::new("-")), "https://x.org");
        assert!(fetcher.fetch_all(Vec::new()).await.is_empty());
    }
}
