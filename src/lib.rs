//! # reeldigest
//!
//! Polls Letterboxd RSS feeds for a list of members and posts what they
//! watched, reviewed and listed to a Telegram chat.
//!
//! ## Architecture
//!
//! Each cycle is a pipeline:
//!
//! ```text
//! Fetcher → Normalizer → Window → Enricher → Formatter → Chunker → Transport
//! ```
//!
//! - [`fetcher`]: Concurrent feed and page requests under a connection cap
//! - [`normalizer`]: RSS items to classified movie and list entries
//! - [`digest`]: Time window, chunking and the cycle itself
//! - [`transport`]: Telegram Bot API delivery, or stdout for dry runs
//!
//! ## Quick Start
//!
//! ```bash
//! # Track a member
//! reeldigest users add jane
//!
//! # See what a cycle would send
//! reeldigest once --age 1d --dry-run
//!
//! # Poll every hour
//! reeldigest run --age 1h
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`daemon`]: The polling loop and its administrative commands
//! - [`domain`]: Entries, feeds, ratings and their formatting
//! - [`markup`]: Markup ⇄ plain text with spans
//! - [`memes`]: Meme pictures for extreme ratings

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, HTTP client, parallel fetcher, transport.
pub mod app;

/// Configuration management.
///
/// Loads from `~/.config/reeldigest/config.toml`; the tracked usernames live
/// next to it in `users.txt`.
pub mod config;

/// The long-running digest loop.
///
/// - `>add <name>` / `>remove <name>` - edit the tracked users
/// - `>age <minutes>` - change the window and restart the loop
/// - `ping` - replies `pong`
pub mod daemon;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `run [--age] [--dry-run]` - Poll forever
/// - `once [--age] [--dry-run]` - Run one cycle
/// - `users list|add|remove` - Manage tracked users
pub mod cli;

/// One polling cycle.
///
/// - [`window`](digest::window): Keeps entries newer than the cutoff
/// - [`chunker`](digest::chunker): Packs user blocks into messages
/// - [`Pipeline`](digest::Pipeline): Fetch to chunks in one call
pub mod digest;

/// Core domain models.
///
/// - [`LogEntry`](domain::LogEntry): A film log or a new list
/// - [`UserFeed`](domain::UserFeed): One member's entries
/// - [`Rating`](domain::Rating): Half-star ratings with their stars and emoji
pub mod domain;

/// Secondary page fetches for liked state and list sizes.
pub mod enricher;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for a single request
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Concurrent fetching with semaphore
pub mod fetcher;

/// Conversion between Telegram-style HTML and text with formatting spans.
pub mod markup;

pub mod memes;

/// Feed parsing and normalization.
///
/// Converts Letterboxd RSS 2.0 (with its `letterboxd:` extensions) into
/// [`UserFeed`](domain::UserFeed)s.
pub mod normalizer;

/// Digest delivery.
///
/// - [`Transport`](transport::Transport): Async trait for delivery
/// - [`TelegramTransport`](transport::TelegramTransport): Bot API `sendMessage`/`sendPhoto`
/// - [`ConsoleTransport`](transport::ConsoleTransport): Prints to stdout
pub mod transport;
