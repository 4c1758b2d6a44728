//! # feedme
//!
//! A terminal reader for link aggregators, community forums and news feeds.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Source adapters → Item / Comment → TUI or CLI
//! ```
//!
//! Every provider implements the [`Source`](source::Source) contract, so
//! the interfaces never see a provider-specific type.
//!
//! ## Quick Start
//!
//! ```bash
//! # Browse Hacker News
//! feedme
//!
//! # Browse a subreddit
//! feedme -s r/rust
//!
//! # Print the newest Lobsters stories
//! feedme -s lobsters --feed newest list --limit 10
//!
//! # Print the comments of the third Tildes topic
//! feedme -s tildes comments 3
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct holds the loaded config, the
/// opened source and the starting feed.
pub mod app;

/// Command-line interface using clap.
///
/// - `tui` - Launch the TUI (default)
/// - `list [--limit N]` - Print stories
/// - `comments <n> [--depth D]` - Print a comment thread
/// - `feeds` - List the feeds of a source
/// - `sources` - List the available sources
pub mod cli;

/// Configuration management for the TUI.
///
/// Loads from `~/.config/feedme/config.toml`, supporting:
/// - General and network settings
/// - Custom colors (named or hex)
/// - Custom keybindings
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): stories and comment bodies
/// - [`Comment`](domain::Comment): comment tree nodes
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for GET requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation with optional throttling
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Bounded concurrent lookups
pub mod fetcher;

/// The content contract and one adapter per provider.
pub mod source;

/// Terminal user interface built with ratatui.
///
/// A story list with feed tabs and a comment view. Fetches run on
/// background tasks so the interface never blocks.
pub mod tui;

/// Release update check.
pub mod update;
