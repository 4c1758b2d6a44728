pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedme", version)]
#[command(about = "A terminal reader for news aggregators and feeds", long_about = None)]
pub struct Cli {
    /// Source to read: hn, lobsters, tildes, ~group, r/<subreddit>, devto,
    /// ap, bbc, npr, google, reuters, guardian, or an RSS/Atom URL
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Feed to start on (defaults to the source's first feed)
    #[arg(short, long, global = true)]
    pub feed: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the TUI (default)
    Tui,
    /// Print the stories of a feed
    List {
        /// Number of stories to print
        #[arg(short, long, default_value_t = 30)]
        limit: usize,
    },
    /// Print the comment thread of a story
    Comments {
        /// Position of the story in the feed, starting at 1
        n: usize,

        /// Maximum depth (0 = unlimited, default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// List the feeds of the source
    Feeds,
    /// List the available sources
    Sources,
}
