use std::io::Write;

use crate::app::{AppContext, FeedmeError, Result};
use crate::domain::comment::flatten;
use crate::domain::Item;
use crate::source::{self, ROSTER};
use crate::tui::text::{clean_html, story_meta, wrap_text};

const WIDTH: usize = 80;

pub async fn list_stories(ctx: &AppContext, limit: usize, out: &mut impl Write) -> Result<()> {
    let source = ctx.source.as_ref();
    let ids = source.fetch_story_ids(&ctx.feed).await?;

    let mut stories: Vec<Item> = Vec::new();
    for chunk in ids.chunks(ctx.batch_size()) {
        if stories.len() >= limit {
            break;
        }
        stories.extend(source::load_stories(source, chunk).await?);
    }
    stories.truncate(limit);

    writeln!(
        out,
        "{} - {}",
        source.name(),
        source.feed_label(&ctx.feed).unwrap_or(ctx.feed.as_str())
    )?;
    if stories.is_empty() {
        writeln!(out, "No stories")?;
        return Ok(());
    }

    for (i, story) in stories.iter().enumerate() {
        let domain = story.domain();
        if domain.is_empty() {
            writeln!(out, "{:>3}. {}", i + 1, story.title)?;
        } else {
            writeln!(out, "{:>3}. {} ({})", i + 1, story.title, domain)?;
        }
        writeln!(out, "     {}", story_meta(story))?;
    }

    Ok(())
}

/// Print story `n` (1-based, in feed order) followed by its comment thread.
pub async fn show_comments(
    ctx: &AppContext,
    n: usize,
    depth: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let source = ctx.source.as_ref();
    let ids = source.fetch_story_ids(&ctx.feed).await?;
    let id = n
        .checked_sub(1)
        .and_then(|i| ids.get(i))
        .copied()
        .ok_or_else(|| {
            FeedmeError::Other(format!(
                "Story {} is out of range; the feed has {} stories",
                n,
                ids.len()
            ))
        })?;

    let story = source.fetch_item(id).await?;
    writeln!(out, "{}", story.title)?;
    writeln!(out, "{}", source.story_url(&story))?;
    writeln!(out, "{}", story_meta(&story))?;
    if !story.text.is_empty() {
        writeln!(out)?;
        for line in wrap_text(&clean_html(&story.text), WIDTH) {
            writeln!(out, "{}", line)?;
        }
    }
    writeln!(out)?;

    let depth = depth.unwrap_or_else(|| ctx.comment_depth());
    let tree = source.fetch_comment_tree(&story, depth).await?;
    if tree.is_empty() {
        writeln!(out, "No comments")?;
        return Ok(());
    }

    for comment in flatten(&tree) {
        let indent = "  ".repeat(comment.depth);
        writeln!(out, "{}{} {}", indent, comment.by, comment.time_ago())?;
        let width = WIDTH.saturating_sub(indent.len()).max(20);
        for line in wrap_text(&clean_html(&comment.text), width) {
            writeln!(out, "{}{}", indent, line)?;
        }
        writeln!(out)?;
    }

    Ok(())
}

pub fn list_feeds(ctx: &AppContext, out: &mut impl Write) -> Result<()> {
    let source = ctx.source.as_ref();
    writeln!(out, "{}", source.name())?;
    for (name, label) in source.feed_names().iter().zip(source.feed_labels()) {
        let marker = if *name == ctx.feed { "*" } else { " " };
        writeln!(out, "{} {:<12} {}", marker, name, label)?;
    }
    Ok(())
}

pub fn list_sources(out: &mut impl Write) -> Result<()> {
    for (key, description) in ROSTER {
        writeln!(out, "{:<10} {}", key, description)?;
    }
    Ok(())
}
