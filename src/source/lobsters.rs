use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::{comment, Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::markup::{self, selector};
use crate::source::{check_feed, hash_short_id, Source, StoryCache};

pub const BASE_URL: &str = "https://lobste.rs";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; feedme/1.0)";
const MIN_DELAY: Duration = Duration::from_millis(500);
const PAGES: u32 = 2;

const FEED_NAMES: &[&str] = &["hottest", "newest", "recent"];
const FEED_LABELS: &[&str] = &["Hot", "New", "Recent"];

static STORY: Lazy<Selector> = Lazy::new(|| selector("ol.stories > li.story"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| selector("a.u-url"));
static FALLBACK_LINK: Lazy<Selector> = Lazy::new(|| selector(".link a"));
static SCORE: Lazy<Selector> = Lazy::new(|| selector(".voters a.upvoter, .voters .score"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| selector(".byline a.u-author"));
static USER_LINK: Lazy<Selector> = Lazy::new(|| selector(".byline a[href^='/~']"));
static TIME: Lazy<Selector> = Lazy::new(|| selector(".byline time"));
static COMMENT_COUNT: Lazy<Selector> = Lazy::new(|| selector(".comments_label"));
static TAG: Lazy<Selector> = Lazy::new(|| selector(".tags a.tag"));
static COMMENT: Lazy<Selector> = Lazy::new(|| selector("div.comment[data-shortid]"));
static COMMENT_TEXT: Lazy<Selector> = Lazy::new(|| selector(".comment_text"));
static COMMENT_LIST: Lazy<Selector> = Lazy::new(|| selector("ol.comments"));

/// Lobsters, scraped from its HTML pages.
///
/// Stories get pseudo-ids; the short id (e.g. `abc123`) is kept in
/// `Item::kind` and names the thread at `/s/<short id>`.
pub struct LobstersSource {
    fetcher: HttpFetcher,
    cache: StoryCache,
    base_url: String,
}

impl LobstersSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.throttled(MIN_DELAY),
            cache: StoryCache::new(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_fetcher(mut self, fetcher: HttpFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    fn page_url(&self, feed: &str, page: u32) -> String {
        let path = if feed == "hottest" { "" } else { feed };
        match (path.is_empty(), page) {
            (true, 1) => self.base_url.clone(),
            (true, n) => format!("{}/page/{}", self.base_url, n),
            (false, 1) => format!("{}/{}", self.base_url, path),
            (false, n) => format!("{}/{}/page/{}", self.base_url, path, n),
        }
    }

    async fn fetch_page(&self, feed: &str, page: u32) -> Result<Vec<Item>> {
        let body = self.fetcher.fetch(&self.page_url(feed, page)).await?;
        Ok(parse_stories(&String::from_utf8_lossy(&body), &self.base_url))
    }
}

pub fn parse_stories(html: &str, base_url: &str) -> Vec<Item> {
    let doc = Html::parse_document(html);
    doc.select(&STORY)
        .filter_map(|el| parse_story(el, base_url))
        .collect()
}

fn parse_story(el: ElementRef<'_>, base_url: &str) -> Option<Item> {
    let link = markup::first(el, &TITLE_LINK).or_else(|| markup::first(el, &FALLBACK_LINK))?;
    let title = markup::text_of(link);
    if title.is_empty() {
        return None;
    }

    let mut item = Item {
        title,
        url: link
            .value()
            .attr("href")
            .map(|href| markup::absolutize(base_url, href))
            .unwrap_or_default(),
        time: markup::time_of(el, &TIME),
        ..Default::default()
    };

    if let Some(short_id) = el.value().attr("data-shortid") {
        item.id = hash_short_id(short_id);
        item.kind = short_id.to_string();
    }
    item.score = markup::first_text(el, &SCORE)
        .and_then(|s| markup::exact_number(&s))
        .unwrap_or(0);
    item.by = markup::first_text(el, &AUTHOR)
        .or_else(|| markup::first_text(el, &USER_LINK))
        .unwrap_or_default();
    item.descendants = markup::first_text(el, &COMMENT_COUNT)
        .and_then(|s| markup::first_number(&s))
        .unwrap_or(0) as u32;

    let tags: Vec<String> = el
        .select(&TAG)
        .map(markup::text_of)
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        item.text = format!("[{}]", tags.join(", "));
    }

    Some(item)
}

/// Comments in page order, nested by counting enclosing `ol.comments`.
pub fn parse_comments(html: &str, max_depth: usize) -> Vec<Comment> {
    let doc = Html::parse_document(html);
    let flat = doc
        .select(&COMMENT)
        .filter_map(|el| {
            let item = Item {
                id: el.value().attr("data-shortid").map(hash_short_id).unwrap_or(0),
                kind: "comment".to_string(),
                by: markup::first_text(el, &USER_LINK).unwrap_or_default(),
                text: markup::first(el, &COMMENT_TEXT)
                    .map(|t| t.inner_html().trim().to_string())
                    .unwrap_or_default(),
                time: markup::time_of(el, &TIME),
                score: markup::first_text(el, &SCORE)
                    .and_then(|s| markup::exact_number(&s))
                    .unwrap_or(0),
                ..Default::default()
            };
            if item.by.is_empty() && item.text.is_empty() {
                return None;
            }
            Some(Comment::new(
                item,
                markup::markup_depth(el, "data-depth", &COMMENT_LIST),
            ))
        })
        .collect();

    comment::assemble(flat, max_depth)
}

#[async_trait]
impl Source for LobstersSource {
    fn name(&self) -> String {
        "Lobsters".to_string()
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS
    }

    #[instrument(skip(self))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        check_feed(FEED_NAMES, feed)?;

        let mut stories = Vec::new();
        for page in 1..=PAGES {
            match self.fetch_page(feed, page).await {
                Ok(items) => stories.extend(items),
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Stopping pagination early");
                    break;
                }
            }
        }

        if stories.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = stories.len(), "Fetched stories");
        Ok(self.cache.replace(stories))
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        self.cache.get(id)
    }

    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        Ok(self.cache.get_many(ids))
    }

    #[instrument(skip(self, item), fields(thread = %item.kind))]
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>> {
        if item.kind.is_empty() || item.kind == "story" {
            return Err(FeedmeError::MissingThread(item.id));
        }
        let url = format!("{}/s/{}", self.base_url, item.kind);
        let body = self.fetcher.fetch(&url).await?;
        Ok(parse_comments(&String::from_utf8_lossy(&body), max_depth))
    }

    fn story_url(&self, item: &Item) -> String {
        if item.kind.is_empty() || item.kind == "story" {
            item.url.clone()
        } else {
            format!("{}/s/{}", self.base_url, item.kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::timefmt;

    const LISTING: &str = r#"
        <html><body><ol class="stories list">
          <li id="story_abc123" data-shortid="abc123" class="story">
            <div class="story_liner">
              <div class="voters"><a class="upvoter" href="/login">42</a></div>
              <div class="details">
                <span class="link h-cite u-repost-of">
                  <a class="u-url" href="https://example.com/post">An Example Post</a>
                </span>
                <span class="tags"><a class="tag tag_rust" href="/t/rust">rust</a>
                  <a class="tag tag_pl" href="/t/programming">programming</a></span>
                <div class="byline">
                  <a class="u-author h-card" href="/~alice">alice</a>
                  <time title="2024-01-15 10:30:00 -0600" datetime="2024-01-15T10:30:00-06:00">3 hours ago</time>
                  <span class="comments_label"><a href="/s/abc123/an_example_post">12 comments</a></span>
                </div>
              </div>
            </div>
          </li>
          <li id="story_def456" data-shortid="def456" class="story">
            <div class="details">
              <span class="link"><a class="u-url" href="/s/def456/ask"></a></span>
              <div class="byline"><a href="/~bob">bob</a></div>
            </div>
          </li>
          <li data-shortid="ghi789" class="story">
            <div class="details">
              <span class="link"><a href="/s/ghi789/self_post">Ask Lobsters: hello</a></span>
              <div class="byline"><a href="/~carol">carol</a>
                <time title="nonsense">2 days ago</time>
                <span class="comments_label"><a href="/s/ghi789">discuss</a></span>
              </div>
            </div>
          </li>
        </ol></body></html>"#;

    const THREAD: &str = r#"
        <html><body>
        <ol class="comments comments1">
          <li class="comments_subtree">
            <div class="comment" data-shortid="c1">
              <div class="details">
                <div class="byline"><a href="/~dave">dave</a> <time datetime="2024-01-15T11:00:00Z">1 hour ago</time></div>
                <div class="comment_text"><p>First!</p></div>
              </div>
            </div>
            <ol class="comments">
              <li class="comments_subtree">
                <div class="comment" data-shortid="c2">
                  <div class="byline"><a href="/~erin">erin</a></div>
                  <div class="comment_text"><p>Reply</p></div>
                </div>
                <ol class="comments">
                  <li class="comments_subtree">
                    <div class="comment" data-shortid="c3">
                      <div class="byline"><a href="/~frank">frank</a></div>
                      <div class="comment_text"><p>Deeper</p></div>
                    </div>
                  </li>
                </ol>
              </li>
            </ol>
          </li>
          <li class="comments_subtree">
            <div class="comment" data-shortid="c4">
              <div class="byline"><a href="/~gina">gina</a></div>
              <div class="comment_text">Second root</div>
            </div>
          </li>
        </ol>
        </body></html>"#;

    #[test]
    fn test_parse_stories_extracts_fields() {
        let stories = parse_stories(LISTING, BASE_URL);
        assert_eq!(stories.len(), 2, "title-less story is dropped");

        let first = &stories[0];
        assert_eq!(first.title, "An Example Post");
        assert_eq!(first.url, "https://example.com/post");
        assert_eq!(first.kind, "abc123");
        assert_eq!(first.id, hash_short_id("abc123"));
        assert_eq!(first.score, 42);
        assert_eq!(first.by, "alice");
        assert_eq!(first.descendants, 12);
        assert_eq!(first.text, "[rust, programming]");
        assert_eq!(first.time, 1_705_336_200);
    }

    #[test]
    fn test_parse_stories_fallbacks() {
        let stories = parse_stories(LISTING, BASE_URL);
        let second = &stories[1];
        assert_eq!(second.title, "Ask Lobsters: hello");
        assert_eq!(second.url, "https://lobste.rs/s/ghi789/self_post");
        assert_eq!(second.by, "carol");
        assert_eq!(second.descendants, 0);
        let expected = timefmt::now() - 2 * 86_400;
        assert!((second.time - expected).abs() <= 2);
    }

    #[test]
    fn test_parse_comments_nests_by_markup() {
        let tree = parse_comments(THREAD, 0);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].by, "dave");
        assert_eq!(tree[0].depth, 0);
        assert_eq!(tree[0].text, "<p>First!</p>");
        assert_eq!(tree[0].children[0].by, "erin");
        assert_eq!(tree[0].children[0].depth, 1);
        assert_eq!(tree[0].children[0].children[0].depth, 2);
        assert_eq!(tree[1].by, "gina");
        assert_eq!(tree[1].depth, 0);
    }

    #[test]
    fn test_parse_comments_depth_limit() {
        let tree = parse_comments(THREAD, 1);
        assert_eq!(tree[0].max_depth(), 1);
        assert!(tree[0].children[0].children.is_empty());
    }

    #[test]
    fn test_story_url_uses_short_id() {
        let source = LobstersSource::new(Duration::from_secs(1)).unwrap();
        let item = Item {
            kind: "abc123".into(),
            url: "https://example.com".into(),
            ..Default::default()
        };
        assert_eq!(source.story_url(&item), "https://lobste.rs/s/abc123");
        let bare = Item {
            url: "https://example.com".into(),
            ..Default::default()
        };
        assert_eq!(source.story_url(&bare), "https://example.com");
    }

    #[test]
    fn test_page_urls() {
        let source = LobstersSource::new(Duration::from_secs(1)).unwrap();
        assert_eq!(source.page_url("hottest", 1), "https://lobste.rs");
        assert_eq!(source.page_url("hottest", 2), "https://lobste.rs/page/2");
        assert_eq!(source.page_url("newest", 1), "https://lobste.rs/newest");
        assert_eq!(source.page_url("newest", 2), "https://lobste.rs/newest/page/2");
    }

    #[tokio::test]
    async fn test_missing_thread() {
        let source = LobstersSource::new(Duration::from_secs(1)).unwrap();
        let err = source
            .fetch_comment_tree(&Item::default(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedmeError::MissingThread(0)));
    }
}
