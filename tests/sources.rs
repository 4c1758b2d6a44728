use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedme::app::FeedmeError;
use feedme::domain::comment::flatten;
use feedme::domain::Comment;
use feedme::fetcher::HttpFetcher;
use feedme::source::{
    load_stories, DevtoSource, HackerNewsSource, LobstersSource, NewsProvider, NewsSource,
    RedditSource, RssSource, Source,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast_fetcher() -> HttpFetcher {
    HttpFetcher::new("feedme-test")
        .unwrap()
        .throttled(Duration::from_millis(1))
        .retry_backoff(Duration::from_millis(1))
}

async fn serve(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

fn json_body(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(value)
}

fn html_body(html: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(html)
}

fn max_depth(roots: &[Comment]) -> usize {
    flatten(roots).iter().map(|c| c.depth).max().unwrap_or(0)
}

#[tokio::test]
async fn hacker_news_listing_and_comments() {
    let server = MockServer::start().await;
    serve(&server, "/topstories.json", json_body(json!([1, 2, 3]))).await;
    serve(
        &server,
        "/item/1.json",
        json_body(json!({"id": 1, "type": "story", "title": "Launch", "by": "pg",
                         "score": 50, "kids": [10, 11], "descendants": 3})),
    )
    .await;
    serve(&server, "/item/2.json", json_body(Value::Null)).await;
    serve(
        &server,
        "/item/3.json",
        json_body(json!({"id": 3, "type": "story", "title": "Flagged", "dead": true})),
    )
    .await;
    serve(
        &server,
        "/item/10.json",
        json_body(json!({"id": 10, "type": "comment", "by": "a", "text": "root", "kids": [12]})),
    )
    .await;
    serve(
        &server,
        "/item/11.json",
        json_body(json!({"id": 11, "type": "comment", "deleted": true})),
    )
    .await;
    serve(
        &server,
        "/item/12.json",
        json_body(json!({"id": 12, "type": "comment", "by": "b", "text": "reply", "kids": [13]})),
    )
    .await;
    serve(
        &server,
        "/item/13.json",
        json_body(json!({"id": 13, "type": "comment", "by": "c", "text": "deep"})),
    )
    .await;

    let hn = HackerNewsSource::new(TIMEOUT, 4)
        .unwrap()
        .with_base_url(&server.uri());

    let ids = hn.fetch_story_ids("topstories").await.unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    match hn.fetch_items(&ids).await {
        Err(FeedmeError::PartialBatch { items, first }) => {
            assert_eq!(items.len(), 3);
            assert_eq!(items[0].as_ref().unwrap().title, "Launch");
            assert!(items[1].is_none());
            assert!(first.is_not_found());
        }
        other => panic!("expected a partial batch, got {:?}", other.map(|v| v.len())),
    }

    let stories = load_stories(&hn, &ids).await.unwrap();
    assert_eq!(stories.len(), 1, "missing and dead stories are skipped");

    let story = hn.fetch_item(1).await.unwrap();
    let full = hn.fetch_comment_tree(&story, 0).await.unwrap();
    assert_eq!(full.len(), 1, "deleted comments are hidden");
    assert_eq!(full[0].count(), 3);
    assert_eq!(max_depth(&full), 2);

    let limited = hn.fetch_comment_tree(&story, 1).await.unwrap();
    assert_eq!(limited[0].count(), 2);
    assert_eq!(max_depth(&limited), 1);

    assert_eq!(hn.story_url(&story), "https://news.ycombinator.com/item?id=1");
}

fn lobsters_listing(stories: &[(&str, &str)]) -> String {
    let rows: String = stories
        .iter()
        .map(|(short_id, title)| {
            format!(
                r#"<li class="story" data-shortid="{short_id}">
                     <span class="link"><a class="u-url" href="https://example.com/{short_id}">{title}</a></span>
                     <div class="byline"><a class="u-author" href="/~alice">alice</a></div>
                   </li>"#
            )
        })
        .collect();
    format!(r#"<html><body><ol class="stories">{}</ol></body></html>"#, rows)
}

#[tokio::test]
async fn lobsters_keeps_first_page_when_second_fails() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        html_body(lobsters_listing(&[("aaa111", "One"), ("bbb222", "Two")])),
    )
    .await;
    serve(&server, "/page/2", ResponseTemplate::new(500)).await;

    let lobsters = LobstersSource::new(TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let ids = lobsters.fetch_story_ids("hottest").await.unwrap();
    assert_eq!(ids, vec![1, 2]);
    let story = lobsters.fetch_item(2).await.unwrap();
    assert_eq!(story.title, "Two");
    assert_eq!(story.kind, "bbb222");
    assert_eq!(
        lobsters.story_url(&story),
        format!("{}/s/bbb222", server.uri())
    );
}

#[tokio::test]
async fn lobsters_first_page_failure_is_an_error() {
    let server = MockServer::start().await;
    serve(&server, "/newest", ResponseTemplate::new(502)).await;

    let lobsters = LobstersSource::new(TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let err = lobsters.fetch_story_ids("newest").await.unwrap_err();
    assert!(matches!(err, FeedmeError::Status { status: 502, .. }));
}

#[tokio::test]
async fn refetching_a_listing_invalidates_old_ids() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        html_body(lobsters_listing(&[
            ("aaa111", "One"),
            ("bbb222", "Two"),
            ("ccc333", "Three"),
        ])),
    )
    .await;
    serve(&server, "/page/2", html_body(lobsters_listing(&[]))).await;
    serve(&server, "/newest", html_body(lobsters_listing(&[("zzz999", "Fresh")]))).await;
    serve(&server, "/newest/page/2", html_body(lobsters_listing(&[]))).await;

    let lobsters = LobstersSource::new(TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let first = lobsters.fetch_story_ids("hottest").await.unwrap();
    assert_eq!(first.len(), 3);
    let second = lobsters.fetch_story_ids("newest").await.unwrap();
    assert_eq!(second, vec![1]);

    assert!(lobsters.fetch_item(3).await.unwrap_err().is_not_found());
    assert_eq!(lobsters.fetch_item(1).await.unwrap().title, "Fresh");

    let slots = lobsters.fetch_items(&[1, 2, 3]).await.unwrap();
    assert_eq!(slots.len(), 3);
    assert!(slots[1].is_none() && slots[2].is_none());
}

/// A single chain of replies `levels` deep.
fn reply_chain(depth: usize, levels: usize) -> Value {
    let replies = if depth + 1 < levels {
        json!({"kind": "Listing", "data": {"children": [reply_chain(depth + 1, levels)]}})
    } else {
        json!("")
    };
    json!({
        "kind": "t1",
        "data": {
            "id": format!("c{}", depth),
            "author": format!("user{}", depth),
            "body": format!("level {}", depth),
            "score": 1,
            "created_utc": 1_700_000_000.0,
            "replies": replies
        }
    })
}

#[tokio::test]
async fn reddit_comment_depth_is_limited() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/r/rust/hot.json",
        json_body(json!({"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {"id": "p1", "title": "A post", "author": "op",
             "score": 7, "url": "https://example.com/p", "num_comments": 6,
             "permalink": "/r/rust/comments/p1/a_post/", "created_utc": 1_700_000_000.0}}
        ]}})),
    )
    .await;
    serve(
        &server,
        "/r/rust/comments/p1/a_post.json",
        json_body(json!([
            {"kind": "Listing", "data": {"children": []}},
            {"kind": "Listing", "data": {"children": [
                reply_chain(0, 6),
                {"kind": "t1", "data": {"id": "gone", "author": "[deleted]", "body": "x"}},
                {"kind": "more", "data": {"count": 12}}
            ]}}
        ])),
    )
    .await;

    let reddit = RedditSource::new("r/rust", TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let ids = reddit.fetch_story_ids("hot").await.unwrap();
    let post = reddit.fetch_item(ids[0]).await.unwrap();
    assert_eq!(post.kind, "/r/rust/comments/p1/a_post/");

    let all = reddit.fetch_comment_tree(&post, 0).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(max_depth(&all), 5);

    let limited = reddit.fetch_comment_tree(&post, 2).await.unwrap();
    let flat = flatten(&limited);
    assert_eq!(flat.len(), 3);
    assert!(flat.iter().all(|c| c.depth <= 2));
    assert_eq!(flat[2].by, "user2");
}

#[tokio::test]
async fn devto_articles_and_threads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("state", "fresh"))
        .respond_with(json_body(json!([
            {"id": 77, "title": "Borrowing", "url": "https://dev.to/ana/borrowing",
             "path": "/ana/borrowing", "public_reactions_count": 3, "comments_count": 2,
             "tag_list": ["rust"], "user": {"username": "ana"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/comments"))
        .and(query_param("a_id", "77"))
        .respond_with(json_body(json!([
            {"id_code": "x1", "body_html": "<p>Nice</p>", "user": {"username": "ben"},
             "children": [
                {"id_code": "x2", "body_html": "<p>Thanks</p>", "user": {"username": "ana"}, "children": []},
                {"id_code": "x3", "body_html": "", "user": {"username": ""}, "children": []}
             ]}
        ])))
        .mount(&server)
        .await;

    let dev = DevtoSource::new(TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let ids = dev.fetch_story_ids("latest").await.unwrap();
    let article = dev.fetch_item(ids[0]).await.unwrap();
    assert_eq!(article.id, 77);
    assert_eq!(article.text, "[rust]");

    let thread = dev.fetch_comment_tree(&article, 0).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].by, "ben");
    assert_eq!(thread[0].children.len(), 1, "entries without a user are skipped");
    assert_eq!(thread[0].children[0].depth, 1);

    assert_eq!(dev.story_url(&article), format!("{}/ana/borrowing", server.uri()));
}

#[tokio::test]
async fn reddit_drops_untitled_posts() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/r/rust/new.json",
        json_body(json!({"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {"id": "g1", "title": "Good", "author": "op",
             "permalink": "/r/rust/comments/g1/good/"}},
            {"kind": "t3", "data": {"id": "b1", "title": "", "author": "op",
             "permalink": "/r/rust/comments/b1/blank/"}}
        ]}})),
    )
    .await;

    let reddit = RedditSource::new("rust", TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let ids = reddit.fetch_story_ids("new").await.unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(reddit.fetch_item(ids[0]).await.unwrap().title, "Good");
}

#[tokio::test]
async fn devto_drops_untitled_articles() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/api/articles",
        json_body(json!([
            {"id": 1, "title": "Good", "path": "/a/good", "user": {"username": "a"}},
            {"id": 2, "title": "  ", "path": "/a/blank", "user": {"username": "a"}}
        ])),
    )
    .await;

    let dev = DevtoSource::new(TIMEOUT)
        .unwrap()
        .with_fetcher(fast_fetcher())
        .with_base_url(&server.uri());

    let ids = dev.fetch_story_ids("top").await.unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(dev.fetch_item(ids[0]).await.unwrap().id, 1);
}

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>An Atom Blog</title>
  <id>urn:uuid:feed</id>
  <updated>2024-03-01T12:00:00Z</updated>
  <entry>
    <title>Hello Atom</title>
    <id>urn:uuid:entry-1</id>
    <link rel="alternate" href="https://blog.example/hello"/>
    <updated>2024-03-01T12:00:00Z</updated>
    <author><name>Ada</name></author>
    <summary>First &lt;b&gt;post&lt;/b&gt;</summary>
  </entry>
</feed>"#;

#[tokio::test]
async fn feed_that_is_not_rss_falls_back_to_atom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/atom+xml")
                .set_body_string(ATOM),
        )
        .expect(2)
        .mount(&server)
        .await;

    let source = RssSource::new(&format!("{}/feed", server.uri()), TIMEOUT).unwrap();
    assert_eq!(source.name(), "127.0.0.1");

    let ids = source.fetch_story_ids("feed").await.unwrap();
    let item = source.fetch_item(ids[0]).await.unwrap();
    assert_eq!(item.title, "Hello Atom");
    assert_eq!(item.url, "https://blog.example/hello");
    assert_eq!(item.by, "Ada");
    assert_eq!(source.name(), "An Atom Blog");
    assert!(source.fetch_comment_tree(&item, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn garbage_feed_is_an_error() {
    let server = MockServer::start().await;
    serve(&server, "/feed", html_body("<html>not a feed</html>".to_string())).await;

    let source = RssSource::new(&format!("{}/feed", server.uri()), TIMEOUT).unwrap();
    assert!(source.fetch_story_ids("feed").await.is_err());
}

#[tokio::test]
async fn news_provider_feeds_keep_their_paths() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/news/world/rss.xml",
        html_body(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>BBC World</title>
               <item><title>Headline</title><link>https://www.bbc.com/news/1</link>
               <guid>https://www.bbc.com/news/1</guid></item>
               <item><title>   </title><link>https://www.bbc.com/news/2</link></item>
               </channel></rss>"#
                .to_string(),
        ),
    )
    .await;

    let bbc = NewsProvider::lookup("bbc").unwrap();
    let source = NewsSource::new(bbc, TIMEOUT)
        .unwrap()
        .with_base_url(&server.uri());

    let ids = source.fetch_story_ids("world").await.unwrap();
    assert_eq!(ids, vec![1], "title-less entries are dropped");
    let item = source.fetch_item(1).await.unwrap();
    assert_eq!(item.title, "Headline");
    assert_eq!(source.story_url(&item), "https://www.bbc.com/news/1");

    let err = source.fetch_story_ids("sports-ish").await.unwrap_err();
    assert!(matches!(err, FeedmeError::UnknownFeed(_)));
}
