use crate::domain::{Comment, Item, ItemId};
use crate::tui::event::{Action, Message};

pub const PAGE_SIZE: usize = 10;
/// Fetch the next batch once the cursor is this close to the last story.
pub const LOAD_MORE_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Stories,
    Comments,
}

/// Work the event loop should start on the app's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    StoryIds { feed: &'static str, generation: u64 },
    Stories { ids: Vec<ItemId>, generation: u64 },
    Comments { item: Item, generation: u64 },
    Open(Item),
}

pub struct TuiApp {
    pub view: View,
    pub feed_names: &'static [&'static str],
    pub feed_index: usize,
    batch_size: usize,

    pub story_ids: Vec<ItemId>,
    requested: usize,
    pub stories: Vec<Item>,
    pub cursor: usize,
    pub offset: usize,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,

    pub current: Option<Item>,
    pub comments: Vec<Comment>,
    pub comments_loading: bool,
    pub comments_error: Option<String>,
    pub scroll: u16,

    /// Stories that fit on screen, kept current by the layout.
    pub visible_rows: usize,
    /// Height of the comment viewport, kept current by the layout.
    pub viewport_height: u16,

    pub show_help: bool,
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub update_notice: Option<String>,

    listing_generation: u64,
    comment_generation: u64,
}

impl TuiApp {
    pub fn new(feed_names: &'static [&'static str], feed: &str, batch_size: usize) -> Self {
        Self {
            view: View::Stories,
            feed_names,
            feed_index: feed_names.iter().position(|f| *f == feed).unwrap_or(0),
            batch_size: batch_size.max(1),
            story_ids: Vec::new(),
            requested: 0,
            stories: Vec::new(),
            cursor: 0,
            offset: 0,
            loading: false,
            loading_more: false,
            error: None,
            current: None,
            comments: Vec::new(),
            comments_loading: false,
            comments_error: None,
            scroll: 0,
            visible_rows: 10,
            viewport_height: 20,
            show_help: false,
            should_quit: false,
            status_message: None,
            update_notice: None,
            listing_generation: 0,
            comment_generation: 0,
        }
    }

    pub fn feed(&self) -> &'static str {
        self.feed_names.get(self.feed_index).copied().unwrap_or_default()
    }

    pub fn selected(&self) -> Option<&Item> {
        self.stories.get(self.cursor)
    }

    pub fn has_more(&self) -> bool {
        self.requested < self.story_ids.len()
    }

    /// Drop the current listing and ask for the feed's story ids again.
    /// Anything still in flight for the old listing will be ignored.
    pub fn start_listing(&mut self) -> Request {
        self.listing_generation += 1;
        self.story_ids.clear();
        self.requested = 0;
        self.stories.clear();
        self.cursor = 0;
        self.offset = 0;
        self.loading = true;
        self.loading_more = false;
        self.error = None;
        self.status_message = None;
        Request::StoryIds {
            feed: self.feed(),
            generation: self.listing_generation,
        }
    }

    pub fn handle_action(&mut self, action: Action) -> Option<Request> {
        if action == Action::Help {
            self.show_help = !self.show_help;
            return None;
        }
        if self.show_help {
            self.show_help = false;
            return None;
        }

        match (self.view, action) {
            (_, Action::Quit) => {
                self.should_quit = true;
                None
            }
            (_, Action::None) | (_, Action::Help) => None,

            (View::Stories, Action::MoveUp) => self.move_cursor_to(self.cursor.saturating_sub(1)),
            (View::Stories, Action::MoveDown) => self.move_cursor_to(self.cursor + 1),
            (View::Stories, Action::PageUp) => {
                self.move_cursor_to(self.cursor.saturating_sub(PAGE_SIZE))
            }
            (View::Stories, Action::PageDown) => self.move_cursor_to(self.cursor + PAGE_SIZE),
            (View::Stories, Action::Top) => self.move_cursor_to(0),
            (View::Stories, Action::Bottom) => self.move_cursor_to(usize::MAX),
            (View::Stories, Action::Open) => self.selected().cloned().map(Request::Open),
            (View::Stories, Action::Comments) => self.open_comments(),
            (View::Stories, Action::Back) => None,
            (View::Stories, Action::NextFeed) => Some(self.switch_feed(1)),
            (View::Stories, Action::PrevFeed) => Some(self.switch_feed(-1)),
            (View::Stories, Action::Refresh) => Some(self.start_listing()),

            (View::Comments, Action::MoveUp) => self.scroll_by(-1),
            (View::Comments, Action::MoveDown) => self.scroll_by(1),
            (View::Comments, Action::PageUp) => self.scroll_by(-self.half_page()),
            (View::Comments, Action::PageDown) => self.scroll_by(self.half_page()),
            (View::Comments, Action::Top) => {
                self.scroll = 0;
                None
            }
            (View::Comments, Action::Bottom) => {
                self.scroll = u16::MAX;
                None
            }
            (View::Comments, Action::Open) => self.current.clone().map(Request::Open),
            (View::Comments, Action::Back) => {
                self.close_comments();
                None
            }
            (View::Comments, Action::Refresh) => {
                self.current.clone().map(|item| self.load_comments(item))
            }
            (View::Comments, Action::Comments)
            | (View::Comments, Action::NextFeed)
            | (View::Comments, Action::PrevFeed) => None,
        }
    }

    /// Fold a background result into the state. Returns follow-up work,
    /// such as the first story batch once ids arrive.
    pub fn apply(&mut self, message: Message) -> Option<Request> {
        match message {
            Message::StoryIds { generation, result } => {
                if generation != self.listing_generation {
                    return None;
                }
                match result {
                    Ok(ids) => {
                        self.story_ids = ids;
                        self.requested = 0;
                        if self.story_ids.is_empty() {
                            self.loading = false;
                            return None;
                        }
                        self.next_batch()
                    }
                    Err(e) => {
                        self.loading = false;
                        self.error = Some(e.to_string());
                        None
                    }
                }
            }
            Message::Stories { generation, result } => {
                if generation != self.listing_generation {
                    return None;
                }
                self.loading = false;
                self.loading_more = false;
                match result {
                    Ok(items) => {
                        self.stories.extend(items);
                        self.maybe_load_more()
                    }
                    Err(e) if self.stories.is_empty() => {
                        self.error = Some(e.to_string());
                        None
                    }
                    Err(e) => {
                        self.status_message = Some(format!("Failed to load more stories: {}", e));
                        None
                    }
                }
            }
            Message::Comments { generation, result } => {
                if generation != self.comment_generation {
                    return None;
                }
                self.comments_loading = false;
                match result {
                    Ok(comments) => self.comments = comments,
                    Err(e) => self.comments_error = Some(e.to_string()),
                }
                None
            }
            Message::Update(info) => {
                if info.has_update() {
                    self.update_notice = Some(info.message());
                }
                None
            }
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.iter().map(Comment::count).sum()
    }

    fn switch_feed(&mut self, step: isize) -> Request {
        let len = self.feed_names.len().max(1) as isize;
        self.feed_index = (self.feed_index as isize + step).rem_euclid(len) as usize;
        self.start_listing()
    }

    fn move_cursor_to(&mut self, index: usize) -> Option<Request> {
        if self.stories.is_empty() {
            return None;
        }
        self.cursor = index.min(self.stories.len() - 1);
        self.adjust_offset();
        self.maybe_load_more()
    }

    fn adjust_offset(&mut self) {
        let visible = self.visible_rows.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + visible {
            self.offset = self.cursor + 1 - visible;
        }
    }

    fn maybe_load_more(&mut self) -> Option<Request> {
        let near_end = self.cursor + LOAD_MORE_THRESHOLD >= self.stories.len();
        if self.loading || self.loading_more || !self.has_more() || !near_end {
            return None;
        }
        self.loading_more = true;
        self.next_batch()
    }

    fn next_batch(&mut self) -> Option<Request> {
        let end = (self.requested + self.batch_size).min(self.story_ids.len());
        if self.requested >= end {
            return None;
        }
        let ids = self.story_ids[self.requested..end].to_vec();
        self.requested = end;
        Some(Request::Stories {
            ids,
            generation: self.listing_generation,
        })
    }

    fn open_comments(&mut self) -> Option<Request> {
        let item = self.selected()?.clone();
        self.view = View::Comments;
        Some(self.load_comments(item))
    }

    fn load_comments(&mut self, item: Item) -> Request {
        self.comment_generation += 1;
        self.current = Some(item.clone());
        self.comments.clear();
        self.comments_error = None;
        self.comments_loading = true;
        self.scroll = 0;
        Request::Comments {
            item,
            generation: self.comment_generation,
        }
    }

    fn close_comments(&mut self) {
        self.comment_generation += 1;
        self.view = View::Stories;
        self.comments.clear();
        self.comments_error = None;
        self.comments_loading = false;
        self.current = None;
    }

    fn half_page(&self) -> i32 {
        i32::from((self.viewport_height / 2).max(1))
    }

    fn scroll_by(&mut self, delta: i32) -> Option<Request> {
        self.scroll = (i32::from(self.scroll) + delta).clamp(0, i32::from(u16::MAX)) as u16;
        None
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }
}
