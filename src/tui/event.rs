use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use std::time::Duration;

use crate::app::Result;
use crate::domain::{Comment, Item, ItemId};
use crate::update::UpdateInfo;

pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    pub fn next(&self) -> Result<AppEvent> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Windows terminals also report releases
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(AppEvent::Key(key)),
                Event::Resize(_, _) => return Ok(AppEvent::Resize),
                _ => {}
            }
        }
        Ok(AppEvent::Tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Open,
    Comments,
    Back,
    NextFeed,
    PrevFeed,
    Refresh,
    Help,
    None,
}

/// Results of background fetches. Listing and comment results carry the
/// generation they were requested under so stale ones can be dropped.
pub enum Message {
    StoryIds {
        generation: u64,
        result: Result<Vec<ItemId>>,
    },
    Stories {
        generation: u64,
        result: Result<Vec<Item>>,
    },
    Comments {
        generation: u64,
        result: Result<Vec<Comment>>,
    },
    Update(UpdateInfo),
}
