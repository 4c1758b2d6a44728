pub mod app;
pub mod event;
pub mod layout;
pub mod text;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::app::{AppContext, Result};
use crate::source::{self, Source};
use crate::update;

use self::app::{Request, TuiApp};
use self::event::{AppEvent, EventHandler, Message};
use self::layout::Header;

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(ctx: AppContext) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, ctx).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs fetches off the UI loop and reports back through the channel.
struct Worker {
    source: Arc<dyn Source>,
    comment_depth: usize,
    tx: UnboundedSender<Message>,
}

impl Worker {
    fn dispatch(&self, app: &mut TuiApp, request: Request) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        match request {
            Request::StoryIds { feed, generation } => {
                tokio::spawn(async move {
                    let result = source.fetch_story_ids(feed).await;
                    let _ = tx.send(Message::StoryIds { generation, result });
                });
            }
            Request::Stories { ids, generation } => {
                tokio::spawn(async move {
                    let result = source::load_stories(source.as_ref(), &ids).await;
                    let _ = tx.send(Message::Stories { generation, result });
                });
            }
            Request::Comments { item, generation } => {
                let depth = self.comment_depth;
                tokio::spawn(async move {
                    let result = source.fetch_comment_tree(&item, depth).await;
                    let _ = tx.send(Message::Comments { generation, result });
                });
            }
            Request::Open(item) => {
                let url = source.story_url(&item);
                match open::that(&url) {
                    Ok(()) => tracing::info!(url = %url, "Opened in browser"),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Failed to open browser");
                        app.set_status(format!("Failed to open browser: {}", e));
                    }
                }
            }
        }
    }
}

async fn run_app(terminal: &mut Tui, ctx: AppContext) -> Result<()> {
    let mut tui_app = TuiApp::new(ctx.source.feed_names(), &ctx.feed, ctx.batch_size());
    let event_handler = EventHandler::new(Duration::from_millis(100));
    let (tx, mut rx) = mpsc::unbounded_channel();

    if ctx.config.general.check_updates {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(info) = update::check_for_update(env!("CARGO_PKG_VERSION")).await {
                let _ = tx.send(Message::Update(info));
            }
        });
    }

    let worker = Worker {
        source: Arc::clone(&ctx.source),
        comment_depth: ctx.comment_depth(),
        tx,
    };
    let first = tui_app.start_listing();
    worker.dispatch(&mut tui_app, first);

    loop {
        while let Ok(message) = rx.try_recv() {
            if let Some(request) = tui_app.apply(message) {
                worker.dispatch(&mut tui_app, request);
            }
        }

        let name = ctx.source.name();
        let header = Header {
            source_name: &name,
            feed_labels: ctx.source.feed_labels(),
        };
        terminal.draw(|frame| layout::render(frame, &mut tui_app, &header, &ctx.config))?;

        match event_handler.next()? {
            AppEvent::Key(key) => {
                let action = ctx.config.keybindings.get_action(&key);
                if let Some(request) = tui_app.handle_action(action) {
                    worker.dispatch(&mut tui_app, request);
                }
            }
            AppEvent::Resize | AppEvent::Tick => {}
        }

        if tui_app.should_quit {
            break;
        }
    }

    Ok(())
}
