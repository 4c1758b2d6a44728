use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::config::{ColorConfig, Config, KeybindingConfig};
use crate::domain::comment::flatten;
use crate::tui::app::{TuiApp, View};
use crate::tui::event::Action;
use crate::tui::text::{clean_html, story_meta, wrap_text};

const ROWS_PER_STORY: u16 = 2;

/// What the header shows about the open source.
pub struct Header<'a> {
    pub source_name: &'a str,
    pub feed_labels: &'a [&'a str],
}

pub fn render(frame: &mut Frame, app: &mut TuiApp, header: &Header, config: &Config) {
    let colors = &config.colors;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Source and feed tabs
            Constraint::Min(1),    // Stories or comments
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, header, chunks[0], colors);
    match app.view {
        View::Stories => render_stories(frame, app, chunks[1], colors),
        View::Comments => render_comments(frame, app, chunks[1], colors),
    }
    render_status_bar(frame, app, chunks[2], config);

    if app.show_help {
        render_help(frame, &config.keybindings, colors);
    }
}

fn render_header(
    frame: &mut Frame,
    app: &TuiApp,
    header: &Header,
    area: Rect,
    colors: &ColorConfig,
) {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", header.source_name),
            Style::default()
                .fg(colors.header_fg)
                .bg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ];

    for (i, label) in header.feed_labels.iter().enumerate() {
        let style = if i == app.feed_index {
            Style::default()
                .fg(colors.tab_active)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(colors.tab_inactive)
        };
        spans.push(Span::styled(format!(" {} ", label), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_stories(frame: &mut Frame, app: &mut TuiApp, area: Rect, colors: &ColorConfig) {
    let notice =
        |text: String, color: Color| Paragraph::new(Span::styled(text, Style::default().fg(color)));

    if let Some(error) = &app.error {
        frame.render_widget(notice(format!("Error: {}", error), colors.error), area);
        return;
    }
    if app.stories.is_empty() {
        let text = if app.loading {
            "Loading stories..."
        } else {
            "No stories in this feed."
        };
        frame.render_widget(notice(text.to_string(), colors.meta), area);
        return;
    }

    let visible = usize::from((area.height / ROWS_PER_STORY).max(1));
    app.visible_rows = visible;
    // Keep the cursor on screen after a resize.
    if app.cursor >= app.offset + visible {
        app.offset = app.cursor + 1 - visible;
    }
    app.offset = app.offset.min(app.cursor);

    let mut lines = Vec::with_capacity(visible * 2);
    for (index, story) in app.stories.iter().enumerate().skip(app.offset).take(visible) {
        let selected = index == app.cursor;
        let title_style = if selected {
            Style::default()
                .fg(colors.selected_title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.title)
        };

        let mut title = vec![
            Span::styled(format!("{:>3}. ", index + 1), Style::default().fg(colors.meta)),
            Span::styled(story.title.clone(), title_style),
        ];
        let domain = story.domain();
        if !domain.is_empty() {
            title.push(Span::styled(
                format!(" ({})", domain),
                Style::default().fg(colors.domain),
            ));
        }
        lines.push(Line::from(title));
        lines.push(Line::from(Span::styled(
            format!("     {}", story_meta(story)),
            Style::default().fg(colors.meta),
        )));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn render_comments(frame: &mut Frame, app: &mut TuiApp, area: Rect, colors: &ColorConfig) {
    let width = usize::from(area.width.max(20));
    let mut lines: Vec<Line> = Vec::new();

    if let Some(story) = &app.current {
        lines.push(Line::from(Span::styled(
            story.title.clone(),
            Style::default()
                .fg(colors.selected_title)
                .add_modifier(Modifier::BOLD),
        )));
        if !story.url.is_empty() {
            lines.push(Line::from(Span::styled(
                story.url.clone(),
                Style::default().fg(colors.domain),
            )));
        }
        lines.push(Line::from(Span::styled(
            story_meta(story),
            Style::default().fg(colors.meta),
        )));
        if !story.text.is_empty() {
            lines.push(Line::default());
            for text in wrap_text(&clean_html(&story.text), width) {
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(colors.comment_text),
                )));
            }
        }
        lines.push(Line::default());
    }

    if app.comments_loading {
        lines.push(Line::from(Span::styled(
            "Loading comments...",
            Style::default().fg(colors.meta),
        )));
    } else if let Some(error) = &app.comments_error {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(colors.error),
        )));
    } else if app.comments.is_empty() {
        lines.push(Line::from(Span::styled(
            "No comments yet.",
            Style::default().fg(colors.meta),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("─── {} comments ───", app.comment_count()),
            Style::default().fg(colors.meta),
        )));
        lines.push(Line::default());
        lines.extend(comment_lines(app, width, colors));
    }

    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    app.viewport_height = area.height;
    app.scroll = app.scroll.min(total.saturating_sub(area.height));

    frame.render_widget(Paragraph::new(Text::from(lines)).scroll((app.scroll, 0)), area);
}

fn comment_lines(app: &TuiApp, width: usize, colors: &ColorConfig) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for comment in flatten(&app.comments) {
        let indent = "  ".repeat(comment.depth);
        let rail = Style::default().fg(colors.depth_color(comment.depth));
        let text_width = width.saturating_sub(indent.len() + 2).max(20);

        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled("│ ", rail),
            Span::styled(
                comment.by.clone(),
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {}", comment.time_ago()), Style::default().fg(colors.meta)),
        ]));
        for text in wrap_text(&clean_html(&comment.text), text_width) {
            lines.push(Line::from(vec![
                Span::raw(indent.clone()),
                Span::styled("│ ", rail),
                Span::styled(text, Style::default().fg(colors.comment_text)),
            ]));
        }
        lines.push(Line::default());
    }

    lines
}

fn render_status_bar(frame: &mut Frame, app: &TuiApp, area: Rect, config: &Config) {
    let keys = &config.keybindings;
    let colors = &config.colors;

    let left = if let Some(message) = &app.status_message {
        message.clone()
    } else {
        match app.view {
            View::Stories => {
                let mut position = if app.stories.is_empty() {
                    String::from("0/0")
                } else {
                    format!("{}/{}", app.cursor + 1, app.stories.len())
                };
                if app.loading_more {
                    position.push_str(" loading more...");
                }
                format!(
                    "{}  {}:open {}:comments {}:feed {}:refresh {}:help {}:quit",
                    position,
                    keys.hint(Action::Open),
                    keys.hint(Action::Comments),
                    keys.hint(Action::NextFeed),
                    keys.hint(Action::Refresh),
                    keys.hint(Action::Help),
                    keys.hint(Action::Quit),
                )
            }
            View::Comments => format!(
                "{}/{}:scroll {}:open {}:back {}:refresh {}:quit",
                keys.hint(Action::MoveDown),
                keys.hint(Action::MoveUp),
                keys.hint(Action::Open),
                keys.hint(Action::Back),
                keys.hint(Action::Refresh),
                keys.hint(Action::Quit),
            ),
        }
    };

    let mut spans = vec![Span::raw(format!(" {}", left))];
    if let Some(notice) = &app.update_notice {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notice.clone(),
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(colors.status_fg).bg(colors.status_bg));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, keys: &KeybindingConfig, colors: &ColorConfig) {
    let rows: [(&[String], &str); 14] = [
        (&keys.move_down, "Move down / scroll"),
        (&keys.move_up, "Move up / scroll"),
        (&keys.page_down, "Page down"),
        (&keys.page_up, "Page up"),
        (&keys.top, "Go to top"),
        (&keys.bottom, "Go to bottom"),
        (&keys.open, "Open in browser"),
        (&keys.comments, "Show comments"),
        (&keys.back, "Back to stories"),
        (&keys.next_feed, "Next feed"),
        (&keys.prev_feed, "Previous feed"),
        (&keys.refresh, "Refresh"),
        (&keys.help, "Toggle help"),
        (&keys.quit, "Quit"),
    ];

    let lines: Vec<Line> = rows
        .iter()
        .map(|(bindings, description)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<22}", bindings.join(", ")),
                    Style::default().fg(colors.accent),
                ),
                Span::raw(*description),
            ])
        })
        .collect();

    let area = centered(frame.area(), 50, lines.len() as u16 + 2);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.accent)),
        ),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
