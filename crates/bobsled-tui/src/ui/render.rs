//! Main render function for the TUI.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Frame;

use bobsled_core::{PageId, PageKind};

use crate::app::App;
use crate::event::ChannelState;

use super::pages;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Create main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area, app);
    pages::render_body(frame, body_area, app);
    render_footer(frame, footer_area, app);
}

/// Render the header with page tabs.
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let page = app.page().id();
    let titles = vec![
        "[i] Index".to_string(),
        "[l] Latest runs".to_string(),
        detail_title(&page),
    ];

    let selected = match page.kind() {
        PageKind::Index => 0,
        PageKind::LatestRuns => 1,
        PageKind::Task | PageKind::Run => 2,
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" bobsled ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn detail_title(page: &PageId) -> String {
    match page {
        PageId::Task(name) => format!("Task {}", name),
        PageId::Run(uuid) => format!("Run {}", uuid.short()),
        PageId::Index | PageId::LatestRuns => "Detail".to_string(),
    }
}

/// Render the footer with channel state, notice and key help.
fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme();
    let page = app.page();
    let mut spans = Vec::new();

    if let Some(state) = &page.channel {
        let style = match state {
            ChannelState::Live => theme.success_style(),
            ChannelState::Connecting | ChannelState::Waiting { .. } => theme.warning_style(),
            ChannelState::Closed { .. } => theme.error_style(),
        };
        spans.push(Span::styled(format!("● {}", state), style));
        spans.push(Span::raw(" | "));
    }

    match &page.notice {
        Some(notice) => {
            let style = if notice.is_error {
                theme.error_style()
            } else {
                theme.success_style()
            };
            spans.push(Span::styled(notice.text.clone(), style));
        }
        None if !page.view.is_loaded() => {
            spans.push(Span::styled("Loading...", theme.muted_style()));
        }
        None => spans.push(Span::styled("Ready", theme.success_style())),
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text(page.id().kind()), theme.muted_style()));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn help_text(kind: PageKind) -> &'static str {
    match kind {
        PageKind::Index => " j/k: select | Enter: open | r: refresh | l: latest | q: quit ",
        PageKind::Task => " j/k: select | Enter: open | s: start run | r: refresh | Esc: back ",
        PageKind::Run => " x: stop run | r: refresh | i: index | Esc: back ",
        PageKind::LatestRuns => " j/k: select | Enter: open | r: refresh | Esc: back ",
    }
}
