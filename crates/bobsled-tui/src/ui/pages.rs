//! Page bodies.

use chrono::Utc;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;

use bobsled_core::{IndexView, Run, RunView, Task, TaskView, ViewModel};
use bobsled_ui::{format_duration, format_timestamp, tail_lines, truncate, Theme};

use crate::app::App;

/// Render the body of the mounted page.
pub fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let page = app.page();
    let theme = app.theme();
    match &page.view {
        ViewModel::Index(view) => render_index(frame, area, theme, view, page.selected),
        ViewModel::Task(view) => render_task(frame, area, theme, view, page.selected),
        ViewModel::Run(view) => render_run(frame, area, theme, view),
        ViewModel::LatestRuns(view) => {
            let block = Block::default().borders(Borders::ALL).title(" Latest runs ");
            render_runs(frame, area, theme, &view.runs, Some(page.selected), block);
        }
    }
}

fn render_index(frame: &mut Frame, area: Rect, theme: &Theme, view: &IndexView, selected: usize) {
    let [tasks_area, side_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);
    let [active_area, beat_area] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(side_area);

    let header = Row::new(vec!["Task", "Latest", "Recent", "Tags"]).style(theme.bold());
    let rows: Vec<Row> = view
        .tasks
        .iter()
        .map(|task| {
            let name_style = if task.enabled {
                theme.bold()
            } else {
                theme.muted_style()
            };
            let latest = match task.latest_status() {
                Some(status) => Cell::from(theme.status_label(status)),
                None => Cell::from(Span::styled("never run", theme.muted_style())),
            };
            let tags = task.tags.iter().cloned().collect::<Vec<_>>().join(",");
            Row::new(vec![
                Cell::from(Span::styled(task.name.to_string(), name_style)),
                latest,
                Cell::from(Line::from(theme.status_strip(&task.recent_statuses))),
                Cell::from(truncate(&tags, 24)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Fill(2),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Fill(1),
        ],
    )
    .header(header)
    .row_highlight_style(theme.selected_row())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Tasks ({}) ", view.tasks.len()))
            .border_style(theme.focused_border()),
    );
    let mut state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, tasks_area, &mut state);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Active runs ")
        .border_style(theme.unfocused_border());
    render_runs(frame, active_area, theme, &view.active_runs, None, block);

    let height = beat_area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = tail_lines(&view.beat, height)
        .into_iter()
        .map(|line| Line::from(Span::styled(line.to_string(), theme.muted_style())))
        .collect();
    let beat = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Scheduler ")
            .border_style(theme.unfocused_border()),
    );
    frame.render_widget(beat, beat_area);
}

fn render_task(frame: &mut Frame, area: Rect, theme: &Theme, view: &TaskView, selected: usize) {
    let [info_area, runs_area] =
        Layout::vertical([Constraint::Length(12), Constraint::Fill(1)]).areas(area);

    let lines = match &view.task {
        Some(task) => task_lines(theme, task),
        None => vec![Line::from(Span::styled("Loading...", theme.muted_style()))],
    };
    let info = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", view.name))
            .border_style(theme.unfocused_border()),
    );
    frame.render_widget(info, info_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Runs ({}) ", view.runs.len()))
        .border_style(theme.focused_border());
    render_runs(frame, runs_area, theme, &view.runs, Some(selected), block);
}

/// Configuration block of a task page.
fn task_lines(theme: &Theme, task: &Task) -> Vec<Line<'static>> {
    let join = |items: Vec<&str>| or_dash(items.join(", "));
    let timeout = task
        .timeout()
        .map(|t| format!("{}m", t.as_secs() / 60))
        .unwrap_or_else(|| "-".to_string());
    let amount = |value: Option<u32>, unit: &str| {
        value
            .map(|v| format!("{}{}", v, unit))
            .unwrap_or_else(|| "-".to_string())
    };

    vec![
        field(theme, "Image:    ", task.image.clone()),
        field(theme, "Command:  ", or_dash(task.command_line())),
        field(
            theme,
            "Enabled:  ",
            if task.enabled { "yes" } else { "no" }.to_string(),
        ),
        field(
            theme,
            "Triggers: ",
            join(task.triggers.iter().map(|t| t.cron.as_str()).collect()),
        ),
        field(
            theme,
            "Next:     ",
            join(task.next_tasks.iter().map(|t| t.as_str()).collect()),
        ),
        field(theme, "Timeout:  ", timeout),
        field(theme, "Memory:   ", amount(task.memory, " MB")),
        field(theme, "CPU:      ", amount(task.cpu, " units")),
        field(
            theme,
            "Env:      ",
            or_dash(task.environment.clone().unwrap_or_default()),
        ),
        field(
            theme,
            "Tags:     ",
            join(task.tags.iter().map(String::as_str).collect()),
        ),
    ]
}

fn render_run(frame: &mut Frame, area: Rect, theme: &Theme, view: &RunView) {
    let [info_area, logs_area] =
        Layout::vertical([Constraint::Length(7), Constraint::Fill(1)]).areas(area);

    let Some(run) = &view.run else {
        let loading = Paragraph::new(Span::styled("Loading...", theme.muted_style())).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Run {} ", view.uuid)),
        );
        frame.render_widget(loading, area);
        return;
    };

    let exit_code = run
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let lines = vec![
        field(theme, "Task:     ", run.task.to_string()),
        Line::from(vec![Span::raw("Status:   "), theme.status_label(run.status)]),
        field(theme, "Started:  ", format_timestamp(run.start)),
        field(theme, "Duration: ", elapsed(run)),
        field(theme, "Exit:     ", exit_code),
    ];
    let info = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Run {} ", run.uuid))
            .border_style(theme.unfocused_border()),
    );
    frame.render_widget(info, info_area);

    // Follow the tail of the log
    let height = logs_area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = tail_lines(&run.logs, height)
        .into_iter()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let logs = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Logs ")
            .border_style(theme.focused_border()),
    );
    frame.render_widget(logs, logs_area);
}

/// Table of runs, newest first.
fn render_runs(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    runs: &[Run],
    selected: Option<usize>,
    block: Block,
) {
    if runs.is_empty() {
        let empty = Paragraph::new(Span::styled("No runs.", theme.muted_style())).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Status", "Run", "Task", "Started", "Duration"]).style(theme.bold());
    let rows: Vec<Row> = runs
        .iter()
        .map(|run| {
            Row::new(vec![
                Cell::from(theme.status_label(run.status)),
                Cell::from(run.uuid.short().to_string()),
                Cell::from(run.task.to_string()),
                Cell::from(format_timestamp(run.start)),
                Cell::from(elapsed(run)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Fill(1),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .row_highlight_style(theme.selected_row())
    .block(block);
    let mut state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

/// Run time so far, or total run time once finished.
fn elapsed(run: &Run) -> String {
    match (run.start, run.end) {
        (Some(start), Some(end)) => format_duration(end - start),
        (Some(start), None) if !run.is_terminal() => format_duration(Utc::now() - start),
        _ => "-".to_string(),
    }
}

fn field(theme: &Theme, label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::raw(label),
        Span::styled(value, theme.bold()),
    ])
}

fn or_dash(text: String) -> String {
    if text.is_empty() {
        "-".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_task_lines_show_configuration() {
        let mut task = Task::new("build", "img:1");
        task.memory = Some(512);
        task.cpu = Some(256);
        task.environment = Some("prod".to_string());
        task.tags.insert("nightly".to_string());
        task.tags.insert("etl".to_string());

        let lines = text(&task_lines(&Theme::default(), &task));
        assert!(lines.contains(&"Memory:   512 MB".to_string()));
        assert!(lines.contains(&"CPU:      256 units".to_string()));
        assert!(lines.contains(&"Env:      prod".to_string()));
        assert!(lines.contains(&"Tags:     etl, nightly".to_string()));
    }

    #[test]
    fn test_task_lines_dash_missing_values() {
        let lines = text(&task_lines(&Theme::default(), &Task::new("build", "img")));
        assert!(lines.contains(&"Memory:   -".to_string()));
        assert!(lines.contains(&"Tags:     -".to_string()));
    }
}
