//! Theme and style definitions.

use bobsled_core::Status;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

/// Theme configuration for the dashboard.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Primary accent color (highlights, active elements)
    pub accent: Color,
    /// Success color (connected, enabled)
    pub success: Color,
    /// Warning color (connecting, notices)
    pub warning: Color,
    /// Error color (closed channel, failed fetch)
    pub error: Color,
    /// Muted color (timestamps, secondary info)
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::DarkGray,
        }
    }
}

impl Theme {
    /// Fixed display color of a run status.
    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Pending => Color::Yellow,
            Status::Running => Color::Cyan,
            Status::Success => Color::Green,
            Status::Error => Color::Red,
            Status::UserKilled => Color::Magenta,
            Status::TimedOut => Color::LightRed,
            Status::Missing => Color::DarkGray,
        }
    }

    /// Style for a status label.
    pub fn status_style(&self, status: Status) -> Style {
        let style = Style::default().fg(self.status_color(status));
        if status.is_active() {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Icon followed by the status name.
    pub fn status_label(&self, status: Status) -> Span<'static> {
        Span::styled(
            format!("{} {}", status.icon(), status.name()),
            self.status_style(status),
        )
    }

    /// Compact history strip, one icon per status.
    pub fn status_strip(&self, statuses: &[Status]) -> Vec<Span<'static>> {
        statuses
            .iter()
            .map(|s| Span::styled(s.icon(), Style::default().fg(self.status_color(*s))))
            .collect()
    }

    /// Style for focused/active borders.
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Style for unfocused borders.
    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Style for success text.
    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    /// Style for warning text.
    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    /// Style for error text.
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Style for muted/secondary text.
    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Style for bold text.
    pub fn bold(&self) -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    /// Style for the selected table row.
    pub fn selected_row(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }
}
