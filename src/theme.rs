use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the editor
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Foreground color for the hover menu
    pub menu_fg: Color,

    /// Background color for the hover menu
    pub menu_bg: Color,

    /// Foreground color for buttons whose format is active
    pub menu_active_fg: Color,

    /// Background color for buttons whose format is active
    pub menu_active_bg: Color,

    /// Foreground color for the serialized preview pane
    pub preview_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            menu_fg: Color::White,
            menu_bg: Color::Black,
            menu_active_fg: Color::Black,
            menu_active_bg: Color::LightYellow,
            preview_fg: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    /// Get the style for selected text
    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn menu_style(&self) -> Style {
        Style::default().fg(self.menu_fg).bg(self.menu_bg)
    }

    /// Get the style for a toolbar button that is currently active
    pub fn menu_active_style(&self) -> Style {
        Style::default()
            .fg(self.menu_active_fg)
            .bg(self.menu_active_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn preview_style(&self) -> Style {
        Style::default().fg(self.preview_fg)
    }
}
