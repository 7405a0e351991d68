use std::collections::HashMap;

use ratatui::style::{Color, Modifier, Style};

/// Color scheme for the query bar and its panels.
///
/// Named entries from the `styles` section of the config override the
/// built-in styles (`label`, `symbol`, `value`, `readonly`, `remove`,
/// `highlight`, `placeholder`, `border`, `border_focused`).
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub placeholder: Color,

    // Expression tags
    pub label_bg: Color,
    pub symbol_bg: Color,
    pub value_fg: Color,
    pub value_bg: Color,
    pub readonly_fg: Color,

    // Option list
    pub highlight_fg: Color,
    pub highlight_bg: Color,

    pub warning: Color,
    pub info: Color,

    overrides: HashMap<String, Style>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Default dark theme
    pub fn dark() -> Self {
        Self {
            name: "Default Dark".to_string(),
            foreground: Color::Gray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            placeholder: Color::DarkGray,
            label_bg: Color::Rgb(45, 45, 60),
            symbol_bg: Color::Rgb(35, 35, 45),
            value_fg: Color::White,
            value_bg: Color::Blue,
            readonly_fg: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::Cyan,
            warning: Color::Yellow,
            info: Color::Blue,
            overrides: HashMap::new(),
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            foreground: Color::Black,
            border: Color::Gray,
            border_focused: Color::Blue,
            placeholder: Color::Gray,
            label_bg: Color::Rgb(230, 230, 230),
            symbol_bg: Color::Rgb(245, 245, 245),
            value_fg: Color::Black,
            value_bg: Color::Rgb(200, 225, 255),
            readonly_fg: Color::Gray,
            highlight_fg: Color::White,
            highlight_bg: Color::Blue,
            warning: Color::Rgb(200, 150, 0), // Darker yellow for light bg
            info: Color::Blue,
            overrides: HashMap::new(),
        }
    }

    /// Built-in theme by name; anything but `light` is the dark theme.
    pub fn named(name: &str) -> Self {
        if name.eq_ignore_ascii_case("light") { Self::light() } else { Self::dark() }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, Style>) -> Self {
        self.overrides = overrides;
        self
    }

    fn pick(&self, name: &str, fallback: Style) -> Style {
        self.overrides.get(name).copied().unwrap_or(fallback)
    }

    pub fn label_style(&self) -> Style {
        self.pick("label", Style::default().fg(self.foreground).bg(self.label_bg))
    }

    pub fn symbol_style(&self) -> Style {
        self.pick("symbol", Style::default().fg(self.warning).bg(self.symbol_bg))
    }

    pub fn value_style(&self) -> Style {
        self.pick("value", Style::default().fg(self.value_fg).bg(self.value_bg))
    }

    pub fn remove_style(&self) -> Style {
        self.pick("remove", Style::default().fg(self.value_fg).bg(self.value_bg).add_modifier(Modifier::BOLD))
    }

    pub fn readonly_style(&self) -> Style {
        self.pick("readonly", Style::default().fg(self.readonly_fg).bg(self.label_bg))
    }

    pub fn highlight_style(&self) -> Style {
        self.pick(
            "highlight",
            Style::default()
                .fg(self.highlight_fg)
                .bg(self.highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn placeholder_style(&self) -> Style {
        self.pick("placeholder", Style::default().fg(self.placeholder).add_modifier(Modifier::ITALIC))
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    pub fn border_style(&self) -> Style {
        self.pick("border", Style::default().fg(self.border))
    }

    pub fn focused_border_style(&self) -> Style {
        self.pick("border_focused", Style::default().fg(self.border_focused))
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }
}
