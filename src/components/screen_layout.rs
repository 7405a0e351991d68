//! Splits the screen between the main content and the instructions strip.

use ratatui::{
    Frame,
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::theme::Theme;

pub struct ScreenLayout {
    pub content_area: Rect,
    pub instructions_area: Option<Rect>,
}

/// Reserve the bottom of `area` for the wrapped `instructions` when shown.
pub fn split_instructions(area: Rect, show_instructions: bool, instructions: &str) -> ScreenLayout {
    if !show_instructions {
        return ScreenLayout { content_area: area, instructions_area: None };
    }
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;
    let wrapped = textwrap::wrap(instructions, wrap_width);
    let height = ((wrapped.len() as u16).max(1) + 2).min(area.height);
    let content_area = Rect { height: area.height - height, ..area };
    let instructions_area = Rect { y: area.y + content_area.height, height, ..area };
    ScreenLayout { content_area, instructions_area: Some(instructions_area) }
}

pub fn render_instructions(frame: &mut Frame, area: Rect, instructions: &str, theme: &Theme) {
    let paragraph = Paragraph::new(instructions.to_string())
        .block(Block::default().borders(Borders::ALL).title("Instructions"))
        .style(theme.warning_style())
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_hidden_instructions_keep_full_area() {
        let area = Rect::new(0, 0, 80, 24);
        let layout = split_instructions(area, false, "F1: Toggle Instructions");
        assert_eq!(layout.content_area, area);
        assert_eq!(layout.instructions_area, None);
    }

    #[test]
    fn test_instructions_take_wrapped_height_at_bottom() {
        let area = Rect::new(0, 0, 24, 20);
        let text = "Ctrl+C: Quit  Ctrl+L: Clear  Ctrl+Y: Copy Query";
        let layout = split_instructions(area, true, text);
        let lines = textwrap::wrap(text, 20).len() as u16;
        let instructions = layout.instructions_area.unwrap();
        assert_eq!(instructions.height, lines + 2);
        assert_eq!(instructions.y + instructions.height, 20);
        assert_eq!(layout.content_area.height, 20 - lines - 2);
        assert_eq!(instructions.y, layout.content_area.y + layout.content_area.height);
    }

    #[test]
    fn test_tiny_area_does_not_underflow() {
        let layout = split_instructions(Rect::new(0, 0, 10, 2), true, "");
        assert_eq!(layout.content_area.height, 0);
        assert_eq!(layout.instructions_area.unwrap().height, 2);
    }
}
