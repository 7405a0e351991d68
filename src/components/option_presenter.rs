//! Type-ahead input with a dismissible, keyboard-navigable choice list.
//!
//! The presenter knows nothing about what its options mean. It owns the text
//! cursor, list visibility, the highlighted row and the scroll window, and it
//! reports what happened as [`PresenterEvent`]s for the owner to act on.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    widgets::{
        Block, Borders, Clear, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
        Widget,
    },
};
use tracing::{debug, trace};

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption<T> {
    pub label: String,
    pub value: T,
}

impl<T> SelectOption<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self { label: label.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent<T> {
    /// The typed text changed
    Input(String),
    /// An option was picked with the mouse
    Select(T),
    /// Focus left the input
    Blur,
    /// Backspace was pressed, whatever the typed text
    Backspace,
    /// Enter parked the highlighted option; fetch it with [`OptionPresenter::take_deferred`]
    SelectionQueued,
}

/// Outside-click listener. Lives exactly as long as the list is visible.
#[derive(Debug)]
pub struct OutsideClickGuard {
    anchor: Rect,
}

impl OutsideClickGuard {
    fn install(anchor: Rect) -> Self {
        trace!(?anchor, "outside-click listener installed");
        Self { anchor }
    }

    fn is_outside(&self, position: Position) -> bool {
        !self.anchor.contains(position)
    }
}

impl Drop for OutsideClickGuard {
    fn drop(&mut self) {
        trace!("outside-click listener removed");
    }
}

#[derive(Debug)]
pub struct OptionPresenter<T> {
    options: Vec<SelectOption<T>>,
    value: String,
    /// Cursor position in chars
    cursor: usize,
    editable: bool,
    focused: bool,
    visible: bool,
    highlighted: usize,
    scroll_offset: usize,
    max_visible: usize,
    deferred: Option<T>,
    anchor: Rect,
    list_area: Option<Rect>,
    outside_click: Option<OutsideClickGuard>,
}

impl<T: Clone> OptionPresenter<T> {
    pub fn new(max_visible: usize) -> Self {
        Self {
            options: Vec::new(),
            value: String::new(),
            cursor: 0,
            editable: true,
            focused: false,
            visible: false,
            highlighted: 0,
            scroll_offset: 0,
            max_visible: max_visible.max(1),
            deferred: None,
            anchor: Rect::default(),
            list_area: None,
            outside_click: None,
        }
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.show_options();
    }

    pub fn show_options(&mut self) {
        if self.visible {
            return;
        }
        debug!(options = self.options.len(), "option list shown");
        self.visible = true;
        self.highlighted = 0;
        self.scroll_offset = 0;
        self.outside_click = Some(OutsideClickGuard::install(self.anchor));
    }

    pub fn hide_options(&mut self) {
        if self.visible {
            debug!("option list hidden");
        }
        self.visible = false;
        self.highlighted = 0;
        self.scroll_offset = 0;
        self.list_area = None;
        self.outside_click = None;
    }

    fn dismiss(&mut self) -> PresenterEvent<T> {
        self.hide_options();
        self.focused = false;
        PresenterEvent::Blur
    }

    pub fn set_options(&mut self, options: Vec<SelectOption<T>>) {
        self.options = options;
        if self.highlighted >= self.options.len() {
            self.highlighted = 0;
        }
        self.ensure_visible();
    }

    /// Replace the typed text. The cursor moves to the end when the text differs.
    pub fn set_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value != self.value {
            self.cursor = value.chars().count();
            self.value = value;
        }
    }

    pub fn set_editable(&mut self, editable: bool) {
        if self.editable != editable {
            debug!(editable, "input editability changed");
        }
        self.editable = editable;
    }

    /// Area that counts as "inside" for outside-click dismissal; the list opens below it.
    pub fn set_anchor(&mut self, anchor: Rect) {
        self.anchor = anchor;
        if let Some(guard) = self.outside_click.as_mut() {
            guard.anchor = anchor;
        }
    }

    pub fn set_max_visible(&mut self, max_visible: usize) {
        self.max_visible = max_visible.max(1);
        self.ensure_visible();
    }

    pub fn take_deferred(&mut self) -> Option<T> {
        self.deferred.take()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn options(&self) -> &[SelectOption<T>] {
        &self.options
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_outside_click_listener(&self) -> bool {
        self.outside_click.is_some()
    }

    fn visible_rows(&self) -> usize {
        self.max_visible.min(self.options.len()).max(1)
    }

    /// Scroll the least amount that brings the highlighted row into the window.
    fn ensure_visible(&mut self) {
        let max_rows = self.visible_rows();
        if self.highlighted < self.scroll_offset {
            self.scroll_offset = self.highlighted;
        } else if self.highlighted >= self.scroll_offset + max_rows {
            self.scroll_offset = self.highlighted + 1 - max_rows;
        }
        let max_offset = self.options.len().saturating_sub(max_rows);
        if self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }
    }

    fn set_highlight(&mut self, index: usize) {
        self.highlighted = index;
        self.ensure_visible();
    }

    fn step_highlight(&mut self, forward: bool) {
        if self.options.is_empty() {
            return;
        }
        self.show_options();
        let len = self.options.len();
        let next = if forward {
            (self.highlighted + 1) % len
        } else {
            (self.highlighted + len - 1) % len
        };
        self.set_highlight(next);
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn edited(&mut self, events: &mut Vec<PresenterEvent<T>>) {
        self.set_highlight(0);
        self.show_options();
        events.push(PresenterEvent::Input(self.value.clone()));
    }

    fn insert(&mut self, text: &str, events: &mut Vec<PresenterEvent<T>>) {
        let at = self.byte_index(self.cursor);
        self.value.insert_str(at, text);
        self.cursor += text.chars().count();
        self.edited(events);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<PresenterEvent<T>> {
        let mut events = Vec::new();
        if key.kind != KeyEventKind::Press || !self.focused {
            return events;
        }
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Up => self.step_highlight(false),
            KeyCode::Down => self.step_highlight(true),
            KeyCode::Enter => {
                if let Some(option) = self.options.get(self.highlighted) {
                    self.deferred = Some(option.value.clone());
                    events.push(PresenterEvent::SelectionQueued);
                    self.set_highlight(0);
                }
            }
            KeyCode::Backspace => {
                events.push(PresenterEvent::Backspace);
                if self.editable && self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                    self.edited(&mut events);
                }
            }
            KeyCode::Delete => {
                if self.editable && self.cursor < len {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                    self.edited(&mut events);
                }
            }
            KeyCode::Esc => events.push(self.dismiss()),
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                if self.editable {
                    self.insert(c.encode_utf8(&mut [0; 4]), &mut events);
                } else {
                    self.set_highlight(0);
                }
            }
            code => {
                match code {
                    KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
                    KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
                    KeyCode::Home => self.cursor = 0,
                    KeyCode::End => self.cursor = len,
                    _ => {}
                }
                self.set_highlight(0);
            }
        }
        events
    }

    /// Bracketed paste; line breaks become spaces.
    pub fn handle_paste(&mut self, text: &str) -> Vec<PresenterEvent<T>> {
        let mut events = Vec::new();
        if !self.focused || !self.editable {
            return events;
        }
        let text = text.replace(['\r', '\n'], " ");
        self.insert(&text, &mut events);
        events
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<PresenterEvent<T>> {
        let position = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(option) = self.option_at(position).and_then(|i| self.options.get(i)) {
                    let value = option.value.clone();
                    self.set_highlight(0);
                    return vec![PresenterEvent::Select(value)];
                }
                if self.anchor.contains(position) {
                    self.focus();
                    return Vec::new();
                }
                if self.outside_click.as_ref().is_some_and(|guard| guard.is_outside(position)) {
                    return vec![self.dismiss()];
                }
                Vec::new()
            }
            MouseEventKind::Moved => {
                if let Some(index) = self.option_at(position) {
                    self.set_highlight(index);
                }
                Vec::new()
            }
            MouseEventKind::ScrollDown if self.list_contains(position) => {
                self.step_highlight(true);
                Vec::new()
            }
            MouseEventKind::ScrollUp if self.list_contains(position) => {
                self.step_highlight(false);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn list_contains(&self, position: Position) -> bool {
        self.list_area.is_some_and(|area| area.contains(position))
    }

    fn option_at(&self, position: Position) -> Option<usize> {
        let inner = self.list_area?.inner(ratatui::layout::Margin { vertical: 1, horizontal: 1 });
        if !inner.contains(position) {
            return None;
        }
        let index = self.scroll_offset + (position.y - inner.y) as usize;
        (index < self.options.len()).then_some(index)
    }

    /// Draw the list below the anchor, starting at `column`, kept inside `bounds`.
    pub fn render_list(&mut self, buf: &mut Buffer, bounds: Rect, column: u16, theme: &Theme) {
        if !self.visible || !self.focused || self.options.is_empty() {
            self.list_area = None;
            return;
        }
        let height = self.visible_rows() as u16 + 2;
        let label_width = self
            .options
            .iter()
            .map(|option| option.label.chars().count())
            .max()
            .map_or(0, |width| u16::try_from(width).unwrap_or(u16::MAX));
        let width = label_width.saturating_add(5).max(24).min(bounds.width);
        let x = column.min(bounds.right().saturating_sub(width)).max(bounds.x);
        let below = self.anchor.bottom();
        let y = if below + height <= bounds.bottom() || self.anchor.y < bounds.y + height {
            below
        } else {
            self.anchor.y - height
        };
        let area = Rect::new(x, y, width, height).intersection(bounds);
        if area.is_empty() {
            self.list_area = None;
            return;
        }

        Clear.render(area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.focused_border_style());
        let inner = block.inner(area);
        block.render(area, buf);

        let max_rows = inner.height as usize;
        let end = (self.scroll_offset + max_rows).min(self.options.len());
        for (row, index) in (self.scroll_offset..end).enumerate() {
            let selected = index == self.highlighted;
            let style = if selected { theme.highlight_style() } else { theme.normal_style() };
            let marker = if selected { "> " } else { "  " };
            let text = format!("{marker}{:<w$}", self.options[index].label, w = inner.width as usize);
            buf.set_stringn(inner.x, inner.y + row as u16, text, inner.width as usize, style);
        }

        if self.options.len() > max_rows {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(theme.focused_border_style());
            let mut state = ScrollbarState::new(self.options.len() - max_rows + 1)
                .position(self.scroll_offset)
                .viewport_content_length(max_rows);
            scrollbar.render(area, buf, &mut state);
        }
        self.list_area = Some(area);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn presenter(count: usize, max_visible: usize) -> OptionPresenter<usize> {
        let mut p = OptionPresenter::new(max_visible);
        p.set_options((0..count).map(|i| SelectOption::new(format!("option {i}"), i)).collect());
        p.focus();
        p
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    #[test]
    fn test_arrow_keys_wrap_around() {
        let mut p = presenter(3, 8);
        assert_eq!(p.highlighted(), 0);
        p.handle_key(key(KeyCode::Up));
        assert_eq!(p.highlighted(), 2);
        p.handle_key(key(KeyCode::Down));
        assert_eq!(p.highlighted(), 0);
        p.handle_key(key(KeyCode::Down));
        p.handle_key(key(KeyCode::Down));
        assert_eq!(p.highlighted(), 2);
        p.handle_key(key(KeyCode::Down));
        assert_eq!(p.highlighted(), 0);
    }

    #[test]
    fn test_arrows_without_options_are_noops() {
        let mut p = presenter(0, 8);
        assert!(p.handle_key(key(KeyCode::Down)).is_empty());
        assert!(p.handle_key(key(KeyCode::Up)).is_empty());
        assert_eq!(p.highlighted(), 0);
    }

    #[test]
    fn test_enter_parks_highlighted_value() {
        let mut p = presenter(3, 8);
        p.handle_key(key(KeyCode::Down));
        let events = p.handle_key(key(KeyCode::Enter));
        assert_eq!(events, vec![PresenterEvent::SelectionQueued]);
        assert_eq!(p.highlighted(), 0);
        assert_eq!(p.take_deferred(), Some(1));
        assert_eq!(p.take_deferred(), None);
    }

    #[test]
    fn test_enter_without_options_queues_nothing() {
        let mut p = presenter(0, 8);
        assert!(p.handle_key(key(KeyCode::Enter)).is_empty());
        assert_eq!(p.take_deferred(), None);
    }

    #[test]
    fn test_escape_hides_and_blurs() {
        let mut p = presenter(3, 8);
        p.handle_key(key(KeyCode::Down));
        let events = p.handle_key(key(KeyCode::Esc));
        assert_eq!(events, vec![PresenterEvent::Blur]);
        assert!(!p.is_visible());
        assert!(!p.is_focused());
        assert_eq!(p.highlighted(), 0);
    }

    #[test]
    fn test_listener_lives_exactly_while_visible() {
        let mut p = presenter(3, 8);
        assert!(p.is_visible());
        assert!(p.has_outside_click_listener());
        p.hide_options();
        assert!(!p.has_outside_click_listener());
        p.hide_options();
        assert!(!p.has_outside_click_listener());
        p.show_options();
        assert!(p.has_outside_click_listener());
    }

    #[test]
    fn test_other_keys_reset_highlight() {
        let mut p = presenter(3, 8);
        p.handle_key(key(KeyCode::Down));
        p.handle_key(key(KeyCode::Down));
        p.handle_key(key(KeyCode::Left));
        assert_eq!(p.highlighted(), 0);
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let mut p = presenter(0, 8);
        p.set_value("ac");
        p.handle_key(key(KeyCode::Left));
        let events = p.handle_key(key(KeyCode::Char('b')));
        assert_eq!(events, vec![PresenterEvent::Input("abc".to_string())]);
        assert_eq!(p.cursor(), 2);
    }

    #[test]
    fn test_backspace_always_reported_before_input() {
        let mut p = presenter(0, 8);
        assert_eq!(p.handle_key(key(KeyCode::Backspace)), vec![PresenterEvent::Backspace]);
        p.set_value("ab");
        assert_eq!(
            p.handle_key(key(KeyCode::Backspace)),
            vec![PresenterEvent::Backspace, PresenterEvent::Input("a".to_string())]
        );
    }

    #[test]
    fn test_locked_input_suppresses_text_events() {
        let mut p = presenter(2, 8);
        p.set_editable(false);
        assert!(p.handle_key(key(KeyCode::Char('x'))).is_empty());
        assert!(p.handle_paste("pasted").is_empty());
        assert_eq!(p.handle_key(key(KeyCode::Backspace)), vec![PresenterEvent::Backspace]);
        assert_eq!(p.value(), "");
    }

    #[test]
    fn test_control_chords_are_not_text() {
        let mut p = presenter(0, 8);
        let events = p.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(events.is_empty());
    }

    #[test]
    fn test_unfocused_presenter_ignores_keys() {
        let mut p: OptionPresenter<usize> = OptionPresenter::new(8);
        assert!(p.handle_key(key(KeyCode::Char('a'))).is_empty());
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut p = presenter(0, 8);
        let events = p.handle_paste("a\nb");
        assert_eq!(events, vec![PresenterEvent::Input("a b".to_string())]);
    }

    #[test]
    fn test_highlight_scrolls_into_view() {
        let mut p = presenter(20, 5);
        for _ in 0..7 {
            p.handle_key(key(KeyCode::Down));
        }
        assert_eq!(p.highlighted(), 7);
        assert_eq!(p.scroll_offset(), 3);
        for _ in 0..7 {
            p.handle_key(key(KeyCode::Up));
        }
        assert_eq!(p.scroll_offset(), 0);
        p.handle_key(key(KeyCode::Up));
        assert_eq!(p.highlighted(), 19);
        assert_eq!(p.scroll_offset(), 15);
    }

    #[test]
    fn test_shrinking_options_clamps_highlight() {
        let mut p = presenter(10, 4);
        for _ in 0..9 {
            p.handle_key(key(KeyCode::Down));
        }
        p.set_options(vec![SelectOption::new("only", 42)]);
        assert_eq!(p.highlighted(), 0);
        assert_eq!(p.scroll_offset(), 0);
    }

    #[test]
    fn test_mouse_selects_highlights_and_dismisses() {
        let theme = Theme::default();
        let mut p: OptionPresenter<usize> = OptionPresenter::new(8);
        p.set_anchor(Rect::new(0, 0, 40, 3));
        p.set_options((0..3).map(|i| SelectOption::new(format!("option {i}"), i)).collect());
        p.focus();
        let bounds = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(bounds);
        p.render_list(&mut buf, bounds, 2, &theme);

        // list box starts at row 3, first option on row 4
        let moved = MouseEvent { kind: MouseEventKind::Moved, ..click(5, 6) };
        assert!(p.handle_mouse(moved).is_empty());
        assert_eq!(p.highlighted(), 2);

        assert_eq!(p.handle_mouse(click(5, 5)), vec![PresenterEvent::Select(1)]);
        assert!(p.is_visible());

        assert!(p.handle_mouse(click(10, 1)).is_empty());
        assert!(p.is_focused());

        assert_eq!(p.handle_mouse(click(30, 15)), vec![PresenterEvent::Blur]);
        assert!(!p.is_visible());
        assert!(!p.has_outside_click_listener());
        assert!(p.handle_mouse(click(30, 15)).is_empty());
    }
}
