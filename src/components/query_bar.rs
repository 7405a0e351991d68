//! The query bar: builds an expression collection from typed text and option lists.
//!
//! The bar keeps a local view of the collection handed to it by the host and
//! derives an [`EditCursor`] from it. Every mutation produces a new collection,
//! applies it locally and reports it with [`Action::ExpressionsChanged`]; the
//! host answers with [`Action::SyncExpressions`] carrying the value it keeps.

use std::collections::HashSet;

use color_eyre::Result;
use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::{
    Component,
    expression_tag::{TagHit, tag_pieces},
    option_presenter::{OptionPresenter, PresenterEvent, SelectOption},
};
use crate::{
    action::Action,
    config::{Config, Mode, QueryConfig},
    expression::{EditCursor, EditingPart, Expression, FieldKey, FieldValue, RawValue},
    schema::Schema,
    theme::Theme,
    tui::Event,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const CLEAR_GLYPH: &str = "✕";
const FILTER_GLYPH: &str = "⌕";
const INDICATOR_WIDTH: u16 = 6;
const MAX_CONTENT_ROWS: u16 = 6;

/// What an entry of the option list stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Commit the typed text as it is: a search at the field-name position,
    /// a free-text value at the field-value position
    Search,
    Field(FieldKey),
    Value(RawValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarHit {
    Tag(usize, TagHit),
    Clear,
}

/// Left-to-right, wrapping placement of spans; coordinates are relative.
struct Flow {
    width: u16,
    x: u16,
    y: u16,
    lines: Vec<Vec<Span<'static>>>,
    hits: Vec<(Rect, BarHit)>,
}

/// Display width clamped to the terminal coordinate range.
fn span_width(span: &Span) -> u16 {
    u16::try_from(span.width()).unwrap_or(u16::MAX)
}

impl Flow {
    fn new(width: u16) -> Self {
        Self { width: width.max(1), x: 0, y: 0, lines: vec![Vec::new()], hits: Vec::new() }
    }

    /// Place spans that must stay on one line; returns where the chunk starts.
    fn place(&mut self, chunk: Vec<(Span<'static>, Option<BarHit>)>) -> Position {
        let total = chunk.iter().fold(0u16, |total, (span, _)| total.saturating_add(span_width(span)));
        if self.x > 0 && self.x.saturating_add(1).saturating_add(total) > self.width {
            self.lines.push(Vec::new());
            self.x = 0;
            self.y = self.y.saturating_add(1);
        } else if self.x > 0 {
            self.push(Span::raw(" "));
        }
        let start = Position::new(self.x, self.y);
        for (span, hit) in chunk {
            if let Some(hit) = hit {
                self.hits.push((Rect::new(self.x, self.y, span_width(&span), 1), hit));
            }
            self.push(span);
        }
        start
    }

    fn push(&mut self, span: Span<'static>) {
        self.x = self.x.saturating_add(span_width(&span));
        if let Some(line) = self.lines.last_mut() {
            line.push(span);
        }
    }
}

pub struct QueryBar {
    command_tx: Option<UnboundedSender<Action>>,
    config: Config,
    theme: Theme,
    schema: Schema,
    expressions: Vec<Expression>,
    typed_text: String,
    cursor: EditCursor,
    presenter: OptionPresenter<Candidate>,
    not_editable: HashSet<String>,
    placeholder: String,
    loading: bool,
    spinner: usize,
    area: Rect,
    hits: Vec<(Rect, BarHit)>,
}

impl QueryBar {
    pub fn new(schema: Schema) -> Self {
        let defaults = QueryConfig::default();
        let mut bar = Self {
            command_tx: None,
            config: Config::default(),
            theme: Theme::default(),
            schema,
            expressions: Vec::new(),
            typed_text: String::new(),
            cursor: EditCursor::default(),
            presenter: OptionPresenter::new(defaults.max_visible_options),
            not_editable: defaults.not_editable,
            placeholder: defaults.placeholder,
            loading: false,
            spinner: 0,
            area: Rect::default(),
            hits: Vec::new(),
        };
        bar.set_expressions(Vec::new());
        bar
    }

    pub fn with_expressions(mut self, expressions: Vec<Expression>) -> Self {
        self.set_expressions(expressions);
        self
    }

    /// Replace the local view of the collection and re-derive the cursor.
    pub fn set_expressions(&mut self, expressions: Vec<Expression>) {
        self.cursor = EditCursor::derive(&expressions);
        if expressions.is_empty() {
            self.presenter.set_editable(true);
        }
        self.expressions = expressions;
        self.refresh_options();
    }

    pub fn set_not_editable(&mut self, keys: HashSet<String>) {
        self.not_editable = keys;
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn cursor(&self) -> EditCursor {
        self.cursor
    }

    pub fn presenter(&self) -> &OptionPresenter<Candidate> {
        &self.presenter
    }

    pub fn is_focused(&self) -> bool {
        self.presenter.is_focused()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn focus(&mut self) {
        self.presenter.focus();
    }

    /// Rows needed to show the whole content at `width`, borders included.
    pub fn height_for(&self, width: u16) -> u16 {
        let content_width = width.saturating_sub(2 + INDICATOR_WIDTH);
        let rows = u16::try_from(self.flow(content_width).0.lines.len()).unwrap_or(u16::MAX);
        rows.clamp(1, MAX_CONTENT_ROWS) + 2
    }

    fn is_mandatory(&self, key: &FieldKey) -> bool {
        self.not_editable.contains(&key.to_string())
    }

    fn clearable(&self) -> bool {
        !self.typed_text.is_empty() || self.expressions.iter().any(|expr| !expr.readonly)
    }

    fn refresh_options(&mut self) {
        let typed = self.typed_text.trim();
        let values = self.schema.value_candidates(&self.expressions, self.cursor.index, typed);
        let mut options = Vec::new();
        if values.is_empty() {
            let label = match (self.cursor.part, typed.is_empty()) {
                (EditingPart::FieldValue, false) => format!("{FILTER_GLYPH} Use \"{typed}\""),
                (_, false) => format!("{FILTER_GLYPH} Search \"{typed}\""),
                (_, true) => format!("{FILTER_GLYPH} Search"),
            };
            options.push(SelectOption::new(label, Candidate::Search));
        }
        match self.cursor.part {
            EditingPart::FieldName => options.extend(
                self.schema
                    .name_candidates(typed, &self.expressions)
                    .into_iter()
                    .map(|group| SelectOption::new(group.label.clone(), Candidate::Field(group.key.clone()))),
            ),
            EditingPart::FieldValue => options.extend(
                values
                    .into_iter()
                    .map(|item| SelectOption::new(item.label.clone(), Candidate::Value(item.value.clone()))),
            ),
            EditingPart::None => {}
        }
        self.presenter.set_options(options);
    }

    fn emit(&self, action: Action) -> Result<()> {
        if let Some(tx) = &self.command_tx {
            tx.send(action)?;
        }
        Ok(())
    }

    fn typed_text_changed(&self, at: EditCursor) -> Action {
        Action::TypedTextChanged { text: self.typed_text.clone(), index: at.index, part: at.part }
    }

    /// Apply `next` locally, optionally replace the typed text, and report both.
    /// The typed-text notice carries the cursor the text was edited at.
    fn commit(&mut self, next: Vec<Expression>, typed: Option<String>) -> Result<()> {
        let edited_at = self.cursor;
        self.set_expressions(next);
        if let Some(text) = typed {
            self.presenter.set_value(text.clone());
            self.typed_text = text;
            self.refresh_options();
            self.emit(self.typed_text_changed(edited_at))?;
        }
        info!(
            expressions = self.expressions.len(),
            index = self.cursor.index,
            part = %self.cursor.part,
            "expressions changed"
        );
        self.emit(Action::ExpressionsChanged(self.expressions.clone()))
    }

    /// New typed text from the input.
    pub fn input(&mut self, text: String) -> Result<()> {
        debug!(%text, "typed text changed");
        self.presenter.set_value(text.clone());
        self.typed_text = text;
        self.refresh_options();
        self.emit(self.typed_text_changed(self.cursor))
    }

    /// Commit a picked option at the cursor.
    pub fn select(&mut self, candidate: Candidate) -> Result<()> {
        let index = self.cursor.index;
        match self.cursor.part {
            EditingPart::FieldName => {
                let key = match candidate {
                    Candidate::Search => {
                        info!(text = %self.typed_text, "free-text search");
                        return self.emit(Action::Search(self.typed_text.clone()));
                    }
                    Candidate::Field(key) => key,
                    Candidate::Value(_) => return Ok(()),
                };
                let Some(group) = self.schema.find_group(&key) else {
                    debug!(%key, "selected field is not in the schema");
                    return Ok(());
                };
                let mut next = self.expressions.clone();
                let expr = group.expression();
                if index < next.len() {
                    next[index] = expr;
                } else {
                    next.push(expr);
                }
                self.commit(next, Some(String::new()))?;
                self.presenter.set_editable(!self.is_mandatory(&key));
            }
            EditingPart::FieldValue => {
                let Some(group) = self
                    .expressions
                    .get(index)
                    .and_then(|expr| self.schema.find_group(&expr.name))
                else {
                    debug!(index, "no group for the edited expression");
                    return Ok(());
                };
                let item = match &candidate {
                    Candidate::Value(raw) => group.find_item(raw),
                    _ => None,
                };
                let value = match item {
                    Some(item) => FieldValue(item.label.clone(), item.value.clone()),
                    None if !self.typed_text.is_empty() => FieldValue::text(self.typed_text.clone()),
                    None => return Ok(()),
                };
                let mut next = self.expressions.clone();
                next[index].value = vec![value];
                self.commit(next, Some(String::new()))?;
                self.presenter.set_editable(true);
            }
            EditingPart::None => return Ok(()),
        }
        self.presenter.focus();
        Ok(())
    }

    /// Backspace pressed. Only acts when the typed text is already empty.
    pub fn backspace(&mut self) -> Result<()> {
        if !self.typed_text.is_empty() {
            return Ok(());
        }
        let Some(last) = self.expressions.last() else {
            return Ok(());
        };

        if self.is_mandatory(&last.name) {
            self.presenter.set_editable(false);
            if last.value.is_empty() {
                return Ok(());
            }
            debug!(key = %last.name, "clearing mandatory value");
            let mut next = self.expressions.clone();
            if let Some(last) = next.last_mut() {
                last.value.clear();
            }
            return self.commit(next, None);
        }

        let index = self.cursor.index;
        let mut next = self.expressions.clone();
        let typed = match self.cursor.part {
            EditingPart::FieldValue => {
                if next.get(index).is_none_or(|expr| expr.readonly) {
                    return Ok(());
                }
                debug!(index, "removing expression");
                next.remove(index);
                None
            }
            EditingPart::FieldName => {
                let Some(previous) = index.checked_sub(1).and_then(|i| next.get_mut(i)) else {
                    return Ok(());
                };
                if previous.readonly {
                    return Ok(());
                }
                debug!(index = index - 1, "reopening value");
                let restored = previous.display_text().map(str::to_string);
                previous.value.clear();
                restored
            }
            EditingPart::None => return Ok(()),
        };
        let editable = next.last().is_none_or(|expr| !self.is_mandatory(&expr.name));
        self.commit(next, typed)?;
        self.presenter.set_editable(editable);
        Ok(())
    }

    /// Focus left the input: a pending value is committed, matched against the items first.
    pub fn blur(&mut self) -> Result<()> {
        if self.typed_text.trim().is_empty() || self.cursor.part != EditingPart::FieldValue {
            return Ok(());
        }
        let index = self.cursor.index;
        let Some(expr) = self.expressions.get(index).filter(|expr| !expr.readonly) else {
            return Ok(());
        };
        let Some(group) = self.schema.find_group(&expr.name) else {
            return Ok(());
        };
        let value = group
            .match_text(&self.typed_text)
            .map(|item| FieldValue(item.label.clone(), item.value.clone()))
            .unwrap_or_else(|| FieldValue::text(self.typed_text.clone()));
        let mut next = self.expressions.clone();
        next[index].value = vec![value];
        self.commit(next, Some(String::new()))
    }

    /// Keep only the readonly expressions.
    pub fn clear(&mut self) -> Result<()> {
        let next = self.expressions.iter().filter(|expr| expr.readonly).cloned().collect();
        self.presenter.set_editable(true);
        self.commit(next, Some(String::new()))
    }

    /// Edit the value of an existing expression, starting from its current text.
    pub fn click_field(&mut self, index: usize) -> Result<()> {
        self.presenter.focus();
        let Some(expr) = self.expressions.get(index) else {
            return Ok(());
        };
        if expr.readonly || self.is_mandatory(&expr.name) {
            return Ok(());
        }
        if let Some(text) = expr.display_text() {
            self.typed_text = text.to_string();
            self.presenter.set_value(text);
        }
        self.cursor = EditCursor::new(index, EditingPart::FieldValue);
        self.refresh_options();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.presenter.focus();
        if self.expressions.get(index).is_none_or(|expr| expr.readonly) {
            return Ok(());
        }
        let mut next = self.expressions.clone();
        next.remove(index);
        self.commit(next, Some(String::new()))
    }

    /// Advance the comparison operator of an expression that has one.
    pub fn cycle_symbol(&mut self, index: usize) -> Result<()> {
        let Some(symbol) = self
            .expressions
            .get(index)
            .filter(|expr| !expr.readonly)
            .and_then(|expr| expr.symbol)
        else {
            return Ok(());
        };
        let mut next = self.expressions.clone();
        next[index].symbol = Some(symbol.next());
        self.commit(next, Some(String::new()))
    }

    fn run_deferred(&mut self) -> Result<()> {
        if let Some(candidate) = self.presenter.take_deferred() {
            self.select(candidate)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, events: Vec<PresenterEvent<Candidate>>) -> Result<()> {
        for event in events {
            match event {
                PresenterEvent::Input(text) => self.input(text)?,
                PresenterEvent::Select(candidate) => self.select(candidate)?,
                PresenterEvent::Blur => self.blur()?,
                PresenterEvent::Backspace => self.backspace()?,
                PresenterEvent::SelectionQueued => match &self.command_tx {
                    Some(tx) => tx.send(Action::DeferredSelect)?,
                    None => self.run_deferred()?,
                },
            }
        }
        Ok(())
    }

    fn place_expression(&self, flow: &mut Flow, index: usize, expr: &Expression) {
        let part = if index == self.cursor.index { self.cursor.part } else { EditingPart::None };
        let chunk: Vec<_> = tag_pieces(expr, part)
            .into_iter()
            .map(|piece| {
                let hit = piece.hit.map(|hit| BarHit::Tag(index, hit));
                (piece.span(&self.theme, expr.readonly), hit)
            })
            .collect();
        if !chunk.is_empty() {
            flow.place(chunk);
        }
    }

    /// Lay out tags before the cursor, the input, then the remaining tags.
    /// Returns the flow and the position of the text caret.
    fn flow(&self, width: u16) -> (Flow, Position) {
        let mut flow = Flow::new(width);
        let split = (self.cursor.index + 1).min(self.expressions.len());
        for (index, expr) in self.expressions[..split].iter().enumerate() {
            self.place_expression(&mut flow, index, expr);
        }

        let input = if self.typed_text.is_empty() && self.expressions.is_empty() {
            Span::styled(self.placeholder.clone(), self.theme.placeholder_style())
        } else {
            Span::styled(format!("{} ", self.typed_text), self.theme.normal_style())
        };
        let start = flow.place(vec![(input, None)]);
        let before_caret: String = self.typed_text.chars().take(self.presenter.cursor()).collect();
        let caret = Position::new(start.x.saturating_add(span_width(&Span::raw(before_caret))), start.y);

        for (index, expr) in self.expressions.iter().enumerate().skip(split) {
            self.place_expression(&mut flow, index, expr);
        }
        (flow, caret)
    }
}

impl Component for QueryBar {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.set_placeholder(config.query.placeholder.clone());
        self.not_editable = config.query.not_editable.clone();
        self.presenter.set_max_visible(config.query.max_visible_options);
        let overrides = config.styles.get(&Mode::QueryBar).cloned().unwrap_or_default();
        self.theme = Theme::named(&config.query.theme).with_overrides(overrides);
        self.config = config;
        Ok(())
    }

    fn handle_events(&mut self, event: Option<Event>) -> Result<Option<Action>> {
        match event {
            Some(Event::Key(key)) => self.handle_key_event(key),
            Some(Event::Mouse(mouse)) => self.handle_mouse_event(mouse),
            Some(Event::Paste(text)) => {
                let events = self.presenter.handle_paste(&text);
                self.dispatch(events)?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if !self.presenter.is_focused() {
            if self.config.action_for_key(Mode::QueryBar, key) == Some(Action::FocusQueryBar) {
                self.focus();
            }
            return Ok(None);
        }
        let events = self.presenter.handle_key(key);
        self.dispatch(events)?;
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let position = Position::new(mouse.column, mouse.row);
        if mouse.kind == MouseEventKind::Down(MouseButton::Left) && self.area.contains(position) {
            let hit = self
                .hits
                .iter()
                .find(|(rect, _)| rect.contains(position))
                .map(|(_, hit)| *hit);
            match hit {
                Some(BarHit::Tag(index, TagHit::Label | TagHit::Value)) => self.click_field(index)?,
                Some(BarHit::Tag(index, TagHit::Symbol)) => self.cycle_symbol(index)?,
                Some(BarHit::Tag(index, TagHit::Remove)) => self.remove(index)?,
                Some(BarHit::Clear) => {
                    self.focus();
                    self.clear()?;
                }
                None => self.focus(),
            }
            return Ok(None);
        }
        let events = self.presenter.handle_mouse(mouse);
        self.dispatch(events)?;
        Ok(None)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::SyncExpressions(expressions) => self.set_expressions(expressions),
            Action::DeferredSelect => self.run_deferred()?,
            Action::ClearExpressions => self.clear()?,
            Action::FocusQueryBar => self.focus(),
            Action::SetLoading(loading) => self.set_loading(loading),
            Action::Tick if self.loading => self.spinner = (self.spinner + 1) % SPINNER.len(),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        self.area = area;
        self.presenter.set_anchor(area);
        let focused = self.presenter.is_focused();
        let block = Block::default()
            .title(" Query ")
            .borders(Borders::ALL)
            .border_style(if focused { self.theme.focused_border_style() } else { self.theme.border_style() });
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let [content, indicators] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(INDICATOR_WIDTH)]).areas(inner);

        let (flow, caret) = self.flow(content.width);
        // keep the input row in view when the tags wrap past the available height
        let scroll = caret.y.saturating_sub(content.height.saturating_sub(1));
        let lines: Vec<Line> = flow.lines.into_iter().map(Line::from).collect();
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), content);
        self.hits = flow
            .hits
            .into_iter()
            .filter(|(rect, _)| rect.y >= scroll && rect.y - scroll < content.height)
            .map(|(rect, hit)| {
                (Rect::new(content.x.saturating_add(rect.x), content.y + rect.y - scroll, rect.width, 1), hit)
            })
            .collect();

        let mut spans = Vec::new();
        if self.clearable() {
            self.hits.push((Rect::new(indicators.x, indicators.y, 1, 1), BarHit::Clear));
            spans.push(Span::styled(CLEAR_GLYPH, self.theme.border_style()));
            spans.push(Span::raw(" "));
        }
        if self.loading {
            spans.push(Span::styled(SPINNER[self.spinner], self.theme.warning_style()));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(FILTER_GLYPH, self.theme.info_style()));
        frame.render_widget(Paragraph::new(Line::from(spans)), indicators);

        let caret_x = content.x.saturating_add(caret.x.min(content.width.saturating_sub(1)));
        if focused && caret.y >= scroll {
            frame.set_cursor_position(Position::new(caret_x, content.y + caret.y - scroll));
        }
        let bounds = frame.area();
        self.presenter
            .render_list(frame.buffer_mut(), bounds, caret_x, &self.theme);
        Ok(())
    }
}
