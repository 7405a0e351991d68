//! Shows what the query bar currently produces: the serialized query,
//! the searches that were submitted and the text being typed.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use serde_json::{Map, Value};

use super::Component;
use crate::{
    action::Action,
    config::{Config, Mode},
    expression::{EditingPart, Expression},
    serializer::{MultiValuePolicy, serialize},
    theme::Theme,
};

const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub at: DateTime<Local>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct QueryPreview {
    policy: MultiValuePolicy,
    theme: Theme,
    query: Map<String, Value>,
    searches: VecDeque<SearchEntry>,
    typed: Option<(String, usize, EditingPart)>,
}

impl QueryPreview {
    pub fn new(policy: MultiValuePolicy) -> Self {
        Self { policy, ..Default::default() }
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn searches(&self) -> impl Iterator<Item = &SearchEntry> {
        self.searches.iter()
    }

    fn set_expressions(&mut self, expressions: &[Expression]) {
        self.query = serialize(expressions, &self.policy);
    }

    fn record_search(&mut self, text: String) {
        // newest first
        self.searches.push_front(SearchEntry { at: Local::now(), text });
        self.searches.truncate(HISTORY_LIMIT);
    }

    fn query_text(&self) -> String {
        serde_json::to_string_pretty(&self.query).unwrap_or_else(|e| format!("<{e}>"))
    }
}

impl Component for QueryPreview {
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        let overrides = config.styles.get(&Mode::QueryBar).cloned().unwrap_or_default();
        self.theme = Theme::named(&config.query.theme).with_overrides(overrides);
        self.policy = config.query.multi_value_keys;
        Ok(())
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::SyncExpressions(expressions) => self.set_expressions(&expressions),
            Action::Search(text) => self.record_search(text),
            Action::TypedTextChanged { text, index, part } => {
                self.typed = (!text.is_empty()).then_some((text, index, part));
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let [query_area, history_area] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);

        let mut block = Block::default().title(" Query ").borders(Borders::ALL).border_style(self.theme.border_style());
        if let Some((text, index, part)) = &self.typed {
            block = block.title_bottom(Line::from(Span::styled(
                format!(" typing \"{text}\" at #{index} ({part}) "),
                self.theme.info_style(),
            )));
        }
        let query = Paragraph::new(self.query_text())
            .style(self.theme.normal_style())
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(query, query_area);

        let items: Vec<ListItem> = self
            .searches
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(entry.at.format("%H:%M:%S ").to_string(), self.theme.placeholder_style()),
                    Span::styled(entry.text.clone(), self.theme.normal_style()),
                ]))
            })
            .collect();
        let history = List::new(items)
            .block(Block::default().title(" Searches ").borders(Borders::ALL).border_style(self.theme.border_style()));
        frame.render_widget(history, history_area);
        Ok(())
    }
}
