//! Drives the query bar through key, paste and mouse events the way the host does,
//! feeding every reported collection back into the bar.

use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use pretty_assertions::assert_eq;
use querybar::{
    action::Action,
    components::{Component, query_bar::QueryBar},
    expression::{EditCursor, EditingPart, Expression},
    schema::Schema,
    serializer::{MultiValuePolicy, serialize},
    tui::Event,
};
use ratatui::{Terminal, backend::TestBackend, layout::Rect};
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

const SCHEMA: &str = r#"{
    groups: [
        { label: "Status", key: "status", unique: true,
          items: [{ label: "Open", value: "open" }, { label: "Closed", value: "closed" }] },
        { label: "Tag", key: "tag",
          items: [{ label: "bug", value: "bug" }, { label: "feature", value: "feature" }] },
        { label: "Severity", key: "severity", unique: true,
          items: [{ label: "Critical", value: 1 }, { label: "Minor", value: 3 }] },
    ],
}"#;

struct Host {
    bar: QueryBar,
    rx: UnboundedReceiver<Action>,
    expressions: Vec<Expression>,
    changes: usize,
    searches: Vec<String>,
}

impl Host {
    fn new(expressions: Vec<Expression>) -> Self {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let (tx, rx) = unbounded_channel();
        let mut bar = QueryBar::new(schema).with_expressions(expressions.clone());
        bar.register_action_handler(tx).unwrap();
        bar.set_not_editable(HashSet::from(["severity".to_string()]));
        bar.focus();
        Self { bar, rx, expressions, changes: 0, searches: Vec::new() }
    }

    fn pump(&mut self) {
        while let Ok(action) = self.rx.try_recv() {
            match action {
                Action::ExpressionsChanged(expressions) => {
                    self.changes += 1;
                    self.expressions = expressions.clone();
                    self.bar.update(Action::SyncExpressions(expressions)).unwrap();
                }
                Action::DeferredSelect => {
                    self.bar.update(Action::DeferredSelect).unwrap();
                }
                Action::Search(text) => self.searches.push(text),
                _ => {}
            }
        }
    }

    fn press(&mut self, code: KeyCode) {
        self.bar.handle_events(Some(Event::Key(KeyEvent::from(code)))).unwrap();
        self.pump();
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    /// Type a field name and pick it from the list; the search entry is listed first.
    fn pick_field(&mut self, label: &str) {
        self.type_text(label);
        self.press(KeyCode::Down);
        self.press(KeyCode::Enter);
    }

    fn query(&self) -> Value {
        let policy: MultiValuePolicy = ["tag"].into_iter().collect();
        Value::Object(serialize(&self.expressions, &policy))
    }
}

fn build_status_and_tag(host: &mut Host) {
    host.pick_field("Sta");
    host.press(KeyCode::Enter);
    host.pick_field("Tag");
    host.press(KeyCode::Enter);
}

#[test]
fn builds_query_from_keyboard() {
    let mut host = Host::new(vec![]);
    build_status_and_tag(&mut host);
    assert_eq!(
        host.expressions,
        vec![
            Expression::new("Status", "status").with_value("Open", "open"),
            Expression::new("Tag", "tag").with_value("bug", "bug"),
        ]
    );
    assert_eq!(host.query(), json!({"status": "open", "tag": ["bug"]}));
    assert_eq!(host.bar.cursor(), EditCursor::new(2, EditingPart::FieldName));
}

#[test]
fn backspace_reopens_then_deletes() {
    let mut host = Host::new(vec![]);
    build_status_and_tag(&mut host);

    host.press(KeyCode::Backspace);
    assert_eq!(host.bar.typed_text(), "bug");
    assert_eq!(host.bar.cursor(), EditCursor::new(1, EditingPart::FieldValue));
    assert_eq!(host.expressions.len(), 2);

    let before = host.changes;
    for _ in 0..3 {
        host.press(KeyCode::Backspace);
    }
    assert_eq!(host.bar.typed_text(), "");
    assert_eq!(host.changes, before);

    host.press(KeyCode::Backspace);
    assert_eq!(host.expressions, vec![Expression::new("Status", "status").with_value("Open", "open")]);
}

#[test]
fn escape_commits_free_text_once() {
    let mut host = Host::new(vec![Expression::new("Status", "status").with_value("Open", "open")]);
    host.pick_field("Tag");
    let before = host.changes;
    host.type_text("regress");
    host.press(KeyCode::Esc);
    assert_eq!(host.changes, before + 1);
    assert_eq!(host.expressions[1], Expression::new("Tag", "tag").with_value("regress", "regress"));
    assert!(!host.bar.presenter().is_visible());
}

#[test]
fn enter_on_search_entry_reports_free_text() {
    let mut host = Host::new(vec![]);
    host.type_text("hello world");
    host.press(KeyCode::Enter);
    assert_eq!(host.searches, vec!["hello world".to_string()]);
    assert!(host.expressions.is_empty());
    assert_eq!(host.changes, 0);
}

#[test]
fn paste_flattens_newlines() {
    let mut host = Host::new(vec![]);
    host.bar.handle_events(Some(Event::Paste("two\nlines".into()))).unwrap();
    host.pump();
    assert_eq!(host.bar.typed_text(), "two lines");
}

#[test]
fn mandatory_field_survives_backspace() {
    let mut host = Host::new(vec![]);
    host.pick_field("Sev");
    assert!(!host.bar.presenter().is_editable());
    host.press(KeyCode::Char('x'));
    assert_eq!(host.bar.typed_text(), "");

    host.press(KeyCode::Enter);
    assert_eq!(host.query(), json!({"severity": 1}));

    host.press(KeyCode::Backspace);
    host.press(KeyCode::Backspace);
    assert_eq!(host.expressions, vec![Expression::new("Severity", "severity")]);
}

#[test]
fn ctrl_chords_do_not_type() {
    let mut host = Host::new(vec![]);
    host.bar
        .handle_events(Some(Event::Key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL))))
        .unwrap();
    host.pump();
    assert_eq!(host.bar.typed_text(), "");
}

#[test]
fn clear_indicator_keeps_readonly() {
    let project = Expression::new("Project", "project").with_value("core", "core").readonly();
    let mut host = Host::new(vec![project.clone(), Expression::new("Status", "status").with_value("Open", "open")]);
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
    terminal
        .draw(|frame| host.bar.draw(frame, Rect::new(0, 0, 60, 3)).unwrap())
        .unwrap();

    // the clear glyph opens the indicator column at the right of the content
    let click = MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: 53,
        row: 1,
        modifiers: KeyModifiers::empty(),
    };
    host.bar.handle_events(Some(Event::Mouse(click))).unwrap();
    host.pump();
    assert_eq!(host.expressions, vec![project]);
}
