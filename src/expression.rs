//! Filter-condition data shapes shared by the query bar, the serializer and the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Machine key of a field. Keys may be textual or integral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    Number(i64),
    Text(String),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Number(n) => write!(f, "{n}"),
            FieldKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        FieldKey::Text(value.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        FieldKey::Text(value)
    }
}

impl From<i64> for FieldKey {
    fn from(value: i64) -> Self {
        FieldKey::Number(value)
    }
}

/// Raw (machine) value stored alongside the display text of a field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value.into())
    }
}

impl From<&RawValue> for serde_json::Value {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Bool(b) => serde_json::Value::Bool(*b),
            RawValue::Number(n) => serde_json::Value::Number(n.clone()),
            RawValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// `(display text, raw value)`, serialized as a two element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue(pub String, pub RawValue);

impl FieldValue {
    pub fn new(display: impl Into<String>, raw: impl Into<RawValue>) -> Self {
        Self(display.into(), raw.into())
    }

    /// Free text entered by the user: display and raw value are the same string.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self(text.clone(), RawValue::Text(text))
    }

    pub fn display(&self) -> &str {
        &self.0
    }

    pub fn raw(&self) -> &RawValue {
        &self.1
    }
}

/// Comparison operator of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Eq,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    Ne,
}

impl Symbol {
    /// Next operator in the `= > < !=` cycle.
    pub fn next(self) -> Self {
        match self {
            Symbol::Eq => Symbol::Gt,
            Symbol::Gt => Symbol::Lt,
            Symbol::Lt => Symbol::Ne,
            Symbol::Ne => Symbol::Eq,
        }
    }
}

/// One filter condition: field name, optional comparison symbol and field value.
///
/// An empty `label` means the field name has not been chosen yet, an empty
/// `value` means the value has not been chosen yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(default)]
    pub label: String,
    pub name: FieldKey,
    #[serde(default)]
    pub value: Vec<FieldValue>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
}

impl Expression {
    /// An expression with a chosen field and no value yet.
    pub fn new(label: impl Into<String>, name: impl Into<FieldKey>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            value: Vec::new(),
            readonly: false,
            symbol: None,
        }
    }

    pub fn with_value(mut self, display: impl Into<String>, raw: impl Into<RawValue>) -> Self {
        self.value = vec![FieldValue::new(display, raw)];
        self
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// True while the field name is still blank.
    pub fn lacks_label(&self) -> bool {
        self.label.trim().is_empty()
    }

    /// Display text of the first value, if any.
    pub fn display_text(&self) -> Option<&str> {
        self.value.first().map(FieldValue::display)
    }

    pub fn first_raw(&self) -> Option<&RawValue> {
        self.value.first().map(FieldValue::raw)
    }
}

/// Which part of an expression is being edited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EditingPart {
    #[default]
    None,
    FieldName,
    FieldValue,
}

/// Position of the live input within the expression collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EditCursor {
    pub index: usize,
    pub part: EditingPart,
}

impl EditCursor {
    pub fn new(index: usize, part: EditingPart) -> Self {
        Self { index, part }
    }

    /// Derive the cursor from the collection.
    ///
    /// The first expression with a blank label is edited by name, else the first
    /// one without a value is edited by value, else a new expression is appended.
    pub fn derive(expressions: &[Expression]) -> Self {
        if let Some(index) = expressions.iter().position(Expression::lacks_label) {
            return Self::new(index, EditingPart::FieldName);
        }
        if let Some(index) = expressions.iter().position(|expr| expr.value.is_empty()) {
            return Self::new(index, EditingPart::FieldValue);
        }
        Self::new(expressions.len(), EditingPart::FieldName)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn complete(key: &str, value: &str) -> Expression {
        Expression::new(key.to_uppercase(), key).with_value(value, value)
    }

    #[test]
    fn test_cursor_on_empty_collection_appends() {
        assert_eq!(EditCursor::derive(&[]), EditCursor::new(0, EditingPart::FieldName));
    }

    #[test]
    fn test_cursor_prefers_blank_label_over_missing_value() {
        let exprs = vec![
            Expression::new("Status", "status"),
            Expression::new("  ", "owner"),
        ];
        assert_eq!(EditCursor::derive(&exprs), EditCursor::new(1, EditingPart::FieldName));
    }

    #[test]
    fn test_cursor_targets_first_missing_value() {
        let exprs = vec![complete("a", "1"), Expression::new("B", "b"), complete("c", "3")];
        assert_eq!(EditCursor::derive(&exprs), EditCursor::new(1, EditingPart::FieldValue));
    }

    #[test]
    fn test_cursor_complete_collection_points_past_end() {
        let exprs = vec![complete("a", "1"), complete("b", "2")];
        assert_eq!(EditCursor::derive(&exprs), EditCursor::new(2, EditingPart::FieldName));
    }

    #[test]
    fn test_cursor_derivation_is_idempotent() {
        let collections = vec![
            vec![],
            vec![complete("a", "1")],
            vec![complete("a", "1"), Expression::new("B", "b")],
            vec![Expression::new("", "x"), Expression::new("B", "b")],
        ];
        for exprs in collections {
            assert_eq!(EditCursor::derive(&exprs), EditCursor::derive(&exprs));
        }
    }

    #[test]
    fn test_symbol_cycle_wraps() {
        assert_eq!(Symbol::Eq.next(), Symbol::Gt);
        assert_eq!(Symbol::Ne.next(), Symbol::Eq);
        assert_eq!(Symbol::Ne.to_string(), "!=");
    }

    #[test]
    fn test_expression_json_shape() {
        let expr = Expression::new("Priority", 7i64).with_value("High", 3i64).with_symbol(Symbol::Gt);
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "label": "Priority",
                "name": 7,
                "value": [["High", 3]],
                "readonly": false,
                "symbol": ">"
            })
        );
        let back: Expression = serde_json::from_value(json).unwrap();
        assert_eq!(back, expr);
    }
}
