//! Declarative schema of selectable field names (groups) and field values (items).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expression::{Expression, FieldKey, RawValue, Symbol};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to load schema from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
    #[error("failed to parse schema: {0}")]
    Parse(#[from] json5::Error),
    #[error("duplicate group key `{0}`")]
    DuplicateGroup(FieldKey),
    #[error("group `{group}` declares value `{value}` more than once")]
    DuplicateItem { group: FieldKey, value: String },
}

/// Field-value option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub label: String,
    pub value: RawValue,
}

impl Item {
    pub fn new(label: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// Field-name option with its value options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
    pub key: FieldKey,
    /// At most one expression may use this key.
    #[serde(default)]
    pub unique: bool,
    /// Expressions of this field carry a comparison operator.
    #[serde(default)]
    pub symbol: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Group {
    pub fn new(label: impl Into<String>, key: impl Into<FieldKey>) -> Self {
        Self { label: label.into(), key: key.into(), unique: false, symbol: false, items: Vec::new() }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_symbol(mut self) -> Self {
        self.symbol = true;
        self
    }

    /// Fresh expression for this field, value still to be chosen.
    pub fn expression(&self) -> Expression {
        let expr = Expression::new(self.label.clone(), self.key.clone());
        if self.symbol { expr.with_symbol(Symbol::Eq) } else { expr }
    }

    pub fn item(mut self, label: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.items.push(Item::new(label, value));
        self
    }

    pub fn find_item(&self, value: &RawValue) -> Option<&Item> {
        self.items.iter().find(|item| &item.value == value)
    }

    /// Item whose label, or whose value written as text, equals `text`.
    pub fn match_text(&self, text: &str) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| item.label == text || item.value.to_string() == text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub groups: Vec<Group>,
}

fn label_matches(label: &str, typed: &str) -> bool {
    let typed = typed.trim();
    typed.is_empty() || label.contains(typed)
}

impl Schema {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Load a schema file; the format follows the file extension.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let load_error = |source| SchemaError::Load { path: path.to_path_buf(), source };
        let schema: Schema = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()
            .map_err(load_error)?
            .try_deserialize()
            .map_err(load_error)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json5(raw: &str) -> Result<Self, SchemaError> {
        let schema: Schema = json5::from_str(raw)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut keys = HashSet::new();
        for group in &self.groups {
            if !keys.insert(&group.key) {
                return Err(SchemaError::DuplicateGroup(group.key.clone()));
            }
            let mut values = HashSet::new();
            for item in &group.items {
                let value = item.value.to_string();
                if !values.insert(value.clone()) {
                    return Err(SchemaError::DuplicateItem { group: group.key.clone(), value });
                }
            }
        }
        Ok(())
    }

    pub fn find_group(&self, key: &FieldKey) -> Option<&Group> {
        self.groups.iter().find(|group| &group.key == key)
    }

    /// Groups whose label contains the typed text, minus unique groups already in use.
    pub fn name_candidates(&self, typed: &str, expressions: &[Expression]) -> Vec<&Group> {
        self.groups
            .iter()
            .filter(|group| !(group.unique && expressions.iter().any(|expr| expr.name == group.key)))
            .filter(|group| label_matches(&group.label, typed))
            .collect()
    }

    /// Items of the group behind `expressions[index]` whose label contains the typed text.
    pub fn value_candidates(&self, expressions: &[Expression], index: usize, typed: &str) -> Vec<&Item> {
        let Some(group) = expressions.get(index).and_then(|expr| self.find_group(&expr.name)) else {
            return Vec::new();
        };
        group.items.iter().filter(|item| label_matches(&item.label, typed)).collect()
    }
}
