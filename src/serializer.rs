//! Flattens an expression collection into a query map.

use std::collections::HashSet;

use derive_deref::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::expression::Expression;

/// Field keys whose values accumulate into an array instead of overwriting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiValuePolicy(pub HashSet<String>);

impl<S: Into<String>> FromIterator<S> for MultiValuePolicy {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Build `{key: value}` from the completed expressions.
///
/// Expressions without a value are skipped and only the first raw value of each
/// expression is used. Keys in `policy` collect every value in encounter order;
/// other keys keep the last value written.
pub fn serialize(expressions: &[Expression], policy: &MultiValuePolicy) -> Map<String, Value> {
    let mut query = Map::new();
    for expr in expressions {
        let Some(raw) = expr.first_raw() else {
            continue;
        };
        let key = expr.name.to_string();
        let value = Value::from(raw);
        if policy.contains(&key) {
            let slot = query.entry(key).or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(values) => values.push(value),
                other => *other = Value::Array(vec![value]),
            }
        } else {
            query.insert(key, value);
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn expr(key: &str, value: &str) -> Expression {
        Expression::new(key, key).with_value(value, value)
    }

    #[test]
    fn test_multi_value_keys_accumulate() {
        let exprs = vec![expr("task1", "A"), expr("task2", "B"), expr("task2", "C")];
        let policy: MultiValuePolicy = ["task2"].into_iter().collect();
        assert_eq!(Value::Object(serialize(&exprs, &policy)), json!({"task1": "A", "task2": ["B", "C"]}));
    }

    #[test]
    fn test_expression_without_value_contributes_nothing() {
        let exprs = vec![expr("a", "1"), Expression::new("B", "b")];
        let query = serialize(&exprs, &MultiValuePolicy::default());
        assert_eq!(Value::Object(query), json!({"a": "1"}));
    }

    #[test]
    fn test_scalar_key_last_write_wins() {
        let exprs = vec![expr("a", "1"), expr("a", "2")];
        let query = serialize(&exprs, &MultiValuePolicy::default());
        assert_eq!(Value::Object(query), json!({"a": "2"}));
    }

    #[test]
    fn test_raw_values_keep_their_type() {
        let exprs = vec![
            Expression::new("Level", 5i64).with_value("Critical", 4i64),
            Expression::new("Muted", "muted").with_value("Yes", true),
        ];
        let query = serialize(&exprs, &MultiValuePolicy::default());
        assert_eq!(Value::Object(query), json!({"5": 4, "muted": true}));
    }

    #[test]
    fn test_keys_keep_encounter_order() {
        let exprs = vec![expr("z", "1"), expr("a", "2"), expr("m", "3")];
        let keys: Vec<String> = serialize(&exprs, &MultiValuePolicy::default()).keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
