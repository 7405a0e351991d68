//! A keyboard-first query-expression builder for the terminal.
//!
//! Expressions are edited in a [`components::query_bar::QueryBar`] against a
//! field [`schema::Schema`] and flattened into a JSON query by
//! [`serializer::serialize`].

pub mod action;
pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod errors;
pub mod expression;
pub mod logging;
pub mod schema;
pub mod serializer;
pub mod theme;
pub mod tui;
