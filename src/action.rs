use serde::{Deserialize, Serialize};
use strum::Display;

use crate::expression::{EditingPart, Expression};

/// High-level actions that can be triggered by UI or components.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    ClearScreen,
    Error(String),
    ToggleInstructions,
    /// Move keyboard focus into the query bar input
    FocusQueryBar,
    /// Drop every expression that is not readonly
    ClearExpressions,
    /// Copy the serialized query to the clipboard
    CopyQuery,
    /// Commit the selection parked by the option list on Enter
    DeferredSelect,
    /// The query bar produced a new expression collection
    ExpressionsChanged(Vec<Expression>),
    /// The host pushes its expression collection back into the query bar
    SyncExpressions(Vec<Expression>),
    /// The text typed in the query bar changed
    TypedTextChanged {
        text: String,
        index: usize,
        part: EditingPart,
    },
    /// Free-text search committed from the field-name position
    Search(String),
    SetLoading(bool),
}
