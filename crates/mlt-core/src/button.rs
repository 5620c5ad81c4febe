//! Inline buttons handed to the renderer: a label and an opaque callback payload.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    /// Callback payload sent back verbatim when the button is pressed.
    pub action: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Find a button by label (renderers and tests look buttons up this way).
pub fn find<'a>(buttons: &'a [Button], label: &str) -> Option<&'a Button> {
    buttons.iter().find(|b| b.label == label)
}
