use std::fmt;

use serde::{Deserialize, Serialize};

/// The three independent clustering contexts of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Reference pronunciations.
    Model,
    /// Accepted attempts.
    Success,
    /// Rejected attempts.
    Failure,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Model, LayerKind::Success, LayerKind::Failure];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Model => "model",
            LayerKind::Success => "success",
            LayerKind::Failure => "failure",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
