//! Label Text - Short Overlay Captions

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Maximum number of characters a label may hold.
pub const MAX_LABEL_CHARS: usize = 3;

/// A caption of at most [`MAX_LABEL_CHARS`] characters.
///
/// Longer input is truncated on construction. Case is preserved as typed and
/// folded to uppercase only when rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelText(String);

impl LabelText {
    pub fn new(input: &str) -> Self {
        Self(input.chars().take(MAX_LABEL_CHARS).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when there is nothing visible to draw.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Text as drawn on the artifact, or `None` when the overlay is suppressed.
    pub fn rendered(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.0.to_uppercase())
        }
    }
}

impl From<&str> for LabelText {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for LabelText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

impl fmt::Display for LabelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
