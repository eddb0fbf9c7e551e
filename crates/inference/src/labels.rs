use crate::error::LabelError;
use std::path::Path;

/// Row 0 of an SSD label map is the background class.
pub const BACKGROUND_CLASS: i64 = 0;
pub const UNKNOWN_LABEL: &str = "unknown";

/// Newline-delimited class names; the row index is the model's class id.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn parse(text: &str) -> Self {
        let mut labels: Vec<String> = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        // A trailing newline does not add a class
        if labels.last().is_some_and(|l| l.is_empty()) {
            labels.pop();
        }

        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text);
        tracing::info!(path = %path.display(), classes = table.len(), "Loaded label table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Map a float-encoded class id to its label.
    ///
    /// Returns `Ok(None)` for the background class, which callers skip.
    pub fn resolve(&self, class_value: f32) -> Result<Option<&str>, LabelError> {
        let id = class_value.round() as i64;
        if id == BACKGROUND_CLASS {
            return Ok(None);
        }

        usize::try_from(id)
            .ok()
            .and_then(|idx| self.labels.get(idx))
            .map(|label| Some(label.as_str()))
            .ok_or(LabelError::UnknownLabel(id))
    }
}
