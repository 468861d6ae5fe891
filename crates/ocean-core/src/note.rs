use serde::{Deserialize, Serialize};

/// A single note as held by the store and written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
    #[serde(default)]
    pub pinned: bool,
}

/// A one-line view of a note for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub content_preview: String,
    pub updated_at: i64,
    pub pinned: bool,
}

/// Fields to change on an existing note. `None` leaves the field as is.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
}

impl NotePatch {
    /// Patch replacing both text fields, as submitted by the editor.
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            pinned: None,
        }
    }

    /// Merge into `note`. Does not touch `id` or `updated_at`.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(ref title) = self.title {
            note.title = title.clone();
        }
        if let Some(ref content) = self.content {
            note.content = content.clone();
        }
        if let Some(pinned) = self.pinned {
            note.pinned = pinned;
        }
    }
}

impl Note {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    pub fn display_content(&self) -> &str {
        if self.content.is_empty() {
            "No content"
        } else {
            &self.content
        }
    }

    /// Case-insensitive substring match over title or content.
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }

    /// Convert to summary with truncated content preview.
    pub fn to_summary(&self, max_len: usize) -> NoteSummary {
        // Convert newlines to spaces and take first max_len characters
        let normalized: String = self
            .content
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let trimmed = normalized.trim();

        let content_preview = if trimmed.chars().count() > max_len {
            let cut: String = trimmed.chars().take(max_len).collect();
            format!("{}...", cut.trim_end())
        } else {
            trimmed.to_string()
        };

        NoteSummary {
            id: self.id.clone(),
            title: self.display_title().to_string(),
            content_preview,
            updated_at: self.updated_at,
            pinned: self.pinned,
        }
    }
}
