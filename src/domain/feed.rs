use serde::{Deserialize, Serialize};

/// Feed-level metadata persisted as `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
    pub link: String,
}

impl FeedMeta {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            link: link.into(),
        }
    }

    /// Returns a copy with every field present in `update` replaced.
    pub fn apply(&self, update: &FeedUpdate) -> Self {
        Self {
            title: update.title.clone().unwrap_or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            link: update.link.clone().unwrap_or_else(|| self.link.clone()),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled feed)"
        } else {
            &self.title
        }
    }
}

/// Feed-level fields as found in a parsed document; absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}
