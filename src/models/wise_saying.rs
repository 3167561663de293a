//! The wise saying entity.

use serde::{Deserialize, Serialize};

/// A quote and its author. An `id` of 0 marks an entity that was never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiseSaying {
    #[serde(default)]
    pub id: i64,
    pub content: String,
    pub author: String,
}

impl WiseSaying {
    /// Create an unsaved wise saying.
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: 0,
            content: content.into(),
            author: author.into(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Key/value form written by the file store.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("id".to_string(), self.id.into());
        map.insert("content".to_string(), self.content.clone().into());
        map.insert("author".to_string(), self.author.clone().into());
        map
    }
}
