use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::mirror::layout;

/// Item metadata as stored at `<id>` in the archive.
///
/// Fields not modelled explicitly (author, categories, content, ...) are kept
/// in `extras` and round-trip through the JSON record untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "url", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl ItemRecord {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

/// Identifier of an item record; always a single archive path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    /// Derive the identifier from the item's guid, falling back to a hash of
    /// its content when the guid is missing or unusable as a record name.
    pub fn derive(item: &ItemRecord) -> Self {
        item.guid
            .as_deref()
            .and_then(Self::from_guid)
            .unwrap_or_else(|| Self::content_hash(item, 0))
    }

    /// Map a guid onto a record name. Returns `None` for empty guids and for
    /// names reserved by the archive layout.
    pub fn from_guid(guid: &str) -> Option<Self> {
        let guid = guid.trim();
        if guid.is_empty() || layout::is_reserved(guid) {
            return None;
        }

        let needs_encoding = guid
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '%' || c.is_control());
        if needs_encoding {
            let encoded: String = url::form_urlencoded::byte_serialize(guid.as_bytes()).collect();
            Some(Self(encoded))
        } else {
            Some(Self(guid.to_string()))
        }
    }

    /// Hex SHA-256 over link, title and date. A non-zero `salt` yields a
    /// distinct identifier for otherwise identical content.
    pub fn content_hash(item: &ItemRecord, salt: u32) -> Self {
        let mut input = format!(
            "{}|{}|{}",
            item.link.as_deref().unwrap_or(""),
            item.title.as_deref().unwrap_or(""),
            item.date.map(|d| d.to_rfc3339()).unwrap_or_default()
        );
        if salt > 0 {
            input.push_str(&format!("#{}", salt));
        }
        Self(hex::encode(Sha256::digest(input.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_used_verbatim() {
        let mut item = ItemRecord::with_title("entry0");
        item.guid = Some("id-0".into());
        assert_eq!(ItemId::derive(&item).as_str(), "id-0");
    }

    #[test]
    fn test_guid_is_trimmed() {
        assert_eq!(ItemId::from_guid("  id-1\n").unwrap().as_str(), "id-1");
    }

    #[test]
    fn test_url_guid_becomes_single_segment() {
        let id = ItemId::from_guid("https://example.com/posts/1").unwrap();
        assert!(!id.as_str().contains('/'));
        assert_eq!(id.as_str(), "https%3A%2F%2Fexample.com%2Fposts%2F1");
    }

    #[test]
    fn test_reserved_guid_falls_back_to_hash() {
        assert!(ItemId::from_guid("metadata.json").is_none());
        assert!(ItemId::from_guid("scrap").is_none());
        assert!(ItemId::from_guid("..").is_none());

        let mut item = ItemRecord::with_title("x");
        item.guid = Some("scrapped".into());
        assert_eq!(ItemId::derive(&item).as_str().len(), 64);
    }

    #[test]
    fn test_missing_guid_hash_is_deterministic() {
        let item = ItemRecord::with_title("moo");
        let id1 = ItemId::derive(&item);
        let id2 = ItemId::derive(&item);
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str().len(), 64);
        assert!(id1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_salt_changes_hash() {
        let item = ItemRecord::with_title("moo");
        assert_ne!(ItemId::content_hash(&item, 0), ItemId::content_hash(&item, 1));
    }

    #[test]
    fn test_url_alias_deserializes_into_link() {
        let item: ItemRecord =
            serde_json::from_str(r#"{"title":"t","url":"example.com"}"#).unwrap();
        assert_eq!(item.link.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_extras_round_trip() {
        let json = r#"{"title":"t","author":"someone","categories":["a","b"]}"#;
        let item: ItemRecord = serde_json::from_str(json).unwrap();
        assert_eq!(item.extras["author"], serde_json::json!("someone"));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["categories"], serde_json::json!(["a", "b"]));
        assert!(back.get("guid").is_none());
    }
}
