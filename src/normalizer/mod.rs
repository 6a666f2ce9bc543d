use std::collections::BTreeMap;

use chrono::Utc;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use html_escape::decode_html_entities;
use serde_json::Value;

use crate::app::{MirrorError, Result};
use crate::domain::{FeedUpdate, ItemRecord};

/// A feed document reduced to the fields the mirror works with.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub meta: FeedUpdate,
    /// Items in document order
    pub items: Vec<ItemRecord>,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<ParsedFeed> {
        let feed = parser::parse(body).map_err(|e| MirrorError::FeedParse(e.to_string()))?;

        let meta = FeedUpdate {
            title: feed.title.map(|t| decode_html_entities(&t.content).to_string()),
            description: feed
                .description
                .map(|d| decode_html_entities(&d.content).to_string()),
            link: primary_link(&feed.links),
        };

        let items = feed.entries.into_iter().map(Self::entry_to_item).collect();

        Ok(ParsedFeed { meta, items })
    }

    fn entry_to_item(entry: Entry) -> ItemRecord {
        let guid = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty());
        let link = primary_link(&entry.links);

        let summary = entry
            .summary
            .map(|s| decode_html_entities(&s.content).to_string());
        let content = entry
            .content
            .and_then(|c| c.body)
            .map(|b| decode_html_entities(&b).to_string());

        let mut extras = BTreeMap::new();
        if let Some(author) = entry.authors.first() {
            extras.insert("author".to_string(), Value::String(author.name.clone()));
        }
        if !entry.categories.is_empty() {
            let terms = entry
                .categories
                .iter()
                .map(|c| Value::String(c.term.clone()))
                .collect();
            extras.insert("categories".to_string(), Value::Array(terms));
        }

        // Full content only goes to extras when the summary already fills description
        let description = match (summary, content) {
            (Some(summary), Some(content)) => {
                extras.insert("content".to_string(), Value::String(content));
                Some(summary)
            }
            (summary, content) => summary.or(content),
        };

        ItemRecord {
            title: entry.title.map(|t| decode_html_entities(&t.content).to_string()),
            description,
            link,
            guid,
            date: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc)),
            extras,
        }
    }
}

/// The alternate link if one is marked, otherwise the first link.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("self")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}
