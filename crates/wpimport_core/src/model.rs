use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};

/// One `<item>` as found in the export, before any validation.
///
/// Fields are optional because a missing element only becomes an error once
/// the item is actually processed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub post_date: Option<String>,
    /// `Some("")` when `content:encoded` is present but empty.
    pub content: Option<String>,
    pub terms: Vec<RawTerm>,
}

/// A `<category domain="...">label</category>` entry on an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTerm {
    pub domain: Option<String>,
    pub label: Option<String>,
}

impl RawTerm {
    pub fn new(domain: &str, label: &str) -> Self {
        Self {
            domain: Some(domain.to_string()),
            label: Some(label.to_string()),
        }
    }
}

/// A validated post, ready for content rewriting and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub title: String,
    pub slug: String,
    pub link: String,
    pub content: String,
    /// Lowercased; empty when the item carries no category entry.
    pub category: String,
    pub tags: BTreeSet<String>,
    pub posted_at: DateTime<FixedOffset>,
}
