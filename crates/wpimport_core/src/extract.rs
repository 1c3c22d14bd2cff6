use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::model::{PostRecord, RawItem, RawTerm};

/// Layout of `wp:post_date`, in the blog's local time.
pub const POST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Asia/Kolkata. The zone has had no DST since 1945, so a fixed offset is exact.
pub const DEFAULT_UTC_OFFSET: &str = "+05:30";

const TAG_DOMAIN: &str = "post_tag";
const CATEGORY_DOMAIN: &str = "category";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("item is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("category entry on item is missing the `domain` attribute")]
    MissingDomain,
    #[error("`{domain}` entry on item has no label")]
    EmptyTerm { domain: String },
    #[error("invalid post date {value:?}: {message}")]
    InvalidTimestamp { value: String, message: String },
    #[error("invalid utc offset {0:?}, expected +HH:MM")]
    InvalidOffset(String),
}

/// Validate a raw item and derive every field the persister needs.
pub fn build_post(item: &RawItem, offset: FixedOffset) -> Result<PostRecord, ExtractError> {
    let title = item.title.clone().ok_or(ExtractError::MissingField("title"))?;
    let link = item.link.clone().ok_or(ExtractError::MissingField("link"))?;
    let content = item
        .content
        .clone()
        .ok_or(ExtractError::MissingField("content:encoded"))?;
    let post_date = item
        .post_date
        .as_deref()
        .ok_or(ExtractError::MissingField("wp:post_date"))?;

    let slug = slug_from_link(&link, &title);
    let (tags, category) = split_terms(&item.terms)?;
    let posted_at = parse_post_date(post_date, offset)?;

    Ok(PostRecord {
        title,
        slug,
        link,
        content,
        category,
        tags,
        posted_at,
    })
}

/// Last path segment of the permalink, or the slugified title when the
/// permalink is a `?p=<id>` placeholder.
pub fn slug_from_link(link: &str, title: &str) -> String {
    let trimmed = link.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let segment = trimmed.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() || segment.starts_with("?p") {
        slugify(title)
    } else {
        segment.to_string()
    }
}

/// URL-safe slug: ASCII alphanumerics, `_` and single hyphens, lowercased.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch.is_whitespace() {
            pending_separator = true;
        }
    }
    slug.trim_matches(&['-', '_'][..]).to_string()
}

/// Split classification entries into (tags, category). The last category wins.
pub fn split_terms(terms: &[RawTerm]) -> Result<(BTreeSet<String>, String), ExtractError> {
    let mut tags = BTreeSet::new();
    let mut category = String::new();
    for term in terms {
        let domain = term.domain.as_deref().ok_or(ExtractError::MissingDomain)?;
        let label = || {
            term.label
                .as_deref()
                .map(str::to_lowercase)
                .ok_or_else(|| ExtractError::EmptyTerm {
                    domain: domain.to_string(),
                })
        };
        match domain {
            TAG_DOMAIN => {
                tags.insert(label()?);
            }
            CATEGORY_DOMAIN => category = label()?,
            _ => {}
        }
    }
    Ok((tags, category))
}

/// Interpret a `wp:post_date` value as local time at `offset`.
pub fn parse_post_date(raw: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, ExtractError> {
    let invalid = |message: String| ExtractError::InvalidTimestamp {
        value: raw.to_string(),
        message,
    };
    let naive = NaiveDateTime::parse_from_str(raw.trim(), POST_DATE_FORMAT)
        .map_err(|err| invalid(err.to_string()))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| invalid("ambiguous local time".to_string()))
}

pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ExtractError> {
    raw.trim()
        .parse::<FixedOffset>()
        .map_err(|_| ExtractError::InvalidOffset(raw.to_string()))
}
