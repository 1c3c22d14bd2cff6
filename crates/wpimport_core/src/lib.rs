//! wpimport core: WXR parsing, field extraction, content rewriting and the
//! pure run-policy state machine. Nothing in this crate touches the network,
//! the filesystem or the database.
mod extract;
mod model;
mod rewrite;
mod run;
mod wxr;

pub use extract::{
    build_post, parse_post_date, parse_utc_offset, slug_from_link, slugify, split_terms,
    ExtractError, DEFAULT_UTC_OFFSET, POST_DATE_FORMAT,
};
pub use model::{PostRecord, RawItem, RawTerm};
pub use rewrite::{
    collect_image_sources, is_external_link, ContentRewriter, ImageMap, DEFAULT_INTERNAL_DOMAIN,
    EXTERNAL_LINK_REL, EXTERNAL_LINK_TARGET,
};
pub use run::{update, ItemOutcome, RunPolicy, RunState, RunSummary, Step};
pub use wxr::{parse_items, WxrError, CONTENT_NAMESPACE, WP_EXPORT_NAMESPACE_PREFIX};
