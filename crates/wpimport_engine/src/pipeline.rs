use chrono::FixedOffset;
use import_logging::{import_debug, import_error, import_info, import_warn};
use url::Url;
use wpimport_core::{
    build_post, collect_image_sources, parse_items, update, ContentRewriter, ExtractError,
    ImageMap, ItemOutcome, PostRecord, RawItem, RunPolicy, RunState, RunSummary, Step,
};

use crate::images::{resolve_image_url, ImageRehoster};
use crate::store::{ContentStore, NewArticle, UserId};
use crate::ImportError;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Anchors whose href contains this text are left alone.
    pub internal_domain: String,
    /// Offset `wp:post_date` values are interpreted in.
    pub utc_offset: FixedOffset,
    pub policy: RunPolicy,
}

/// Sequential WXR importer: one item, one image, one insert at a time.
pub struct Importer<'a> {
    store: &'a dyn ContentStore,
    images: &'a dyn ImageRehoster,
    rewriter: ContentRewriter,
    options: ImportOptions,
    author: UserId,
}

impl<'a> Importer<'a> {
    /// Resolves the author account up front so a missing account fails
    /// before any item is touched.
    pub fn new(
        store: &'a dyn ContentStore,
        images: &'a dyn ImageRehoster,
        options: ImportOptions,
        author: &str,
    ) -> Result<Self, ImportError> {
        let author = store.find_user(author)?;
        Ok(Self {
            store,
            images,
            rewriter: ContentRewriter::new(options.internal_domain.clone()),
            options,
            author,
        })
    }

    /// Parse a whole export and import it. Only document-level parse errors
    /// are returned as `Err`; item failures end up in the summary.
    pub fn run_xml(&self, xml: &str) -> Result<RunSummary, ImportError> {
        let items = parse_items(xml)?;
        Ok(self.run(&items))
    }

    pub fn run(&self, items: &[RawItem]) -> RunSummary {
        import_info!("Importing {} articles", items.len());
        let mut state = RunState::new(self.options.policy, items.len());

        for item in items {
            let outcome = match self.import_item(item) {
                Ok(outcome) => outcome,
                Err(err) => {
                    import_error!(
                        "Failed to import {:?}: {}",
                        item.title.as_deref().unwrap_or("<untitled>"),
                        err
                    );
                    ItemOutcome::Failed {
                        title: item.title.clone(),
                        message: err.to_string(),
                    }
                }
            };
            let (next, step) = update(state, outcome);
            state = next;
            if step == Step::Halt {
                import_warn!("Import aborted after first failure");
                break;
            }
        }

        let summary = state.into_summary();
        import_info!(
            "Import finished: {} created, {} skipped, {} failed, {} of {} processed",
            summary.created,
            summary.skipped,
            summary.failed,
            summary.processed(),
            summary.total
        );
        summary
    }

    pub fn import_item(&self, item: &RawItem) -> Result<ItemOutcome, ImportError> {
        let title = item
            .title
            .as_deref()
            .ok_or(ExtractError::MissingField("title"))?;
        if self.store.article_exists(title)? {
            import_debug!("Skipping {}: already imported", title);
            return Ok(ItemOutcome::Skipped {
                title: title.to_string(),
            });
        }

        import_info!("Processing {}", title);
        let post = build_post(item, self.options.utc_offset)?;
        let images = self.import_images(&post)?;
        let content = self.rewriter.rewrite(&post.content, &images);

        let category = self.store.get_or_create_category(&post.category)?;
        let article = self.store.create_article(&NewArticle {
            title: &post.title,
            slug: &post.slug,
            content: &content,
            category,
            author: self.author,
            posted_at: post.posted_at,
        })?;
        self.store.add_tags(article, &post.tags)?;

        import_info!("Created {}", post.title);
        Ok(ItemOutcome::Created { title: post.title })
    }

    fn import_images(&self, post: &PostRecord) -> Result<ImageMap, ImportError> {
        let base = Url::parse(&post.link).ok();
        let mut images = ImageMap::new();
        for src in collect_image_sources(&post.content) {
            let rehosted = match resolve_image_url(&src, base.as_ref()) {
                Some(url) => self.images.rehost(&url)?,
                None => {
                    import_warn!("Unable to resolve image URL {:?}", src);
                    None
                }
            };
            images.insert(src, rehosted);
        }
        Ok(images)
    }
}
