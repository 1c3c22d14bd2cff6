use chrono::Utc;
use import_logging::{import_info, import_warn};
use tokio::runtime::Runtime;
use url::Url;

use crate::fetch::Fetcher;
use crate::filename::attachment_name;
use crate::media::MediaStorage;
use crate::store::{ContentStore, NewAttachment};
use crate::ImportError;

/// Turns a remote image into a locally hosted one.
pub trait ImageRehoster {
    /// `Ok(None)` when the image could not be downloaded; the caller drops
    /// the reference. `Err` only for local storage failures.
    fn rehost(&self, url: &str) -> Result<Option<String>, ImportError>;
}

/// Downloads images one at a time, stores them in the media directory and
/// records an attachment for each.
pub struct ImageImporter<'s> {
    fetcher: Box<dyn Fetcher>,
    runtime: Runtime,
    media: MediaStorage,
    store: &'s dyn ContentStore,
}

impl<'s> ImageImporter<'s> {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        media: MediaStorage,
        store: &'s dyn ContentStore,
    ) -> Result<Self, ImportError> {
        let runtime = Runtime::new().map_err(ImportError::Runtime)?;
        Ok(Self {
            fetcher,
            runtime,
            media,
            store,
        })
    }
}

impl ImageRehoster for ImageImporter<'_> {
    fn rehost(&self, url: &str) -> Result<Option<String>, ImportError> {
        import_info!("Downloading {}", url);
        let output = match self.runtime.block_on(self.fetcher.fetch(url)) {
            Ok(output) => output,
            Err(err) if err.kind.is_silent() => return Ok(None),
            Err(err) => {
                import_warn!("Unable to connect to URL {:?}: {}", url, err);
                return Ok(None);
            }
        };
        import_info!(
            "Downloaded {} ({} bytes, {})",
            url,
            output.metadata.byte_len,
            output
                .metadata
                .content_type
                .as_deref()
                .unwrap_or("no content type")
        );

        let stored = self.media.save(&attachment_name(url), &output.bytes)?;
        self.store.create_attachment(&NewAttachment {
            name: &stored.name,
            file: &stored.relative_path,
            url: &stored.url,
            uploaded: Utc::now(),
        })?;
        import_info!("Imported {}", url);
        Ok(Some(stored.url))
    }
}

/// Absolute http(s) URL for an `<img src>`, resolving relative sources
/// against the post permalink.
pub fn resolve_image_url(reference: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base.and_then(|base| base.join(trimmed).ok())?,
    };
    match url.scheme() {
        "http" | "https" => Some(url.into()),
        _ => None,
    }
}
