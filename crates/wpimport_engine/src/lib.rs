//! wpimport engine: image downloads, media storage, the SQLite content store
//! and the sequential import pipeline.
mod error;
mod fetch;
mod filename;
mod images;
mod media;
mod persist;
mod pipeline;
mod store;
mod types;

pub use error::ImportError;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{attachment_name, deduplicated_name};
pub use images::{resolve_image_url, ImageImporter, ImageRehoster};
pub use media::{MediaStorage, StoredFile, DEFAULT_MEDIA_URL, DEFAULT_UPLOAD_DIR};
pub use persist::{ensure_media_dir, write_new_file, PersistError};
pub use pipeline::{ImportOptions, Importer};
pub use store::{
    ArticleId, AttachmentId, CategoryId, ContentStore, NewArticle, NewAttachment, SqliteStore,
    StoreError, StoredArticle, StoredAttachment, UserId,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
