use wpimport_core::{ExtractError, WxrError};

use crate::persist::PersistError;
use crate::store::StoreError;

/// Everything that can stop an item, or the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Wxr(#[from] WxrError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to store image: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to start download runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
