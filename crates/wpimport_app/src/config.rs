use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wpimport_core::{
    parse_utc_offset, RunPolicy, DEFAULT_INTERNAL_DOMAIN, DEFAULT_UTC_OFFSET,
};
use wpimport_engine::{FetchSettings, ImportOptions, DEFAULT_MEDIA_URL, DEFAULT_UPLOAD_DIR};

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Continue,
}

impl From<OnError> for RunPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => RunPolicy::AbortOnError,
            OnError::Continue => RunPolicy::ContinueOnError,
        }
    }
}

/// Importer settings. Every field may be left out of the RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub database: PathBuf,
    pub media_root: PathBuf,
    pub upload_dir: String,
    pub media_url: String,
    pub author: String,
    pub internal_domain: String,
    pub utc_offset: String,
    pub on_error: OnError,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_image_bytes: Option<u64>,
    pub allowed_content_types: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("db.sqlite3"),
            media_root: PathBuf::from("mediafiles"),
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            media_url: DEFAULT_MEDIA_URL.to_string(),
            author: "admin".to_string(),
            internal_domain: DEFAULT_INTERNAL_DOMAIN.to_string(),
            utc_offset: DEFAULT_UTC_OFFSET.to_string(),
            on_error: OnError::Abort,
            connect_timeout_secs: None,
            request_timeout_secs: None,
            max_image_bytes: None,
            allowed_content_types: Vec::new(),
        }
    }
}

impl ImportConfig {
    /// Defaults, or the given RON file layered over them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        ron::from_str(&content).with_context(|| format!("parsing config file {:?}", path))
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(database) = &cli.database {
            self.database = database.clone();
        }
        if let Some(media_root) = &cli.media_root {
            self.media_root = media_root.clone();
        }
        if let Some(media_url) = &cli.media_url {
            self.media_url = media_url.clone();
        }
        if let Some(author) = &cli.author {
            self.author = author.clone();
        }
        if let Some(internal_domain) = &cli.internal_domain {
            self.internal_domain = internal_domain.clone();
        }
        if let Some(utc_offset) = &cli.utc_offset {
            self.utc_offset = utc_offset.clone();
        }
        if cli.continue_on_error {
            self.on_error = OnError::Continue;
        }
        if let Some(secs) = cli.image_timeout {
            self.request_timeout_secs = Some(secs);
        }
    }

    pub fn import_options(&self) -> Result<ImportOptions> {
        let utc_offset = parse_utc_offset(&self.utc_offset)
            .with_context(|| format!("invalid utc_offset {:?}", self.utc_offset))?;
        Ok(ImportOptions {
            internal_domain: self.internal_domain.clone(),
            utc_offset,
            policy: self.on_error.into(),
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            max_bytes: self.max_image_bytes,
            allowed_content_types: self.allowed_content_types.clone(),
            ..FetchSettings::default()
        }
    }
}
