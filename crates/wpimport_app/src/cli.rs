use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "wpimport",
    version,
    about = "Import a WordPress WXR export into the blog database"
)]
pub struct Cli {
    /// WXR export file; standard input when omitted or `-`.
    #[arg(value_name = "XML_FILE")]
    pub xml_file: Option<PathBuf>,

    /// RON configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Directory downloaded images are stored under.
    #[arg(long, value_name = "PATH")]
    pub media_root: Option<PathBuf>,

    /// Public URL prefix of the media root.
    #[arg(long, value_name = "URL")]
    pub media_url: Option<String>,

    /// Username every imported article is attributed to.
    #[arg(long, value_name = "USERNAME")]
    pub author: Option<String>,

    /// Anchors whose href contains this text are not marked external.
    #[arg(long, value_name = "TEXT")]
    pub internal_domain: Option<String>,

    /// Offset post dates are interpreted in, e.g. `+05:30`.
    #[arg(long, value_name = "+HH:MM", allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Keep importing after an item fails.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Whole-request timeout for each image download.
    #[arg(long, value_name = "SECONDS")]
    pub image_timeout: Option<u64>,

    /// Also write the log to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The input file, or `None` for standard input.
    pub fn input_path(&self) -> Option<&Path> {
        self.xml_file
            .as_deref()
            .filter(|path| *path != Path::new("-"))
    }
}
