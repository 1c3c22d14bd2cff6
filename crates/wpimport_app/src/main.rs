//! `wpimport`: import a WordPress WXR export into the blog database.

mod cli;
mod config;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use import_logging::{import_debug, import_error, LogDestination};
use log::LevelFilter;
use wpimport_core::RunSummary;
use wpimport_engine::{ImageImporter, Importer, MediaStorage, ReqwestFetcher, SqliteStore};

use crate::cli::Cli;
use crate::config::ImportConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &cli.log_file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    import_logging::initialize(level, destination);

    match run(&cli) {
        Ok(summary) if summary.halted => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            import_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let mut config = ImportConfig::load(cli.config.as_deref())?;
    config.apply_cli(cli);
    let options = config.import_options()?;

    let xml = read_input(cli.input_path())?;

    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("opening database {:?}", config.database))?;
    let media = MediaStorage::new(
        config.media_root.clone(),
        config.upload_dir.clone(),
        config.media_url.clone(),
    );
    import_debug!("Storing images under {:?}", media.upload_path());

    let fetcher = ReqwestFetcher::new(config.fetch_settings()).context("building HTTP client")?;
    let images = ImageImporter::new(Box::new(fetcher), media, &store)?;
    let importer = Importer::new(&store, &images, options, &config.author)
        .with_context(|| format!("resolving author {:?}", config.author))?;

    Ok(importer.run_xml(&xml)?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading export file {:?}", path))
        }
        None => {
            let mut xml = String::new();
            io::stdin()
                .read_to_string(&mut xml)
                .context("reading export from standard input")?;
            Ok(xml)
        }
    }
}
