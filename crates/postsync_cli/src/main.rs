//! PostSync command-line entry point.
//!
//! # Responsibility
//! - Resolve config from file, flags and environment.
//! - Wire HTTP sources and the SQLite store into the core orchestrators.
//! - Print a one-line summary per run; per-item detail goes to the log.

mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, DeleteArgs, GlobalArgs, ImportArgs};
use log::{error, info};
use postsync_core::service::cleanup_service::CleanupOptions;
use postsync_core::service::sync_service::ImportOptions;
use postsync_core::{
    default_log_level, init_logging, open_db, CleanupOrchestrator, CleanupReport, HttpImageSource,
    HttpPostSource, ImportReport, MediaAttacher, SqliteContentStore, SyncConfig, SyncOrchestrator,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=run module=cli status=error error={err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli.global)?;
    start_logging(&cli.global)?;
    info!(
        "event=run module=cli status=start version={} endpoint={}",
        postsync_core::core_version(),
        config.endpoint
    );

    let mut conn = open_db(&cli.global.db)
        .with_context(|| format!("failed to open database `{}`", cli.global.db.display()))?;
    let store = SqliteContentStore::try_new(&mut conn, &cli.global.media_dir)
        .context("failed to prepare content store")?;
    let source = HttpPostSource::new(config.endpoint_url()?, config.request_timeout())
        .context("failed to build posts client")?;

    match cli.command {
        Commands::Import(args) => {
            let options = import_options(ImportOptions::batch(&config), &args);
            let mut orchestrator = build_importer(source, store, &config, options)?;
            let report = orchestrator.import_batch()?;
            print_import_summary(&report);
        }
        Commands::ImportAll(args) => {
            let options = import_options(ImportOptions::paginated(&config), &args);
            let mut orchestrator = build_importer(source, store, &config, options)?;
            let report = orchestrator.import_all()?;
            print_import_summary(&report);
        }
        Commands::Delete(args) => {
            let options = cleanup_options(CleanupOptions::batch(&config), &args);
            let report = CleanupOrchestrator::new(source, store, options).delete_batch()?;
            print_cleanup_summary(&report);
        }
        Commands::DeleteAll(args) => {
            let options = cleanup_options(CleanupOptions::paginated(&config), &args);
            let report = CleanupOrchestrator::new(source, store, options).delete_all()?;
            print_cleanup_summary(&report);
        }
    }

    Ok(())
}

fn resolve_config(global: &GlobalArgs) -> Result<SyncConfig> {
    let mut config = match &global.config {
        Some(path) => SyncConfig::from_json_file(path)?,
        None => SyncConfig::default(),
    };

    if let Some(endpoint) = &global.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(image_host) = &global.image_host {
        config.image_host = image_host.clone();
    }
    if let Some(limit) = global.limit {
        config.page_limit = limit;
    }
    if let Some(author) = global.author {
        config.author_id = author;
    }

    config.validate()?;
    Ok(config)
}

fn start_logging(global: &GlobalArgs) -> Result<()> {
    let log_dir = match &global.log_dir {
        Some(dir) => dir.clone(),
        None => PathBuf::from("logs"),
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir
    } else {
        std::env::current_dir()
            .context("failed to resolve working directory")?
            .join(log_dir)
    };
    let level = global.log_level.as_deref().unwrap_or(default_log_level());

    init_logging(level, &log_dir).map_err(|err| anyhow!("{err}"))
}

fn build_importer<'conn>(
    source: HttpPostSource,
    store: SqliteContentStore<'conn>,
    config: &SyncConfig,
    options: ImportOptions,
) -> Result<SyncOrchestrator<HttpPostSource, SqliteContentStore<'conn>, HttpImageSource>> {
    let images = HttpImageSource::new(config.max_redirects, config.request_timeout())
        .context("failed to build image client")?;
    let attacher = MediaAttacher::from_config(images, config)?;
    Ok(SyncOrchestrator::new(source, store, attacher, options))
}

fn import_options(mut options: ImportOptions, args: &ImportArgs) -> ImportOptions {
    if args.no_media {
        options.attach_media = false;
    }
    if let Some(choice) = args.taxonomy {
        options.taxonomies = choice.taxonomies();
    }
    options
}

fn cleanup_options(mut options: CleanupOptions, args: &DeleteArgs) -> CleanupOptions {
    options.prune_terms = args.prune_terms_or(options.prune_terms);
    options
}

fn print_import_summary(report: &ImportReport) {
    println!(
        "Success: processed {} posts ({} created, {} skipped, {} failed) across {} page(s).",
        report.total_processed, report.created, report.skipped, report.failed, report.pages
    );
}

fn print_cleanup_summary(report: &CleanupReport) {
    println!(
        "Success: processed {} posts ({} deleted, {} not found, {} failed) across {} page(s).",
        report.total_deleted, report.removed, report.missing, report.failed, report.pages
    );
}
