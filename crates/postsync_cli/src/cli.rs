use clap::{Args, Parser, Subcommand, ValueEnum};
use postsync_core::Taxonomy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "postsync",
    version,
    about = "Import remote posts into a local content store, idempotently"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// JSON config file; absent fields keep their defaults.
    #[arg(long, global = true, env = "POSTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long, global = true, env = "POSTSYNC_DB", default_value = "postsync.sqlite3")]
    pub db: PathBuf,

    /// Directory sideloaded media files are copied into.
    #[arg(long, global = true, env = "POSTSYNC_MEDIA_DIR", default_value = "postsync-media")]
    pub media_dir: PathBuf,

    /// Directory for rolling log files (defaults to `./logs`).
    #[arg(long, global = true, env = "POSTSYNC_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "POSTSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Remote posts endpoint override.
    #[arg(long, global = true, env = "POSTSYNC_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Placeholder image host override.
    #[arg(long, global = true, env = "POSTSYNC_IMAGE_HOST")]
    pub image_host: Option<String>,

    /// Page size for the paginated commands.
    #[arg(long, global = true, env = "POSTSYNC_PAGE_LIMIT")]
    pub limit: Option<u64>,

    /// Author id assigned to created records and media.
    #[arg(long, global = true, env = "POSTSYNC_AUTHOR_ID")]
    pub author: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import the single unpaged batch (tags only).
    Import(ImportArgs),

    /// Delete records matching the single unpaged batch (media and record only).
    Delete(DeleteArgs),

    /// Import every page (categories and tags).
    ImportAll(ImportArgs),

    /// Delete records matching every page, pruning exclusively-owned terms.
    DeleteAll(DeleteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// Skip the placeholder featured image.
    #[arg(long)]
    pub no_media: bool,

    /// Override which taxonomies remote tags are assigned to.
    #[arg(long, value_enum)]
    pub taxonomy: Option<TaxonomyChoice>,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Never delete terms, even on `delete-all`.
    #[arg(long, conflicts_with = "prune_terms")]
    pub keep_terms: bool,

    /// Prune exclusively-owned terms, even on `delete`.
    #[arg(long)]
    pub prune_terms: bool,
}

impl DeleteArgs {
    /// Resolves the flags against the command's default.
    pub fn prune_terms_or(&self, default: bool) -> bool {
        if self.keep_terms {
            false
        } else if self.prune_terms {
            true
        } else {
            default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaxonomyChoice {
    Category,
    Tag,
    Both,
}

impl TaxonomyChoice {
    pub fn taxonomies(self) -> Vec<Taxonomy> {
        match self {
            Self::Category => vec![Taxonomy::Category],
            Self::Tag => vec![Taxonomy::Tag],
            Self::Both => vec![Taxonomy::Category, Taxonomy::Tag],
        }
    }
}
