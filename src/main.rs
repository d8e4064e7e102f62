use anyhow::Result;
use clap::{Parser, Subcommand};
use papercut::commands::{
    cache_clear, cache_status, get_doi, get_license, search_arxiv, Context, GetDoiArgs,
    GetLicenseArgs, SearchArxivArgs,
};
use papercut::config::load_config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// papercut - Harvest scholarly metadata from arXiv, DOI and Sherpa Romeo into CSV
#[derive(Parser, Debug)]
#[command(name = "papercut")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harvest scholarly metadata into CSV for repository ingest", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search a metadata service
    Search {
        #[command(subcommand)]
        target: SearchCommands,
    },

    /// Fetch metadata for a list of identifiers
    Get {
        #[command(subcommand)]
        target: GetCommands,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SearchCommands {
    /// Search arXiv and write one CSV row per paper
    Arxiv {
        /// The arXiv API url
        #[arg(long, short)]
        url: Option<String>,

        /// Search query, e.g. au:smith
        #[arg(long, short, conflicts_with = "emails_from")]
        query: Option<String>,

        /// Comma-separated arXiv ids
        #[arg(long, short, conflicts_with = "emails_from")]
        ids: Option<String>,

        /// Directory page to harvest author emails from; one search per email
        #[arg(long)]
        emails_from: Option<String>,

        /// Offset of the first result
        #[arg(long, short, default_value_t = 0)]
        start: usize,

        /// Number of results per page
        #[arg(long, short, default_value_t = 10)]
        results: usize,

        /// Download PDFs into <downloads>/arxiv
        #[arg(long)]
        download_pdfs: bool,
    },
}

#[derive(Subcommand, Debug)]
enum GetCommands {
    /// Fetch DOI records and write one CSV row per DOI
    Doi {
        /// File containing one DOI per line
        #[arg(long, short)]
        file: PathBuf,

        /// The DOI API url
        #[arg(long, short)]
        url: Option<String>,

        /// Look up an open license in Sherpa Romeo
        #[arg(long)]
        license: bool,

        /// Do not download PDFs
        #[arg(long)]
        no_pdf: bool,
    },

    /// Resolve an open license for each DOI
    License {
        /// File containing one DOI per line
        #[arg(long, short)]
        file: PathBuf,

        /// The DOI API url
        #[arg(long, short)]
        url: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache location and size
    Status,
    /// Delete all cached responses
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    // stdout carries the CSV
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("papercut={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref())?;
    let ctx = Context::new(config)?;
    let out = std::io::stdout().lock();

    match cli.command {
        Commands::Search {
            target:
                SearchCommands::Arxiv {
                    url,
                    query,
                    ids,
                    emails_from,
                    start,
                    results,
                    download_pdfs,
                },
        } => {
            let args = SearchArxivArgs {
                url,
                query,
                ids,
                emails_from,
                start,
                results,
                download_pdfs,
            };
            search_arxiv(&ctx, &args, out).await?;
        }

        Commands::Get {
            target:
                GetCommands::Doi {
                    file,
                    url,
                    license,
                    no_pdf,
                },
        } => {
            let args = GetDoiArgs {
                file,
                url,
                license,
                no_pdf,
            };
            get_doi(&ctx, &args, out).await?;
        }

        Commands::Get {
            target: GetCommands::License { file, url },
        } => {
            get_license(&ctx, &GetLicenseArgs { file, url }, out).await?;
        }

        Commands::Cache { action } => match action {
            CacheCommands::Status => cache_status(&ctx, out)?,
            CacheCommands::Clear => cache_clear(&ctx, out)?,
        },
    }

    Ok(())
}
