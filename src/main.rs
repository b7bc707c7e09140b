use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use topical::analyzer::backends::BackendKind;
use topical::analyzer::{build_backend, load_embedder, Analyzer};
use topical::config::Config;
use topical::fetch::client::HttpPageFetcher;
use topical::manifest::resolve::{check_artifact_url, verify_direct_urls};
use topical::manifest::{Manifest, PackageIndex, Tier};
use topical::output::terminal;
use topical::pipeline;

/// Topical: keyword and topic analysis for pages that serve ads.
///
/// Fetches publisher pages, extracts their main content, and stores the
/// keywords (and optionally embeddings) used for contextual ad targeting.
#[derive(Parser)]
#[command(name = "topical", version, about)]
struct Cli {
    /// Analysis backend (naive, textrank, tfidf, eatopics, st); overrides TOPICAL_BACKEND
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Register a publisher whose pages can be analyzed
    AddPublisher {
        /// Short identifier used in visit logs (e.g. docs)
        slug: String,
        /// Display name
        name: String,
    },

    /// Analyze URLs and print their keywords
    Analyze {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Save the results for this publisher
        #[arg(long)]
        publisher: Option<String>,
    },

    /// Fold a day of served-ad views into per-URL visit counts
    RecordVisits {
        /// JSON-lines visit log
        log: PathBuf,

        /// Day to aggregate, YYYY-MM-DD (default: yesterday, UTC)
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Re-analyze busy URLs whose analysis is stale
    Reanalyze {
        /// Re-analyze results older than this many days (default: 7)
        #[arg(long, default_value = "7")]
        days: i64,

        /// Only URLs with at least this many visits since last analysis (default: 50)
        #[arg(long, default_value = "50")]
        min_visits: u32,

        /// Number of URLs to analyze in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Find stored URLs similar to a page
    Similar {
        url: String,

        /// Number of results (default: 10)
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show system status (DB stats, backend, models)
    Status,

    /// Check a requirements manifest
    Manifest {
        /// Manifest file (requirements.txt style)
        path: PathBuf,

        /// Only list this tier (base or machine-learning)
        #[arg(long)]
        tier: Option<String>,

        /// Show one entry by package name
        #[arg(long, conflicts_with = "tier")]
        package: Option<String>,

        /// Resolve against a freeze-style package index (name==version lines)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Send a HEAD request to every direct download URL
        #[arg(long)]
        check_urls: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("topical=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Topical database...");
            let config = Config::load()?;
            let conn = topical::db::initialize(&config.db_path)?;
            let table_count = topical::db::schema::table_count(&conn)?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: register a publisher");
            println!("  topical add-publisher <slug> <name>");
        }

        Commands::AddPublisher { slug, name } => {
            let config = Config::load()?;
            let db = topical::db::open_shared(&config.db_path)?;
            db.add_publisher(&slug, &name).await?;
            println!("Publisher {} saved", slug.bold());
        }

        Commands::Analyze { urls, publisher } => {
            let config = load_config(cli.backend.as_deref())?;
            let analyzer = build_analyzer(&config)?;
            let db = match &publisher {
                Some(_) => Some(topical::db::open_shared(&config.db_path)?),
                None => None,
            };

            for url in &urls {
                let outcome = match (&db, &publisher) {
                    (Some(db), Some(publisher)) => {
                        match pipeline::analyze::analyze_url(&analyzer, db.as_ref(), url, publisher)
                            .await?
                        {
                            Some(outcome) => outcome,
                            None => anyhow::bail!(
                                "Publisher '{publisher}' does not exist. Run `topical add-publisher` first."
                            ),
                        }
                    }
                    _ => {
                        let normalized = topical::urls::normalize_url(url)?;
                        analyzer.analyze(&normalized).await?
                    }
                };

                terminal::display_analysis(&outcome);
            }
        }

        Commands::RecordVisits { log, day } => {
            let config = Config::load()?;
            let db = topical::db::open_shared(&config.db_path)?;
            let records = pipeline::visits::read_visit_log(&log)?;
            let day = day.unwrap_or_else(pipeline::visits::default_day);

            println!("Aggregating {} records for {}...", records.len(), day);
            let summary = pipeline::visits::aggregate_visits(db.as_ref(), &records, day).await?;
            terminal::display_visit_summary(&summary);
        }

        Commands::Reanalyze {
            days,
            min_visits,
            concurrency,
        } => {
            let config = load_config(cli.backend.as_deref())?;
            let analyzer = build_analyzer(&config)?;
            let db = topical::db::open_shared(&config.db_path)?;

            let options = pipeline::reanalyze::ReanalyzeOptions {
                days,
                min_visits,
                concurrency,
            };
            let summary =
                pipeline::reanalyze::reanalyze(&analyzer, db.as_ref(), &options, true).await?;
            terminal::display_reanalyze_summary(&summary);
        }

        Commands::Similar { url, limit } => {
            let config = load_config(cli.backend.as_deref())?;
            let analyzer = build_analyzer(&config)?;
            let db = topical::db::open_shared(&config.db_path)?;

            let similar =
                pipeline::similar::find_similar(&analyzer, db.as_ref(), &url, limit).await?;
            terminal::display_similar(&url, &similar);
        }

        Commands::Status => {
            let config = load_config(cli.backend.as_deref())?;
            topical::status::show(&config).await?;
        }

        Commands::Manifest {
            path,
            tier,
            package,
            index,
            check_urls,
        } => {
            let manifest = Manifest::load(&path)?;
            let requirement_count = manifest.requirements().len();
            println!(
                "{} parsed: {} requirements in {} sections",
                path.display(),
                requirement_count,
                manifest.sections.len()
            );

            match (tier.as_deref(), package.as_deref()) {
                (Some(name), _) => {
                    let tier = parse_tier(name)?;
                    println!("\n{}", format!("{tier} tier").bold());
                    for requirement in manifest.tier(tier) {
                        println!("  {requirement}");
                    }
                }
                (None, Some(name)) => match manifest.get(name) {
                    Some(requirement) => terminal::display_requirement(requirement),
                    None => anyhow::bail!("{} does not list a package named '{name}'", path.display()),
                },
                (None, None) => terminal::display_manifest(&manifest),
            }

            for requirement in manifest.direct_urls() {
                let url = requirement.direct_url().unwrap_or_default();
                check_artifact_url(url)
                    .with_context(|| format!("line {}: {}", requirement.line, requirement.name))?;
            }

            if let Some(index_path) = index {
                let text = std::fs::read_to_string(&index_path)
                    .with_context(|| format!("Failed to read index {}", index_path.display()))?;
                let index = PackageIndex::parse(&text)
                    .with_context(|| format!("Invalid index {}", index_path.display()))?;
                let resolution = manifest.resolve(&index)?;
                terminal::display_resolution(&resolution);
            }

            if check_urls {
                let config = Config::load()?;
                let client = reqwest::Client::builder()
                    .user_agent(config.fetch_options().user_agent)
                    .timeout(config.fetch_timeout)
                    .build()
                    .context("Failed to build HTTP client")?;
                let checks = verify_direct_urls(&manifest, &client, 4).await?;
                terminal::display_url_checks(&checks);

                let broken = checks.iter().filter(|c| !c.is_fetchable()).count();
                if broken > 0 {
                    anyhow::bail!("{broken} direct URLs are not fetchable");
                }
            }
        }
    }

    Ok(())
}

/// Load config, applying the --backend override.
fn load_config(backend: Option<&str>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(name) = backend {
        config.backend = name.parse::<BackendKind>()?;
    }
    Ok(config)
}

/// Build the analyzer for the configured backend.
///
/// Keyword backends also get the sentence embedder when its model is on
/// disk, so their results can be used for similarity lookups. Without it
/// they still work, just without embeddings.
fn build_analyzer(config: &Config) -> Result<Analyzer> {
    config.require_models()?;

    let fetcher = Arc::new(HttpPageFetcher::new(&config.fetch_options())?);
    let st_home = config.sentence_transformers_home.as_deref();
    let backend = build_backend(config.backend, &config.model_dir, st_home)?;
    info!(backend = backend.name(), "Using analysis backend");

    let analyzer = Analyzer::new(fetcher, backend);
    if config.backend == BackendKind::SentenceTransformer {
        return Ok(analyzer);
    }

    match load_embedder(&config.model_dir, st_home) {
        Ok(Some(embedder)) => {
            info!("Loaded sentence embedding model");
            Ok(analyzer.with_embedder(embedder))
        }
        Ok(None) => Ok(analyzer),
        Err(e) => {
            warn!("Failed to load embedding model, continuing without embeddings: {e}");
            Ok(analyzer)
        }
    }
}

fn parse_tier(name: &str) -> Result<Tier> {
    match name.trim().to_lowercase().as_str() {
        "base" => Ok(Tier::Base),
        "machine-learning" | "ml" => Ok(Tier::MachineLearning),
        other => anyhow::bail!("Unknown tier '{other}' (expected base or machine-learning)"),
    }
}
