use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stylematch::models::{BlipCaptioner, MiniLmEmbedder};
use stylematch::view::MatchRow;
use stylematch::{AppConfig, Captioner, Catalog, Embedder, Ranker, ScoredMatch, StyleMatcher};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stylematch", about = "Find catalog outfits similar to a photo")]
struct Cli {
    /// Configuration file (defaults to ./stylematch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the upload page (default)
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the generated description of an image
    Describe { image: PathBuf },
    /// Describe an image and rank the catalog against it
    Match {
        image: PathBuf,
        #[arg(short)]
        k: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Rank the catalog against one or more descriptions
    Rank {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(short)]
        k: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// List catalog entries
    Catalog {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(cfg: &AppConfig) -> anyhow::Result<Arc<Catalog>> {
    let catalog = match &cfg.catalog_path {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };
    Ok(Arc::new(catalog))
}

fn load_embedder(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let m = &cfg.models;
    Ok(Arc::new(MiniLmEmbedder::load(
        &m.embedding_model,
        &m.embedding_revision,
        m.use_gpu,
    )?))
}

fn load_captioner(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Captioner>> {
    let m = &cfg.models;
    Ok(Arc::new(BlipCaptioner::load(
        &m.caption_model,
        &m.caption_revision,
        m.max_caption_tokens,
        m.use_gpu,
    )?))
}

fn load_matcher(cfg: &AppConfig) -> anyhow::Result<StyleMatcher> {
    let catalog = load_catalog(cfg)?;
    let captioner = load_captioner(cfg)?;
    let ranker = Ranker::new(load_embedder(cfg)?, catalog, cfg.ranking)?;
    Ok(StyleMatcher::new(captioner, ranker))
}

fn read_image(path: &Path) -> anyhow::Result<image::RgbImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(stylematch::upload::decode_upload(&bytes)?)
}

fn print_matches(matches: &[ScoredMatch]) {
    for row in matches.iter().map(MatchRow::from) {
        println!("{}\n---", row.to_text());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&cfg.log_level);

    match cli.command.unwrap_or(Commands::Serve { bind: None, port: None }) {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                cfg.bind_addr = bind;
            }
            if let Some(port) = port {
                cfg.port = port;
            }
            let addr = cfg.socket_addr()?;
            let matcher = tokio::task::spawn_blocking({
                let cfg = cfg.clone();
                move || load_matcher(&cfg)
            })
            .await??;
            stylematch::server::serve(addr, Arc::new(matcher), cfg.max_upload_bytes()).await?;
        }
        Commands::Describe { image } => {
            let image = read_image(&image)?;
            let captioner = load_captioner(&cfg)?;
            println!("{}", captioner.describe(&image)?);
        }
        Commands::Match { image, k, json } => {
            let image = read_image(&image)?;
            let matcher = load_matcher(&cfg)?;
            let analysis = matcher.analyze_with_k(&image, k.unwrap_or(cfg.ranking.top_k))?;
            if json {
                let rows: Vec<MatchRow> = analysis.matches.iter().map(MatchRow::from).collect();
                let out = serde_json::json!({ "description": analysis.description, "matches": rows });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Description: {}\n", analysis.description);
                print_matches(&analysis.matches);
            }
        }
        Commands::Rank { queries, k, json } => {
            let ranker = Ranker::new(load_embedder(&cfg)?, load_catalog(&cfg)?, cfg.ranking)?;
            let results = ranker.rank_batch(&queries, k.unwrap_or(cfg.ranking.top_k))?;
            if json {
                let out: Vec<_> = queries
                    .iter()
                    .zip(&results)
                    .map(|(query, matches)| {
                        let rows: Vec<MatchRow> = matches.iter().map(MatchRow::from).collect();
                        serde_json::json!({ "query": query, "matches": rows })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for (query, matches) in queries.iter().zip(&results) {
                    println!("Query: {query}\n");
                    print_matches(matches);
                }
            }
        }
        Commands::Catalog { json } => {
            let catalog = load_catalog(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.entries())?);
            } else {
                for e in catalog.entries() {
                    println!("{}\t{}", e.id, e.description);
                }
            }
        }
    }
    Ok(())
}
