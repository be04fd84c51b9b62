use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use docsearch_core::api::ingest_failure_message;
use docsearch_core::embeddings::{DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL};
use docsearch_core::models::{DEFAULT_MATCH_COUNT, DEFAULT_MATCH_THRESHOLD};
use docsearch_core::stores::supabase::{DEFAULT_MATCH_RPC, DEFAULT_TABLE};
use docsearch_core::{
    discover_supported_files, AppContext, EmbedRequest, EmbeddingSettings, ItemOutcome,
    SearchOptions, ServiceConfig, StoreSettings,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docsearch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding provider.
    #[arg(long, value_enum, env = "DOCSEARCH_EMBEDDER", default_value = "openai")]
    embedder: EmbedderKind,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Embeddings endpoint.
    #[arg(long, env = "DOCSEARCH_EMBEDDING_URL", default_value = DEFAULT_OPENAI_ENDPOINT)]
    embedding_url: String,

    /// Embedding model name.
    #[arg(long, env = "DOCSEARCH_EMBEDDING_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    embedding_model: String,

    /// Vector length produced by the embedding model.
    #[arg(long, env = "DOCSEARCH_EMBEDDING_DIMENSIONS")]
    dimensions: Option<usize>,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,

    /// Table holding title, content and embedding columns
    #[arg(long, env = "DOCSEARCH_TABLE", default_value = DEFAULT_TABLE)]
    table: String,

    /// Similarity search procedure
    #[arg(long, env = "DOCSEARCH_MATCH_RPC", default_value = DEFAULT_MATCH_RPC)]
    match_rpc: String,

    /// Minimum similarity for a search hit.
    #[arg(long, env = "DOCSEARCH_MATCH_THRESHOLD", default_value_t = DEFAULT_MATCH_THRESHOLD)]
    threshold: f32,

    /// Maximum number of search hits.
    #[arg(long, env = "DOCSEARCH_MATCH_COUNT", default_value_t = DEFAULT_MATCH_COUNT)]
    count: usize,

    /// HTTP timeout for provider and store calls, in seconds.
    #[arg(long, env = "DOCSEARCH_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// OpenAI-compatible embeddings API.
    Openai,
    /// Offline character-trigram embedder, for local runs.
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, embed and store files; one status line per file.
    Ingest {
        /// Files to ingest (.pdf, .docx, .txt).
        paths: Vec<PathBuf>,
        /// Folder scanned recursively for supported files.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Store a single title/content pair.
    Embed {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Rank stored documents by similarity to a query.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Print the response as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    fn service_config(&self) -> anyhow::Result<ServiceConfig> {
        let embedding = match self.embedder {
            EmbedderKind::Openai => EmbeddingSettings::OpenAi {
                api_key: self.openai_api_key.clone().ok_or_else(|| {
                    anyhow::anyhow!("OPENAI_API_KEY is required for --embedder openai")
                })?,
                endpoint: self.embedding_url.clone(),
                model: self.embedding_model.clone(),
                dimensions: self
                    .dimensions
                    .unwrap_or(docsearch_core::embeddings::DEFAULT_OPENAI_DIMENSIONS),
            },
            EmbedderKind::Ngram => EmbeddingSettings::Ngram {
                dimensions: self
                    .dimensions
                    .unwrap_or(docsearch_core::embeddings::DEFAULT_NGRAM_DIMENSIONS),
            },
        };

        let url = self
            .supabase_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL is required"))?;
        let api_key = self
            .supabase_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_KEY is required"))?;

        Ok(ServiceConfig {
            embedding,
            store: StoreSettings::Supabase {
                url,
                api_key,
                table: self.table.clone(),
                match_rpc: self.match_rpc.clone(),
            },
            search: SearchOptions {
                match_threshold: self.threshold,
                match_count: self.count,
            },
            request_timeout_secs: self.timeout_secs,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.service_config()?;
    let context = AppContext::build(&config)?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docsearch boot"
    );

    match cli.command {
        Command::Ingest { mut paths, folder } => {
            if let Some(folder) = &folder {
                let found = discover_supported_files(folder);
                if found.is_empty() {
                    warn!(folder = %folder.display(), "no supported files found");
                }
                paths.extend(found);
            }

            if paths.is_empty() {
                anyhow::bail!("nothing to ingest: pass file paths or --folder");
            }

            let report = context.pipeline.ingest_paths(&paths).await;
            for item in &report.items {
                match &item.outcome {
                    ItemOutcome::Stored(ack) => {
                        println!("{}: stored (id={})", item.filename, ack.id)
                    }
                    ItemOutcome::Failed(error) => {
                        println!("{}: failed ({})", item.filename, ingest_failure_message(error))
                    }
                }
            }

            println!(
                "{} stored, {} failed at {}",
                report.stored_count(),
                report.failed_count(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Embed { title, content } => {
            let response = context
                .embed_document(EmbedRequest { title, content })
                .await?;
            println!("{}", response.message);
        }
        Command::Search { query, json } => {
            let response = context
                .search_documents(docsearch_core::SearchRequest {
                    query: query.clone(),
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("query: {query}");
                if response.results.is_empty() {
                    println!("no documents above similarity {:.2}", config.search.match_threshold);
                }
                for hit in response.results {
                    println!("[{:.4}] {} (id={})", hit.similarity, hit.title, hit.id);
                    println!("  {}", preview(&hit.content, 200));
                }
            }
        }
    }

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let cut: String = flattened.chars().take(max_chars).collect();
    format!("{cut}...")
}
