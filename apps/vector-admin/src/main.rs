//! Vector Admin
//!
//! Command-line access to the OceanBase vector store: namespace inspection and
//! deletion, document ingestion and similarity search.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::oceanbase::connect_with_retry;
use domain_vector_db::oceanbase::BACKEND_NAME;
use domain_vector_db::{
    DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_N, DocumentData, EmbeddingProvider, FsVectorCache,
    OceanBaseClient, OceanBaseRepository, OpenAIProvider, SearchRequest,
    SqlDocumentVectorRepository, VectorDbProvider, VectorDbService,
};
use eyre::{Result, WrapErr, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "vector-admin")]
#[command(about = "Manage namespaces and documents in the OceanBase vector store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the store is reachable
    Heartbeat,

    /// List every namespace
    Namespaces,

    /// Count vectors in one namespace, or in all of them
    Count {
        namespace: Option<String>,
    },

    /// Show catalog details of a namespace
    Stats {
        namespace: String,
    },

    /// Drop a namespace and all of its vectors
    Delete {
        namespace: String,
    },

    /// Find passages similar to a query
    Search {
        namespace: String,
        query: String,

        /// Minimum similarity in [0, 1]
        #[arg(short, long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Number of neighbours to fetch
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Chunk, embed and store a text file
    Ingest {
        namespace: String,
        file: PathBuf,

        /// Document id. Defaults to a random UUID.
        #[arg(short, long)]
        doc_id: Option<String>,
    },

    /// Remove a document's vectors from a namespace
    Forget {
        namespace: String,
        doc_id: String,
    },
}

struct App {
    service: VectorDbService<OceanBaseRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
}

async fn build(config: Config, cancel: CancellationToken) -> Result<App> {
    if !config.selection.is(BACKEND_NAME) {
        bail!(
            "VECTOR_DB is '{}', this tool only manages '{}'",
            config.selection.backend,
            BACKEND_NAME
        );
    }

    info!(url = %config.database.redacted_url(), "Connecting to OceanBase...");
    let conn = connect_with_retry(&config.database, None)
        .await
        .wrap_err("OceanBase connection failed")?;

    let mappings = SqlDocumentVectorRepository::new(conn.clone());
    mappings.ensure_table().await?;

    let client = OceanBaseClient::new(config.database, config.selection).with_connection(conn);
    let repository = OceanBaseRepository::new(client, config.store);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAIProvider::new(config.openai));
    let cache = FsVectorCache::from_config(&config.cache);

    let service = VectorDbService::new(repository, embedder.clone(), Arc::new(cache), Arc::new(mappings))
        .with_max_chunk_length(config.engine.max_chunk_length)
        .with_cancellation(cancel);

    Ok(App { service, embedder })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight store calls");
                cancel.cancel();
            }
        }
    });

    let app = build(config, cancel).await?;
    let provider: &dyn VectorDbProvider = &app.service;

    match cli.command {
        Commands::Heartbeat => print_json(&provider.heartbeat().await?)?,

        Commands::Namespaces => print_json(&provider.list_namespaces().await?)?,

        Commands::Count { namespace } => {
            let count = match namespace {
                Some(namespace) => provider.namespace_vector_count(&namespace).await?,
                None => provider.total_vector_count().await?,
            };
            println!("{}", count);
        }

        Commands::Stats { namespace } => print_json(&provider.namespace_stats(&namespace).await?)?,

        Commands::Delete { namespace } => {
            let response = provider.delete_namespace(&namespace).await?;
            info!(namespace = %namespace, outcome = ?response.outcome, "{}", response.message);
            print_json(&response)?;
        }

        Commands::Search {
            namespace,
            query,
            threshold,
            top_n,
        } => {
            let request = SearchRequest::new(namespace, query)
                .with_embedder(app.embedder.clone())
                .with_threshold(threshold)
                .with_top_n(top_n);
            print_json(&provider.search(request).await?)?;
        }

        Commands::Ingest {
            namespace,
            file,
            doc_id,
        } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .wrap_err_with(|| format!("Failed to read {}", file.display()))?;

            let doc_id = doc_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let title = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let document = DocumentData::new(doc_id.clone(), content).with_metadata("title", title);
            let path = file.to_string_lossy().into_owned();

            let outcome = provider
                .add_document(&namespace, document, Some(path.as_str()))
                .await?;
            if let Some(error) = &outcome.error {
                bail!("Document {} was not vectorized: {}", doc_id, error);
            }
            info!(namespace = %namespace, doc_id = %doc_id, vectorized = outcome.vectorized, "Ingest finished");
            print_json(&outcome)?;
        }

        Commands::Forget { namespace, doc_id } => {
            provider.delete_document(&namespace, &doc_id).await?;
            info!(namespace = %namespace, doc_id = %doc_id, "Document vectors removed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_defaults() {
        let cli = Cli::try_parse_from(["vector-admin", "search", "ws1", "what is ob?"]).unwrap();
        match cli.command {
            Commands::Search {
                namespace,
                threshold,
                top_n,
                ..
            } => {
                assert_eq!(namespace, "ws1");
                assert_eq!(threshold, DEFAULT_SIMILARITY_THRESHOLD);
                assert_eq!(top_n, DEFAULT_TOP_N);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_count_without_namespace() {
        let cli = Cli::try_parse_from(["vector-admin", "count"]).unwrap();
        assert!(matches!(cli.command, Commands::Count { namespace: None }));
    }
}
