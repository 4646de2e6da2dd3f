use crate::config::{CliConfig, ProviderKind};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use coderag_code_chunker::ChunkType;
use coderag_codebase_context::RagAssembler;
use coderag_codebase_indexer::{SemanticIndexer, TreeSitterSymbolIndex, normalize_root, project_id};
use coderag_codebase_retrieval::{
    SearchEngine, SearchFilters, SearchResult, SearchType, SemanticSearchRequest,
    SimilarCodeRequest,
};
use coderag_embeddings::{
    EmbeddingProvider, HashingEmbeddingProvider, OpenAiEmbeddingProvider, RetryingEmbedder,
};
use coderag_vector_store::{InMemoryVectorStore, VectorStore};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Semantic code search over a local project
#[derive(Debug, Parser)]
#[command(name = "coderag", version)]
pub struct CodebaseCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: CodebaseCommand,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Project root (defaults to the current directory)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub path: Option<PathBuf>,

    /// Config file (defaults to <root>/coderag.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Vector snapshot (defaults to <root>/.coderag/vectors.json)
    #[arg(long, value_name = "FILE", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Use the local hashing embedder even when an API key is set
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Debug, Subcommand)]
pub enum CodebaseCommand {
    /// Index the project for semantic search
    Index(IndexArgs),

    /// Search the indexed project
    Search(SearchArgs),

    /// Find code similar to a line range
    Similar(SimilarArgs),

    /// Print a token-budgeted context section for a query
    Context(ContextArgs),

    /// Show index statistics
    Status,

    /// Remove indexed chunks
    Clear(ClearArgs),
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Re-index a single file (relative to the project root)
    #[arg(long, value_name = "FILE")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
    /// Reciprocal rank fusion with reranking
    Rrf,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    #[arg(short, long, value_enum, default_value_t = SearchMode::Hybrid)]
    pub mode: SearchMode,

    /// Similarity floor (defaults to the configured minimum)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Only return chunks in these languages
    #[arg(long = "lang", value_name = "LANGUAGE")]
    pub languages: Vec<String>,

    /// Only return chunks under these path prefixes
    #[arg(long = "under", value_name = "PREFIX")]
    pub file_paths: Vec<String>,

    /// Drop chunks whose path contains any of these
    #[arg(long = "exclude", value_name = "DIR")]
    pub exclude_dirs: Vec<String>,

    /// Only return functions and methods
    #[arg(long)]
    pub callables: bool,

    /// Show code for each result
    #[arg(short, long)]
    pub verbose: bool,
}

impl SearchArgs {
    fn filters(&self) -> Option<SearchFilters> {
        let filters = SearchFilters {
            languages: self.languages.clone(),
            chunk_types: if self.callables {
                vec![ChunkType::Function, ChunkType::Method]
            } else {
                Vec::new()
            },
            file_paths: self.file_paths.clone(),
            exclude_dirs: self.exclude_dirs.clone(),
        };
        (!filters.is_empty()).then_some(filters)
    }
}

#[derive(Debug, Args)]
pub struct SimilarArgs {
    /// File relative to the project root
    #[arg(value_name = "FILE")]
    pub file: String,

    #[arg(value_name = "START")]
    pub start_line: usize,

    #[arg(value_name = "END")]
    pub end_line: usize,

    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    /// Keep the source range in the results
    #[arg(long)]
    pub include_self: bool,
}

#[derive(Debug, Args)]
pub struct ContextArgs {
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Token budget (defaults to the configured budget)
    #[arg(long)]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Only drop chunks of this file
    #[arg(long, value_name = "FILE")]
    pub file: Option<String>,
}

impl CodebaseCli {
    pub async fn run(self) -> Result<()> {
        let workspace = Workspace::open(&self.global).await?;
        match self.command {
            CodebaseCommand::Index(args) => run_index(&workspace, args).await,
            CodebaseCommand::Search(args) => run_search(&workspace, args).await,
            CodebaseCommand::Similar(args) => run_similar(&workspace, args).await,
            CodebaseCommand::Context(args) => run_context(&workspace, args).await,
            CodebaseCommand::Status => run_status(&workspace).await,
            CodebaseCommand::Clear(args) => run_clear(&workspace, args).await,
        }
    }
}

/// Everything a command needs for one project root
struct Workspace {
    root: PathBuf,
    config: CliConfig,
    snapshot: PathBuf,
    store: Arc<InMemoryVectorStore>,
    embedder: Arc<RetryingEmbedder>,
    symbols: Arc<TreeSitterSymbolIndex>,
}

impl Workspace {
    async fn open(args: &GlobalArgs) -> Result<Self> {
        let root = match &args.path {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("failed to resolve current directory")?,
        };
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }
        let root = normalize_root(&root);

        let config = CliConfig::load(&root, args.config.as_deref())?;
        let snapshot = config.snapshot_path(&root, args.snapshot.as_deref());
        let store = InMemoryVectorStore::open(&snapshot)
            .await
            .with_context(|| format!("failed to open snapshot {}", snapshot.display()))?;

        let provider = build_provider(&config, args.offline)?;
        let embedder = RetryingEmbedder::new(provider, config.embeddings.retry.clone());
        let symbols = TreeSitterSymbolIndex::new(config.indexer.clone());

        Ok(Self {
            root,
            config,
            snapshot,
            store: Arc::new(store),
            embedder: Arc::new(embedder),
            symbols: Arc::new(symbols),
        })
    }

    fn indexer(&self) -> Result<SemanticIndexer> {
        let indexer = SemanticIndexer::new(
            self.config.indexer.clone(),
            self.embedder.clone(),
            self.store.clone(),
        )?;
        Ok(indexer.with_symbol_index(self.symbols.clone()))
    }

    fn search_engine(&self) -> Result<SearchEngine> {
        let engine = SearchEngine::new(
            self.config.retrieval.clone(),
            self.embedder.clone(),
            self.store.clone(),
        )?;
        Ok(engine.with_symbol_index(self.symbols.clone()))
    }

    /// Fail unless the snapshot holds vectors this embedder can be compared with.
    async fn require_index(&self, engine: &SearchEngine) -> Result<()> {
        let stats = engine.get_stats(&self.root).await?;
        if stats.total_chunks == 0 {
            anyhow::bail!(
                "No index for {}. Run 'coderag index' first.",
                self.root.display()
            );
        }

        let model = self.embedder.model_info();
        if let (Some(indexed), Some(current)) = (stats.dimensions, model.dimensions)
            && indexed != current
        {
            anyhow::bail!(
                "Index holds {indexed}-dimensional vectors but {} produces {current}. \
                 Re-run 'coderag index' with the current provider.",
                model.model
            );
        }
        Ok(())
    }
}

fn build_provider(config: &CliConfig, offline: bool) -> Result<Arc<dyn EmbeddingProvider>> {
    let kind = if offline {
        ProviderKind::Hashing
    } else {
        config.embeddings.resolved_provider()
    };

    match kind {
        ProviderKind::OpenAi => {
            let provider = OpenAiEmbeddingProvider::new(config.embeddings.openai.clone())
                .context("failed to initialize OpenAI embeddings (is OPENAI_API_KEY set?)")?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Hashing | ProviderKind::Auto => {
            if config.embeddings.provider == ProviderKind::Auto && !offline {
                tracing::warn!("OPENAI_API_KEY not set, using local hashing embeddings");
            }
            Ok(Arc::new(HashingEmbeddingProvider::new(
                config.embeddings.hashing_dimensions,
            )))
        }
    }
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current batch");
            child.cancel();
        }
    });
    token
}

async fn run_index(workspace: &Workspace, args: IndexArgs) -> Result<()> {
    let indexer = workspace.indexer()?;
    let cancel = cancel_on_ctrl_c();
    let model = workspace.embedder.model_info();

    if let Some(file) = args.file {
        let chunks = indexer
            .index_file(&workspace.root, &file, &cancel)
            .await
            .with_context(|| format!("failed to index {file}"))?;
        workspace.store.save().await.context("failed to save snapshot")?;
        println!(
            "{} Indexed {} ({chunks} chunks)",
            "✓".bright_green(),
            file.bright_cyan()
        );
        return Ok(());
    }

    println!(
        "{} Indexing {} with {}",
        "▶".bright_blue(),
        workspace.root.display(),
        model.model
    );

    let stats = indexer
        .index_project(&workspace.root, &cancel)
        .await
        .context("failed to index project")?;
    workspace.store.save().await.context("failed to save snapshot")?;

    println!(
        "{} Indexed {} files ({} chunks)",
        "✓".bright_green(),
        stats.files_processed,
        stats.chunks_stored
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {} files failed, see the log for details",
            "!".bright_yellow(),
            stats.files_failed
        );
    }
    println!("  Snapshot: {}", workspace.snapshot.display());
    Ok(())
}

async fn run_search(workspace: &Workspace, args: SearchArgs) -> Result<()> {
    let engine = workspace.search_engine()?;
    workspace.require_index(&engine).await?;
    let cancel = cancel_on_ctrl_c();

    let mut request = SemanticSearchRequest::new(&args.query, &workspace.root)
        .with_top_k(args.limit)
        .with_min_score(args.min_score.unwrap_or_default());
    if let Some(filters) = args.filters() {
        request = request.with_filters(filters);
    }

    let response = match args.mode {
        SearchMode::Semantic => {
            engine
                .search(&request.with_search_type(SearchType::Semantic), &cancel)
                .await?
        }
        SearchMode::Keyword => {
            engine
                .search(&request.with_search_type(SearchType::Keyword), &cancel)
                .await?
        }
        SearchMode::Hybrid => {
            engine
                .search(&request.with_search_type(SearchType::Hybrid), &cancel)
                .await?
        }
        SearchMode::Rrf => {
            let assembler = RagAssembler::new(workspace.config.context.clone(), Arc::new(engine))?;
            assembler.hybrid_search(&request, &cancel).await?
        }
    };

    if response.is_empty() {
        println!("{} No results found", "✗".bright_red());
        return Ok(());
    }

    println!(
        "{} Found {} results in {}ms\n",
        "✓".bright_green(),
        response.total_results.to_string().bright_cyan(),
        response.query_time.as_millis()
    );
    print_results(&response.results, args.verbose);
    Ok(())
}

async fn run_similar(workspace: &Workspace, args: SimilarArgs) -> Result<()> {
    let engine = workspace.search_engine()?;
    workspace.require_index(&engine).await?;

    let mut request =
        SimilarCodeRequest::new(&workspace.root, &args.file, args.start_line, args.end_line);
    request.top_k = args.limit;
    request.exclude_self = !args.include_self;

    let results = engine.find_similar(&request, &cancel_on_ctrl_c()).await?;
    if results.is_empty() {
        println!("{} No similar code found", "✗".bright_red());
        return Ok(());
    }
    print_results(&results, false);
    Ok(())
}

async fn run_context(workspace: &Workspace, args: ContextArgs) -> Result<()> {
    let engine = workspace.search_engine()?;
    workspace.require_index(&engine).await?;

    let max_tokens = args
        .max_tokens
        .unwrap_or(workspace.config.context.token_budget);
    let assembler = RagAssembler::new(workspace.config.context.clone(), Arc::new(engine))?;
    let context = assembler
        .provide_context(&args.query, &workspace.root, max_tokens, &cancel_on_ctrl_c())
        .await?;

    if context.chunks.is_empty() {
        eprintln!("No chunks fit within {max_tokens} tokens");
        return Ok(());
    }

    print!("{}", context.formatted_context);
    eprintln!(
        "{} chunks, {}/{max_tokens} tokens",
        context.chunks.len(),
        context.tokens_used
    );
    Ok(())
}

async fn run_status(workspace: &Workspace) -> Result<()> {
    let stats = workspace
        .store
        .get_stats(&project_id(&workspace.root))
        .await?;

    println!("{} Index Status", "▶".bright_blue());
    println!("  Project: {}", workspace.root.display());
    println!("  Snapshot: {}", workspace.snapshot.display());

    if stats.total_chunks == 0 {
        println!("  Status: {}", "Not indexed".bright_red());
        println!("  Run 'coderag index' to create an index.");
        return Ok(());
    }

    println!("  Status: {}", "Ready".bright_green());
    println!("  Files: {}", stats.total_files.bright_cyan());
    println!("  Chunks: {}", stats.total_chunks.bright_cyan());
    println!("  Tokens: {}", stats.total_tokens.bright_cyan());
    if let Some(dimensions) = stats.dimensions {
        println!("  Dimensions: {}", dimensions.bright_cyan());
    }
    let model = workspace.embedder.model_info();
    println!("  Provider: {} ({})", model.provider, model.model);
    Ok(())
}

async fn run_clear(workspace: &Workspace, args: ClearArgs) -> Result<()> {
    match args.file {
        Some(file) => {
            let removed = workspace
                .indexer()?
                .invalidate_file(&workspace.root, &file)
                .await?;
            workspace.store.save().await?;
            println!("{} Removed {removed} chunks of {file}", "✓".bright_green());
        }
        None => {
            workspace
                .store
                .delete_project(&project_id(&workspace.root))
                .await?;
            workspace.store.save().await?;
            println!("{} Index cleared", "✓".bright_green());
        }
    }
    Ok(())
}

fn print_results(results: &[SearchResult], verbose: bool) {
    for (i, result) in results.iter().enumerate() {
        let title = match &result.chunk.symbol_name {
            Some(name) => format!(" {name}"),
            None => String::new(),
        };
        println!(
            "{}. {}:{}{title}",
            (i + 1).to_string().bright_yellow(),
            result.chunk.file_path.bright_cyan(),
            format!("{}-{}", result.chunk.start_line, result.chunk.end_line).bright_black()
        );
        println!(
            "   {} {:.3}  {} {:?}",
            "Score:".bright_black(),
            result.score,
            "Source:".bright_black(),
            result.source
        );

        if verbose {
            for line in result.chunk.content.lines().take(10) {
                println!("   {}", line.dimmed());
            }
            if result.chunk.content.lines().count() > 10 {
                println!("   {}", "...".dimmed());
            }
        }
        println!();
    }
}
