//! MediRAG - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use medirag::{
    cli::{Args, Commands, Config, Credentials, Verbosity},
    doctor::{Doctor, StatusReport},
    ingest::{IngestOutcome, Ingestor, PdfLoader, TextChunker},
    llm::GroqClient,
    rag::QueryOrchestrator,
    repl::{ChatSession, DisplayManager, InputHandler},
    search::TavilyClient,
    services::VectorStore,
    session::ChatHistory,
    store::{CohereEmbedder, QdrantStore},
    telemetry::TelemetryCollector,
};

/// Adapters built from configuration and credentials
struct Services {
    store: Arc<QdrantStore>,
    orchestrator: QueryOrchestrator,
    model: String,
}

fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit with code 1 unless every required key is set
fn require_credentials(credentials: &Credentials) {
    let missing = credentials.missing();
    if !missing.is_empty() {
        eprintln!(
            "{} Missing environment variables: {}",
            "✗".red(),
            missing.join(", ")
        );
        std::process::exit(1);
    }
}

fn build_store(config: &Config, credentials: &Credentials, show_progress: bool) -> Result<Arc<QdrantStore>> {
    let embedder = CohereEmbedder::new(
        config.embedding.clone(),
        credentials.cohere_api_key.clone().unwrap_or_default(),
    )?
    .with_progress(show_progress);

    let store = QdrantStore::connect(
        config.qdrant.clone(),
        credentials.qdrant_api_key.clone(),
        Arc::new(embedder),
    )?;
    Ok(Arc::new(store))
}

fn build_services(config: &Config, credentials: &Credentials, verbosity: Verbosity) -> Result<Services> {
    let store = build_store(config, credentials, verbosity.show_progress())?;

    let web = TavilyClient::new(
        config.web_search.clone(),
        credentials.require("TAVILY_API_KEY")?,
    )?;

    let groq_key = credentials.require("GROQ_API_KEY")?;
    let generation = GroqClient::from_config(&config.generation, groq_key.clone())?;
    let critic = GroqClient::from_config(&config.generation, groq_key)?
        .with_model(config.critic.model.clone());

    let orchestrator = QueryOrchestrator::from_config(
        config,
        store.clone(),
        Arc::new(web),
        Arc::new(generation),
        Arc::new(critic),
    );

    Ok(Services {
        store,
        orchestrator,
        model: config.generation.model.clone(),
    })
}

fn build_ingestor(config: &Config, store: Arc<QdrantStore>) -> Result<Ingestor> {
    let loader = PdfLoader::new(config.data_dir(), config.ingest.pdf_files.clone());
    let chunker = TextChunker::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?;
    Ok(Ingestor::new(Arc::new(loader), chunker, store))
}

fn report_ingest(outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Reused { documents } => {
            println!("{} Using existing collection with {} passages", "✓".green(), documents);
        }
        IngestOutcome::Ingested {
            pages,
            chunks,
            report,
        } => {
            println!(
                "{} Indexed {} pages into {} chunks: {} stored, {} skipped, {} failed",
                if report.is_success() { "✓".green() } else { "✗".red() },
                pages,
                chunks,
                report.stored,
                report.skipped,
                report.failed
            );
        }
        IngestOutcome::NoDocuments => {
            println!("{} No PDF documents found in the data folder", "⚠".yellow());
        }
    }
}

async fn run_ask(config: &Config, credentials: &Credentials, verbosity: Verbosity, query: &str, json: bool) -> Result<()> {
    let services = build_services(config, credentials, verbosity)?;
    let display = DisplayManager::new(verbosity.show_progress() && !json, verbosity.show_details());

    let progress = display.start_query(query);
    let result = services.orchestrator.resolve(query).await;
    display.finish_query(progress);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display.show_answer(&result);
    }
    Ok(())
}

async fn run_chat(config: &Config, credentials: &Credentials, verbosity: Verbosity) -> Result<()> {
    let services = build_services(config, credentials, verbosity)?;

    // Readiness step: index the corpus when the collection is empty
    let ingestor = build_ingestor(config, services.store.clone())?;
    match ingestor.initialize(false).await {
        Ok(outcome) => {
            if verbosity.show_progress() {
                report_ingest(&outcome);
            }
            if !outcome.is_ready() {
                warn!("database initialization incomplete, continuing");
            }
        }
        Err(e) => warn!(error = %e, "database initialization failed, continuing"),
    }

    let documents = services.store.count().await.ok();
    let telemetry = TelemetryCollector::new();
    let orchestrator = services.orchestrator.with_telemetry(telemetry.clone());

    let history = if config.history.persist {
        ChatHistory::load(config.history_path(), config.history.max_entries)
            .context("Failed to load chat history")?
    } else {
        ChatHistory::new(config.history.max_entries)
    };

    let mut session = ChatSession::new(
        InputHandler::with_history(config.readline_history_path())?,
        DisplayManager::new(verbosity.show_progress(), verbosity.show_details()),
        history,
        orchestrator,
        telemetry,
    );

    session
        .run(medirag::VERSION, &services.model, documents)
        .await
}

async fn run_ingest(config: &Config, credentials: &Credentials, verbosity: Verbosity, reset: bool) -> Result<()> {
    let store = build_store(config, credentials, verbosity.show_progress())?;
    let ingestor = build_ingestor(config, store)?;

    info!(reset, "starting ingestion");
    let outcome = ingestor
        .initialize(reset)
        .await
        .context("Ingestion failed")?;
    report_ingest(&outcome);

    if !outcome.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_status(config: &Config, credentials: &Credentials, json: bool) -> Result<()> {
    let report = match build_store(config, credentials, false) {
        Ok(store) => StatusReport::collect(store.as_ref()).await,
        Err(e) => StatusReport::error(e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(documents) = report.documents {
        println!("{} healthy - {} passages indexed ({})", "✓".green(), documents, report.timestamp);
    } else {
        println!(
            "{} error - {} ({})",
            "✗".red(),
            report.error.as_deref().unwrap_or("unknown"),
            report.timestamp
        );
    }

    if !report.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_doctor(config: &Config, credentials: &Credentials) -> Result<()> {
    let store: Option<Arc<dyn VectorStore>> = build_store(config, credentials, false)
        .ok()
        .map(|s| s as Arc<dyn VectorStore>);

    let report = Doctor::new(config.clone(), credentials.clone(), store)
        .run_checks()
        .await;
    report.print();

    if !report.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_history(config: &Config, clear: bool) -> Result<()> {
    let mut history = ChatHistory::load(config.history_path(), config.history.max_entries)
        .context("Failed to load chat history")?;

    if clear {
        history.clear().context("Failed to clear chat history")?;
        println!("{} Chat history cleared.", "✓".green());
        return Ok(());
    }

    if history.is_empty() {
        println!("{}", "No questions in history yet.".yellow());
        return Ok(());
    }

    for entry in history.entries() {
        println!(
            "{} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.query.bold(),
            format!("(score: {:.1})", entry.score).dimmed()
        );
        println!("{}\n", entry.response);
    }
    Ok(())
}

fn show_config(config: &Config, credentials: &Credentials) -> Result<()> {
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);

    println!("{}", "# environment".dimmed());
    for key in medirag::cli::REQUIRED_ENV_KEYS {
        let state = if credentials.get(key).is_some() {
            "set".green()
        } else {
            "missing".red()
        };
        println!("{} = {}", key, state);
    }
    Ok(())
}

fn print_usage() {
    println!("MediRAG v{} - Medical Question Answering", medirag::VERSION);
    println!("\nUsage:");
    println!("  medirag ask \"<question>\"     Answer a single question");
    println!("  medirag start                Interactive chat mode");
    println!("  medirag ingest [--reset]     Index the reference PDFs");
    println!("  medirag status [--json]      Vector store status");
    println!("  medirag doctor               System health checks");
    println!("  medirag history [--clear]    Show or clear chat history");
    println!("  medirag config               Show configuration");
    println!("\nExample:");
    println!("  medirag ask \"What are the symptoms of asthma?\"");
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(message) = args.validate() {
        eprintln!("{} {}", "✗".red(), message);
        std::process::exit(2);
    }

    let verbosity = args.verbosity();
    init_logging(verbosity);

    // Keys in ./.env fill in for unset variables
    dotenvy::dotenv().ok();
    let credentials = Credentials::from_env();
    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    config.apply_env(&credentials);

    match &args.command {
        Some(Commands::Ask { query, json }) => {
            require_credentials(&credentials);
            run_ask(&config, &credentials, verbosity, query.trim(), *json).await?;
        }
        Some(Commands::Start) => {
            require_credentials(&credentials);
            run_chat(&config, &credentials, verbosity).await?;
        }
        Some(Commands::Ingest { reset }) => {
            require_credentials(&credentials);
            run_ingest(&config, &credentials, verbosity, *reset).await?;
        }
        Some(Commands::Status { json }) => {
            run_status(&config, &credentials, *json).await?;
        }
        Some(Commands::Doctor) => {
            run_doctor(&config, &credentials).await?;
        }
        Some(Commands::History { clear }) => {
            run_history(&config, *clear)?;
        }
        Some(Commands::Config) => {
            show_config(&config, &credentials)?;
        }
        None => print_usage(),
    }

    Ok(())
}
