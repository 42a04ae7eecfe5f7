use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docent_core::agent::{AgentOutcome, StepAction};
use docent_core::chat::Role;
use docent_core::config::Config;
use docent_core::rag::Ingested;
use docent_core::{OllamaProvider, Session, SessionError, Upload};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "Ask questions about your documents with a local LLM", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Model management commands")]
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },

    #[command(about = "Check that Ollama is reachable and the configured models are pulled")]
    Check,

    #[command(about = "Index documents and report what was extracted")]
    Ingest {
        #[arg(required = true, help = "PDF or text files")]
        files: Vec<PathBuf>,
    },

    #[command(about = "Ask a single question")]
    Ask {
        question: String,

        #[arg(short, long, num_args = 1.., help = "Documents to index before asking")]
        docs: Vec<PathBuf>,

        #[arg(short, long, help = "Print the agent's intermediate steps")]
        verbose: bool,
    },

    #[command(about = "Start an interactive chat")]
    Chat {
        #[arg(short, long, num_args = 1.., help = "Documents to index before chatting")]
        docs: Vec<PathBuf>,

        #[arg(short, long, help = "Print the agent's intermediate steps")]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    #[command(about = "Show current models")]
    Show,

    #[command(about = "Set the LLM model")]
    Set {
        #[arg(help = "Model name (e.g., 'qwen3:4b' or 'llama3.2:latest')")]
        model: String,
    },

    #[command(about = "List available models from Ollama")]
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep agent logs quiet unless asked for; they share the terminal with answers.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docent_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show => show_config(&cli.config),
        Commands::Model { command } => match command {
            ModelCommands::Show => show_model(&cli.config),
            ModelCommands::Set { model } => set_model(&cli.config, &model),
            ModelCommands::List => list_models(&cli.config).await,
        },
        Commands::Check => check(&cli.config).await,
        Commands::Ingest { files } => ingest(&cli.config, &files).await,
        Commands::Ask {
            question,
            docs,
            verbose,
        } => ask(&cli.config, &question, &docs, verbose).await,
        Commands::Chat { docs, verbose } => chat(&cli.config, &docs, verbose).await,
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
fn load_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        debug!(path = %config_path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }

    Config::load(config_path).with_context(|| format!("Failed to load config from {}", config_path.display()))
}

fn show_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Model:           {}", config.llm.model.cyan());
    println!("  Base URL:        {}", config.llm.base_url);
    println!("  Temperature:     {}", config.llm.temperature);
    println!();
    println!("{}", "RAG:".bold());
    println!("  Embedding Model: {}", config.rag.embedding_model.cyan());
    println!("  Chunk Size:      {}", config.rag.chunk_size);
    println!("  Chunk Overlap:   {}", config.rag.chunk_overlap);
    println!("  Embed Batch:     {}", config.rag.embed_batch_size);
    println!(
        "  Retriever:       k={} fetch_k={} lambda={}",
        config.rag.retriever.k, config.rag.retriever.fetch_k, config.rag.retriever.lambda
    );
    println!();
    println!("{}", "Ingest:".bold());
    println!("  Max File Size:   {} bytes", config.ingest.max_file_size);
    println!("  Max Files:       {}", config.ingest.max_files);
    println!("  Extensions:      {}", config.ingest.allowed_extensions.join(", "));
    println!();
    println!("{}", "Agent:".bold());
    println!("  Max Iterations:  {}", config.agent.max_iterations);

    Ok(())
}

fn show_model(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{}: {}", "Chat model".bold(), config.llm.model.cyan());
    println!("{}: {}", "Embedding model".bold(), config.rag.embedding_model.cyan());
    Ok(())
}

fn set_model(config_path: &Path, model: &str) -> Result<()> {
    let mut config: serde_yaml::Value = if config_path.exists() {
        let content = std::fs::read_to_string(config_path).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config")?
    } else {
        serde_yaml::to_value(Config::default()).context("Failed to serialize default config")?
    };

    let llm = config
        .get_mut("llm")
        .and_then(|llm| llm.as_mapping_mut())
        .context("Config has no 'llm' section")?;
    llm.insert(
        serde_yaml::Value::String("model".to_string()),
        serde_yaml::Value::String(model.to_string()),
    );

    let updated_content = serde_yaml::to_string(&config).context("Failed to serialize config")?;

    std::fs::write(config_path, updated_content).context("Failed to write config file")?;

    println!("{} Model updated to: {}", "✓".green().bold(), model.cyan());

    Ok(())
}

async fn list_models(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = OllamaProvider::from_config(&config.llm);

    println!("{} Fetching models from {}...", "→".blue(), provider.base_url());
    println!();

    let models = provider
        .list_models()
        .await
        .context("Failed to connect to Ollama. Is it running?")?;

    if models.is_empty() {
        println!("{}", "No models found. Pull a model with 'ollama pull <model>'".yellow());
        return Ok(());
    }

    println!("{}", "Available models:".bold().green());
    println!();
    for model in models {
        println!("  {} {}", "•".cyan(), model.bold());
    }
    println!();
    println!("Use {} to set a model", "docent -c config.yaml model set <model>".bold());

    Ok(())
}

/// Ollama lists models with an explicit tag, so `all-minilm` is pulled as `all-minilm:latest`.
fn is_pulled(models: &[String], wanted: &str) -> bool {
    models
        .iter()
        .any(|name| name == wanted || (!wanted.contains(':') && name == &format!("{}:latest", wanted)))
}

async fn check(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = OllamaProvider::from_config(&config.llm);

    let models = match provider.list_models().await {
        Ok(models) => models,
        Err(e) => {
            eprintln!("{} Ollama is not reachable at {}", "✗".red().bold(), provider.base_url());
            eprintln!();
            eprintln!("  Start Ollama:");
            eprintln!("   ollama serve");
            return Err(e).context("Ollama health check failed");
        }
    };
    println!("{} Ollama is running at {}", "✓".green().bold(), provider.base_url());

    let mut missing = Vec::new();
    for wanted in [&config.llm.model, &config.rag.embedding_model] {
        if is_pulled(&models, wanted) {
            println!("{} Model available: {}", "✓".green().bold(), wanted.cyan());
        } else {
            println!("{} Model missing:   {}", "✗".red().bold(), wanted.cyan());
            missing.push(wanted.clone());
        }
    }

    if !missing.is_empty() {
        println!();
        for model in &missing {
            println!("  Pull it with: {}", format!("ollama pull {}", model).bold());
        }
        anyhow::bail!("{} configured model(s) not pulled", missing.len());
    }

    Ok(())
}

/// Opens each path, skipping the ones that cannot be read.
fn open_uploads(files: &[PathBuf]) -> Vec<Upload> {
    files
        .iter()
        .filter_map(|path| match Upload::from_path(path) {
            Ok(upload) => Some(upload),
            Err(e) => {
                eprintln!("  {} skipped {}: {}", "!".yellow(), path.display().to_string().bold(), e);
                debug!(path = %path.display(), error = %e, "Could not open file");
                None
            }
        })
        .collect()
}

fn new_session(config: Config) -> Result<Session> {
    let provider = Arc::new(OllamaProvider::from_config(&config.llm));
    Session::new(config, provider).context("Failed to set up session")
}

async fn ingest_into(session: &mut Session, files: &[PathBuf]) -> Result<()> {
    let uploads = open_uploads(files);

    match session.ingest(uploads).await {
        Ok(ingested) => {
            print_ingested(&ingested);
            Ok(())
        }
        Err(e) => anyhow::bail!(e.user_message()),
    }
}

fn print_ingested(ingested: &Ingested) {
    println!(
        "{} Documents processed successfully! ({} chunks)",
        "✓".green().bold(),
        ingested.chunks.len()
    );
    for skipped in &ingested.skipped {
        println!("  {} skipped {}: {}", "!".yellow(), skipped.name.bold(), skipped.reason);
    }
}

async fn ingest(config_path: &Path, files: &[PathBuf]) -> Result<()> {
    let config = load_config(config_path)?;
    let mut session = new_session(config)?;

    ingest_into(&mut session, files).await?;

    let Some(index) = session.index().current().await else {
        return Ok(());
    };
    println!("  Embedding dimension: {}", index.dimension());
    let mut sources: Vec<_> = index.records().iter().map(|r| r.chunk.source_id.as_str()).collect();
    sources.dedup();
    for source in sources {
        let count = index.records().iter().filter(|r| r.chunk.source_id == source).count();
        println!("  {} {} ({} chunks)", "•".cyan(), source, count);
    }

    Ok(())
}

fn print_steps(outcome: &AgentOutcome) {
    for (i, step) in outcome.steps.iter().enumerate() {
        println!("{}", format!("Step {}", i + 1).dimmed().bold());
        if !step.thought.is_empty() {
            println!("  {} {}", "Thought:".dimmed(), step.thought.dimmed());
        }
        match &step.action {
            StepAction::Tool { name, input } => {
                println!("  {} {}({})", "Action:".dimmed(), name.cyan(), input.dimmed());
            }
            StepAction::Invalid(e) => println!("  {} {}", "Invalid output:".yellow(), e),
        }
        println!("  {} {}", "Observation:".dimmed(), step.observation.dimmed());
    }
}

/// Prints the answer, or a readable failure. Returns false on failure.
fn print_answer(result: Result<AgentOutcome, SessionError>, verbose: bool) -> bool {
    match result {
        Ok(outcome) => {
            if verbose {
                print_steps(&outcome);
                println!();
            }
            println!("{} {}", "AI:".bold().green(), outcome.output);
            true
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.user_message());
            debug!(error = %e, "Question failed");
            false
        }
    }
}

async fn ask(config_path: &Path, question: &str, docs: &[PathBuf], verbose: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut session = new_session(config)?;

    if !docs.is_empty() {
        ingest_into(&mut session, docs).await?;
    }

    if !print_answer(session.ask(question).await, verbose) {
        anyhow::bail!("Could not answer the question");
    }
    Ok(())
}

async fn chat(config_path: &Path, docs: &[PathBuf], verbose: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut session = new_session(config)?;

    if !docs.is_empty() {
        ingest_into(&mut session, docs).await?;
    }

    if let Some(greeting) = session.conversation().last().filter(|turn| turn.role == Role::Assistant) {
        println!("{} {}", "AI:".bold().green(), greeting.content);
    }
    println!("{}", "Type 'exit' to quit, ':load <files>' to index documents.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_question = String::new();

    loop {
        println!();
        println!("{}", "You:".bold().blue());

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() || input == last_question {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        if let Some(files) = input.strip_prefix(":load") {
            let files: Vec<PathBuf> = files.split_whitespace().map(PathBuf::from).collect();
            if files.is_empty() {
                println!("{}", "Please name at least one document.".yellow());
            } else if let Err(e) = ingest_into(&mut session, &files).await {
                eprintln!("{} {:#}", "✗".red().bold(), e);
            }
            continue;
        }

        last_question = input.to_string();
        print_answer(session.ask(input).await, verbose);
    }

    Ok(())
}
