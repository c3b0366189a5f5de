use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ragline_core::config::Config;
use ragline_core::rag::{load_validation_set, preview_documents, recall_at_k};
use ragline_core::{
    AnswerOptions, Embedder, OllamaProvider, Orchestrator, Provider, Retriever, VectorIndex,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Answer questions over a prebuilt vector index", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Answer a question")]
    Ask {
        question: String,

        #[command(flatten)]
        overrides: Overrides,

        #[arg(long, help = "Print the answer record as JSON")]
        json: bool,

        #[arg(long, default_value_t = 3, help = "Number of document previews to print")]
        previews: usize,
    },

    #[command(about = "Compute Recall@k over a validation set")]
    Eval {
        #[arg(help = "JSON file of {question, answer} objects")]
        validation: PathBuf,

        #[arg(short, long)]
        k: Option<usize>,
    },

    #[command(about = "Show current configuration")]
    Show,
}

/// Command-line overrides for the configured retrieval settings.
#[derive(Args)]
struct Overrides {
    #[arg(short, long)]
    k: Option<usize>,

    #[arg(long, overrides_with = "no_mmr", help = "Re-rank with maximal marginal relevance")]
    mmr: bool,

    #[arg(long, overrides_with = "mmr", help = "Rank by plain similarity")]
    no_mmr: bool,

    #[arg(long, help = "MMR relevance weight in [0, 1]")]
    diversity: Option<f32>,

    #[arg(long, overrides_with = "no_branching", help = "Re-retrieve when the context looks thin")]
    branching: bool,

    #[arg(long, overrides_with = "branching", help = "Always generate after one retrieval")]
    no_branching: bool,

    #[arg(long)]
    max_reretrieves: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(k) = self.k {
            config.retrieval.k = k;
        }
        if self.mmr {
            config.retrieval.use_mmr = true;
        } else if self.no_mmr {
            config.retrieval.use_mmr = false;
        }
        if let Some(diversity) = self.diversity {
            config.retrieval.mmr_diversity = diversity;
        }
        if self.branching {
            config.graph.enable_branching = true;
        } else if self.no_branching {
            config.graph.enable_branching = false;
        }
        if let Some(max) = self.max_reretrieves {
            config.graph.max_reretrieves = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ragline_core=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            question,
            overrides,
            json,
            previews,
        } => {
            let mut config = load_config(&cli.config)?;
            overrides.apply(&mut config);
            ask(&config, &question, json, previews).await
        }
        Commands::Eval { validation, k } => {
            let config = load_config(&cli.config)?;
            eval(&config, &validation, k).await
        }
        Commands::Show => show_config(&load_config(&cli.config)?),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }
    Config::load(path).context("Failed to load config")
}

fn build_retriever(config: &Config) -> Result<Retriever> {
    let index = VectorIndex::load_dir(&config.index.path)
        .with_context(|| format!("Failed to load index from {}", config.index.path))?;

    let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(&config.embedding.base_url));
    let embedder = Embedder::new(provider, &config.embedding.model);
    Ok(Retriever::new(Arc::new(index), embedder))
}

async fn ask(config: &Config, question: &str, json: bool, previews: usize) -> Result<()> {
    let generator: Arc<dyn Provider> = Arc::new(OllamaProvider::new(&config.llm.base_url));
    let orchestrator = Orchestrator::new(build_retriever(config)?, generator, config.llm.clone());
    let options = AnswerOptions::from_config(config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let answer = orchestrator
        .answer_with_cancel(question, &options, &cancel)
        .await
        .context("Failed to answer question")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", "Answer:".bold().green());
    println!("{}", answer.answer.trim());
    println!();
    println!("{} {}", "Retrieval rounds:".bold(), answer.retrieval_count);
    if !answer.keywords_detected.is_empty() {
        println!(
            "{} {}",
            "Keywords:".bold(),
            answer.keywords_detected.join(", ").cyan()
        );
    }
    if previews > 0 && !answer.documents.is_empty() {
        println!();
        println!("{}", "Documents:".bold());
        for line in preview_documents(&answer.documents, previews) {
            println!("  {}", line);
        }
    }

    Ok(())
}

async fn eval(config: &Config, validation: &Path, k: Option<usize>) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.k);
    let examples = load_validation_set(validation)
        .with_context(|| format!("Failed to load {}", validation.display()))?;

    if examples.is_empty() {
        println!("{}", "Validation set is empty".yellow());
        return Ok(());
    }

    let retriever = build_retriever(config)?;
    println!(
        "{} Evaluating {} questions against {} documents...",
        "→".blue(),
        examples.len(),
        retriever.index().len()
    );

    let recall = recall_at_k(&retriever, &examples, k)
        .await
        .context("Evaluation failed")?;

    println!("{} {:.2}%", format!("Recall@{}:", k).bold().green(), recall * 100.0);
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Model:          {}", config.llm.model.cyan());
    println!("  Base URL:       {}", config.llm.base_url);
    println!("  Temperature:    {}", config.llm.temperature);
    if let Some(top_p) = config.llm.top_p {
        println!("  Top P:          {}", top_p);
    }
    if let Some(top_k) = config.llm.top_k {
        println!("  Top K:          {}", top_k);
    }
    println!();
    println!("{}", "Embedding:".bold());
    println!("  Model:          {}", config.embedding.model.cyan());
    println!("  Base URL:       {}", config.embedding.base_url);
    println!("  Index:          {}", config.index.path);
    println!();
    println!("{}", "Retrieval:".bold());
    println!("  k:                {}", config.retrieval.k);
    println!("  MMR:              {}", config.retrieval.use_mmr);
    println!("  MMR Diversity:    {}", config.retrieval.mmr_diversity);
    println!("  Max Context Docs: {}", config.retrieval.max_context_docs);
    println!();
    println!("{}", "Graph:".bold());
    println!("  Branching:           {}", config.graph.enable_branching);
    println!("  Re-retrieve Below:   {}", config.graph.reretrieve_threshold);
    println!("  Max Re-retrieves:    {}", config.graph.max_reretrieves);
    println!("  Saturation Chars:    {}", config.graph.relevance_saturation_chars);
    for prompt in &config.graph.keyword_prompts {
        println!("  Keyword {:<12} {}", format!("{:?}:", prompt.keyword), prompt.template);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(args: &[&str]) -> Overrides {
        let argv = ["ragline", "ask", "question"].iter().chain(args.iter());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Ask { overrides, .. } => overrides,
            _ => panic!("expected ask"),
        }
    }

    fn configured() -> Config {
        let mut config = Config::default();
        config.retrieval.use_mmr = true;
        config.graph.enable_branching = true;
        config
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = configured();
        overrides(&[]).apply(&mut config);
        assert!(config.retrieval.use_mmr);
        assert!(config.graph.enable_branching);
    }

    #[test]
    fn test_negative_flags_turn_settings_off() {
        let mut config = configured();
        overrides(&["--no-mmr", "--no-branching"]).apply(&mut config);
        assert!(!config.retrieval.use_mmr);
        assert!(!config.graph.enable_branching);
    }

    #[test]
    fn test_last_flag_wins() {
        let mut config = Config::default();
        overrides(&["--no-mmr", "--mmr", "--branching", "--no-branching"]).apply(&mut config);
        assert!(config.retrieval.use_mmr);
        assert!(!config.graph.enable_branching);
    }

    #[test]
    fn test_value_overrides() {
        let mut config = Config::default();
        overrides(&["-k", "9", "--diversity", "0.2", "--max-reretrieves", "3"]).apply(&mut config);
        assert_eq!(config.retrieval.k, 9);
        assert_eq!(config.retrieval.mmr_diversity, 0.2);
        assert_eq!(config.graph.max_reretrieves, 3);
    }
}
