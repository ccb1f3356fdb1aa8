//! CLI tool for generating TCFD climate report decks.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tcfd_core::{EmissionMetrics, GenerationContext};
use tcfd_engine::generator::DEFAULT_MAX_TOKENS;
use tcfd_engine::persist::{cleanup_expired_sessions, DEFAULT_OUTPUT_ROOT};
use tcfd_engine::{ContentGenerator, DeckComposer, GeneratorConfig, Registry, SessionContext};
use tcfd_pptx::StyleSeed;

/// Generate TCFD disclosure tables as a PowerPoint deck.
#[derive(Parser, Debug)]
#[command(name = "tcfd-report")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the report deck and save it into the session directory
    Generate(GenerateArgs),

    /// List the available topics in report order
    Topics,

    /// Remove session directories that have been idle too long
    Cleanup {
        /// Root holding session directories
        #[arg(short, long, env = "TCFD_OUTPUT_ROOT", default_value = DEFAULT_OUTPUT_ROOT)]
        output_root: PathBuf,

        /// Idle time after which a session is removed
        #[arg(long, default_value_t = 2)]
        max_age_hours: u64,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Industry of the reporting company (default: Manufacturing)
    #[arg(long)]
    industry: Option<String>,

    /// Annual revenue, free-form (default: 50B USD)
    #[arg(long)]
    revenue: Option<String>,

    /// Total emissions in tCO2e
    #[arg(long)]
    total_tco2e: Option<f64>,

    /// Scope 1 emissions in tCO2e
    #[arg(long)]
    scope1: Option<f64>,

    /// Scope 2 emissions in tCO2e
    #[arg(long)]
    scope2: Option<f64>,

    /// Region of operation
    #[arg(long)]
    region: Option<String>,

    /// JSON file with industry, revenue and emissions; flags override it
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Completion service key; without one content is deterministic
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Never call the completion service
    #[arg(long)]
    deterministic: bool,

    /// Style seed .pptx supplying masters, layouts and themes
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Topic id to include (repeatable; default: all)
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Root for session output directories
    #[arg(short, long, env = "TCFD_OUTPUT_ROOT", default_value = DEFAULT_OUTPUT_ROOT)]
    output_root: PathBuf,

    /// Resume an existing session instead of starting a new one
    #[arg(long)]
    session: Option<String>,

    /// Backup model id to try, in order (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Maximum tokens per completion
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Generate(args) => generate(&args),
        Command::Topics => {
            let registry = Registry::standard()?;
            for topic in registry.topics() {
                println!("{}\t{}", topic.topic_id, topic.title);
            }
            Ok(())
        }
        Command::Cleanup {
            output_root,
            max_age_hours,
        } => {
            let removed = cleanup_expired_sessions(&output_root, max_age(max_age_hours));
            println!("Removed {} expired session(s)", removed);
            Ok(())
        }
    }
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let context = build_context(args)?;
    let registry = Registry::standard()?;

    let config = GeneratorConfig::default()
        .with_models(args.models.iter().cloned())
        .with_max_tokens(args.max_tokens)
        .with_deterministic(args.deterministic);
    let generator = ContentGenerator::from_api_key(config, args.api_key.as_deref())?;

    let session = match &args.session {
        Some(id) => SessionContext::resume(id.as_str(), &args.output_root)?,
        None => SessionContext::new(&args.output_root),
    };
    log::info!(
        "Session {} under {} ({} content)",
        session.session_id(),
        args.output_root.display(),
        if generator.is_deterministic() { "deterministic" } else { "generated" }
    );

    let mut composer = DeckComposer::new(&registry, &generator);
    if let Some(template) = &args.template {
        let seed = StyleSeed::open(template)
            .with_context(|| format!("Failed to load template {}", template.display()))?;
        composer = composer.with_seed(seed);
    }
    if !args.topics.is_empty() {
        composer = composer.with_topics(args.topics.iter().cloned());
    }

    let path = composer
        .compose_and_save(&context, &session)
        .context("Report generation failed")?;

    println!("Saved: {}", path.display());
    println!("Session: {}", session.session_id());
    Ok(())
}

/// Idle limit for cleanup; absurd hour counts saturate instead of overflowing.
fn max_age(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(60 * 60))
}

/// Merge the optional context file with explicit flags.
fn build_context(args: &GenerateArgs) -> Result<GenerationContext> {
    let mut context = match &args.context {
        Some(path) => read_context(path)?,
        None => GenerationContext::default(),
    };

    if let Some(industry) = &args.industry {
        context.industry = Some(industry.clone());
    }
    if let Some(revenue) = &args.revenue {
        context.revenue = Some(revenue.clone());
    }

    let has_metrics = args.total_tco2e.is_some()
        || args.scope1.is_some()
        || args.scope2.is_some()
        || args.region.is_some();
    if has_metrics {
        let emissions = context.emissions.get_or_insert_with(EmissionMetrics::default);
        if args.total_tco2e.is_some() {
            emissions.total_tco2e = args.total_tco2e;
        }
        if args.scope1.is_some() {
            emissions.scope1 = args.scope1;
        }
        if args.scope2.is_some() {
            emissions.scope2 = args.scope2;
        }
        if args.region.is_some() {
            emissions.region = args.region.clone();
        }
    }

    Ok(context)
}

fn read_context(path: &Path) -> Result<GenerationContext> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open context file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse context file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["tcfd-report", "generate"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Generate(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_build_context() {
        let args = generate_args(&["--industry", "Steel", "--total-tco2e", "420.5", "--region", "EU"]);
        let context = build_context(&args).unwrap();
        assert_eq!(context.industry(), "Steel");
        assert_eq!(context.revenue(), "50B USD");
        assert_eq!(context.total_emissions(), Some(420.5));
        assert_eq!(
            context.emissions.unwrap().region.as_deref(),
            Some("EU")
        );
    }

    #[test]
    fn test_flags_override_context_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"industry":"Retail","revenue":"3B USD","emissions":{{"total_tco2e":10.0,"scope1":4.0}}}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = generate_args(&["--context", &path, "--industry", "Logistics", "--scope1", "5"]);
        let context = build_context(&args).unwrap();
        assert_eq!(context.industry(), "Logistics");
        assert_eq!(context.revenue(), "3B USD");
        let emissions = context.emissions.unwrap();
        assert_eq!(emissions.total_tco2e, Some(10.0));
        assert_eq!(emissions.scope1, Some(5.0));
    }

    #[test]
    fn test_repeatable_topics_and_models() {
        let args = generate_args(&["--topic", "page_1", "--topic", "page_3", "--model", "m1"]);
        assert_eq!(args.topics, vec!["page_1", "page_3"]);
        assert_eq!(args.models, vec!["m1"]);
        assert!(!args.deterministic);
    }

    #[test]
    fn test_max_age_saturates() {
        assert_eq!(max_age(2), Duration::from_secs(7200));
        assert_eq!(max_age(u64::MAX), Duration::from_secs(u64::MAX));
    }
}
