use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use trend_decline::config::DEFAULT_CONFIG_PATH;
use trend_decline::narrative::templates;
use trend_decline::{
    format_float, format_percent, load_input, DeclineConfig, NarrativeGenerator, ParameterChanges,
    SignalInput, TrendAnalysis, TrendOrchestrator,
};

#[derive(Parser)]
#[command(name = "trend-decline", about = "Trend and campaign decline predictor")]
struct Cli {
    /// Path to a TOML config file (defaults to DECLINE_CONFIG_PATH or config/decline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full decline analysis on a CSV or JSON file
    Analyze(AnalyzeArgs),
    /// Re-score an input under what-if parameter changes
    Simulate(SimulateArgs),
    /// Compare the optimistic, realistic and pessimistic presets
    Scenarios(InputArgs),
    Serve(ServeArgs),
    /// Write the default configuration
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Ask the narrative model for an explanation (falls back to the template)
    #[arg(long)]
    narrative: bool,
}

#[derive(Args, Debug, Clone)]
struct SimulateArgs {
    #[command(flatten)]
    input: InputArgs,
    #[arg(long, default_value = "Custom Scenario")]
    scenario_name: String,
    #[arg(long)]
    engagement_boost: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    engagement_drop: Option<f64>,
    #[arg(long)]
    sentiment_improvement: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    sentiment_decline: Option<f64>,
    #[arg(long)]
    influencer_boost: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    influencer_drop: Option<f64>,
}

impl SimulateArgs {
    fn changes(&self) -> ParameterChanges {
        ParameterChanges {
            engagement_boost: self.engagement_boost,
            engagement_drop: self.engagement_drop,
            sentiment_improvement: self.sentiment_improvement,
            sentiment_decline: self.sentiment_decline,
            influencer_boost: self.influencer_boost,
            influencer_drop: self.influencer_drop,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
    #[arg(long, default_value = "web")]
    web_root: String,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    path: PathBuf,
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::InitConfig(args) = &cli.command {
        return run_init_config(args);
    }

    let (config, config_path) = DeclineConfig::load(cli.config).map_err(|err| err.to_string())?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Analyze(args) => run_analyze(args, &config).await,
        Command::Simulate(args) => run_simulate(args, &config),
        Command::Scenarios(args) => run_scenarios(args, &config),
        Command::Serve(args) => {
            trend_decline::server::serve(&args.host, args.port, &args.web_root, config).await
        }
        Command::InitConfig(_) => Ok(()),
    }
}

fn analyze_input(
    args: &InputArgs,
    config: &DeclineConfig,
) -> Result<(TrendOrchestrator, TrendAnalysis), String> {
    let orchestrator = TrendOrchestrator::from_config(config).map_err(|err| err.to_string())?;
    let input: SignalInput = load_input(&args.input).map_err(|err| err.to_string())?;
    let analysis = orchestrator
        .analyze(&input, args.name.as_deref())
        .map_err(|err| err.to_string())?;
    Ok((orchestrator, analysis))
}

async fn run_analyze(args: AnalyzeArgs, config: &DeclineConfig) -> Result<(), String> {
    let (_, analysis) = analyze_input(&args.input, config)?;

    let narrative = if args.narrative {
        let generator = NarrativeGenerator::from_config(&config.narrative);
        Some(generator.explain(&analysis.decline_prediction).await)
    } else {
        None
    };

    if args.input.json {
        let mut value = serde_json::to_value(&analysis).map_err(|err| err.to_string())?;
        if let (Some(narrative), Some(object)) = (narrative, value.as_object_mut()) {
            object.insert(
                "narrative".to_string(),
                serde_json::to_value(narrative).map_err(|err| err.to_string())?,
            );
        }
        return print_json(&value);
    }

    print_analysis(&analysis);
    if let Some(narrative) = narrative {
        println!("\nNarrative ({}):", narrative.model);
        println!("{}", narrative.explanation);
    }
    Ok(())
}

fn run_simulate(args: SimulateArgs, config: &DeclineConfig) -> Result<(), String> {
    let (orchestrator, analysis) = analyze_input(&args.input, config)?;
    let result = orchestrator
        .simulate(&analysis, &args.changes(), &args.scenario_name)
        .map_err(|err| err.to_string())?;

    if args.input.json {
        return print_json(&result);
    }

    println!("Scenario: {}", result.scenario_name);
    println!(
        "Decline probability: {} -> {} ({} points)",
        format_percent(result.original_decline_probability),
        format_percent(result.new_decline_probability),
        format_float(result.impact_analysis.probability_change, 2)
    );
    println!(
        "Lifecycle stage: {} -> {}",
        result.original_lifecycle_stage, result.new_lifecycle_stage
    );
    println!(
        "Impact: {} | recovery potential {}",
        result.impact_analysis.impact_category.label(),
        result.recovery_potential.label()
    );
    println!("\n{}", templates::simulation_explanation(&result));
    Ok(())
}

fn run_scenarios(args: InputArgs, config: &DeclineConfig) -> Result<(), String> {
    let (orchestrator, analysis) = analyze_input(&args, config)?;
    let comparison = orchestrator
        .run_scenarios(&analysis)
        .map_err(|err| err.to_string())?;

    if args.json {
        return print_json(&comparison);
    }

    println!(
        "Baseline: {} ({})",
        format_percent(analysis.decline_probability),
        analysis.lifecycle_stage
    );
    for (id, result) in &comparison.scenarios {
        println!(
            "- {} [{}]: {} | {} | {}",
            result.scenario_name,
            id,
            format_percent(result.new_decline_probability),
            result.new_lifecycle_stage,
            result.impact_analysis.impact_category.label()
        );
    }
    println!("Most likely: {}", comparison.most_likely_outcome);
    Ok(())
}

fn run_init_config(args: &InitConfigArgs) -> Result<(), String> {
    if args.path.exists() && !args.force {
        return Err(format!(
            "{} already exists (pass --force to overwrite)",
            args.path.display()
        ));
    }
    DeclineConfig::default()
        .write(&args.path)
        .map_err(|err| err.to_string())?;
    println!("Wrote {}", args.path.display());
    Ok(())
}

fn print_analysis(analysis: &TrendAnalysis) {
    println!("Trend: {}", analysis.trend_name);
    println!(
        "Decline probability: {} ({})",
        format_percent(analysis.decline_probability),
        analysis.lifecycle_stage
    );
    println!(
        "Risk: {} | tier {} | confidence {} ({:?})",
        analysis.prediction.risk_level.label(),
        analysis.risk_classification.risk_label,
        format_float(analysis.prediction.confidence, 1),
        analysis.prediction.confidence_level
    );
    println!("Days to collapse: {}", analysis.days_to_collapse);
    println!(
        "Early warning: {} ({} active)",
        analysis.early_warning.base.warning_level.label(),
        analysis.early_warning.base.warning_count
    );

    if !analysis.signal_failures.is_empty() {
        println!("\nUnavailable signals:");
        for failure in &analysis.signal_failures {
            println!("- {}: {}", failure.agent, failure.error);
        }
    }

    println!("\nDecline drivers:");
    for driver in &analysis.driver_ranking {
        println!(
            "  {}. {} {} ({}% of total)",
            driver.rank,
            driver.driver,
            format_float(driver.contribution, 2),
            format_float(driver.contribution_percentage, 1)
        );
    }

    if !analysis.alerts.is_empty() {
        println!("\nAlerts:");
        for alert in &analysis.alerts {
            println!("- [{}] {}: {}", alert.severity.label(), alert.source, alert.message);
        }
    }

    println!("\n{}", analysis.narrative_explanation);

    if !analysis.strategy_recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &analysis.strategy_recommendations {
            println!("- {}", recommendation);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{}", payload);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
