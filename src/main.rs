mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use collapsex::{run, Scenario, SimulationConfig};
use report::render_summary;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Run a progressive collapse simulation on one of the built-in frames.
#[derive(Parser)]
#[command(name = "collapsex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Entropy-based progressive collapse simulation", long_about = None)]
struct Cli {
    /// Frame to simulate (see --list)
    #[arg(short, long, default_value = "2d_simple")]
    scenario: String,

    /// Collapse detection method (threshold or zscore)
    #[arg(short, long)]
    method: Option<String>,

    /// Maximum number of steps
    #[arg(long)]
    steps: Option<usize>,

    /// Entropy drop, in nats, that the threshold method treats as collapse
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// Standard deviations below the mean that the zscore method treats as collapse
    #[arg(long)]
    zscore: Option<f64>,

    /// Redistribution time increment
    #[arg(long)]
    dt: Option<f64>,

    /// TOML file with simulation options; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON instead of a text report
    #[arg(long)]
    json: bool,

    /// List the available frames and exit
    #[arg(long)]
    list: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    // Logs go to stderr so that --json output stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.list {
        for scenario in Scenario::ALL {
            println!(
                "{:<14} {:<24} default steps: {}",
                scenario.key(),
                scenario.alias(),
                scenario.default_max_steps()
            );
        }
        return Ok(());
    }

    let scenario: Scenario = cli.scenario.parse()?;
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => scenario.default_config(),
    };
    if let Some(method) = &cli.method {
        config = config.with_collapse_method(method)?;
    }
    if let Some(steps) = cli.steps {
        config = config.with_max_steps(steps);
    }
    if let Some(threshold) = cli.threshold {
        config = config.with_collapse_threshold(threshold);
    }
    if let Some(zscore) = cli.zscore {
        config = config.with_collapse_zscore(zscore);
    }
    if let Some(dt) = cli.dt {
        config = config.with_redistribution_dt(dt);
    }

    let frame = scenario
        .build()
        .with_context(|| format!("building frame {scenario}"))?;
    let result = run(frame, &config)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_summary(&result));
    }

    Ok(())
}
