//! Command-line interface for the portfolio optimizer.

use agora::config::OptimizationFileConfig;
use agora::data::{CsvPriceProvider, DataConfig, PriceColumn, PriceProvider};
use agora::error::{AgoraError, Result};
use agora::instrument::load_instruments;
use agora::optimizer::{MonteCarloOptimizer, OptimizerConfig};
use agora::report::ResultFormatter;
use agora::risk_free::{ConstantRate, RiskFreeSource, YieldTable};
use agora::types::{parse_bound, DateRange};
use agora::universe::TickerUniverse;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Agora - Monte Carlo portfolio optimization over historical prices.
#[derive(Parser)]
#[command(name = "agora")]
#[command(version)]
#[command(about = "Find max-Sharpe and min-volatility portfolios by random sampling")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Instrument selection shared by `optimize` and `stats`.
#[derive(clap::Args)]
pub struct InstrumentArgs {
    /// Comma-separated tickers
    #[arg(short, long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// Start date (dd/mm/yyyy), defaults to one year before the end date
    #[arg(long)]
    start: Option<String>,

    /// End date (dd/mm/yyyy), defaults to today
    #[arg(long)]
    end: Option<String>,

    /// Directory with one <TICKER>.csv price file per instrument
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Read raw close instead of adjusted close
    #[arg(long)]
    close: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for optimal portfolios
    Optimize {
        #[command(flatten)]
        instruments: InstrumentArgs,

        /// Number of random portfolios
        #[arg(short = 'n', long, default_value = "5000")]
        portfolios: usize,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Annual risk-free rate as a fraction (e.g. 0.02)
        #[arg(long, conflicts_with = "risk_free_table")]
        risk_free: Option<f64>,

        /// CSV of dated yields averaged over the date range
        #[arg(long)]
        risk_free_table: Option<PathBuf>,

        /// Yields in the table are percentages
        #[arg(long, requires = "risk_free_table")]
        percent: bool,

        /// Ticker listing CSV (Symbol, IPOyear) for the stock share
        #[arg(short, long)]
        universe: Option<PathBuf>,

        /// Evaluate portfolios on one thread
        #[arg(long)]
        sequential: bool,

        /// Write every trial to this CSV file
        #[arg(long)]
        trials_csv: Option<PathBuf>,
    },

    /// Show descriptive statistics for each instrument
    Stats {
        #[command(flatten)]
        instruments: InstrumentArgs,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "agora.toml")]
        output: PathBuf,
    },

    /// Run an optimization from a configuration file
    RunConfig {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) -> Result<()> {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| AgoraError::InvalidConfiguration(e.to_string()))
    }
}

impl InstrumentArgs {
    fn date_range(&self) -> Result<DateRange> {
        let end = match &self.end {
            Some(end) => parse_bound(end, "end")?,
            None => Local::now().date_naive(),
        };
        match &self.start {
            Some(start) => DateRange::new(parse_bound(start, "start")?, end),
            None => Ok(DateRange::trailing_year(end)),
        }
    }

    fn provider(&self) -> CsvPriceProvider {
        let price_column = if self.close {
            PriceColumn::Close
        } else {
            PriceColumn::AdjClose
        };
        CsvPriceProvider::new(&self.data_dir).with_config(DataConfig {
            price_column,
            ..Default::default()
        })
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;

    match &cli.command {
        Commands::Optimize {
            instruments,
            portfolios,
            seed,
            risk_free,
            risk_free_table,
            percent,
            universe,
            sequential,
            trials_csv,
        } => {
            let risk_free: Box<dyn RiskFreeSource> = match risk_free_table {
                Some(path) => Box::new(YieldTable::load(path, *percent)?),
                None => Box::new(ConstantRate(risk_free.unwrap_or(0.0))),
            };
            let universe = universe.as_ref().map(TickerUniverse::load).transpose()?;

            let mut config = OptimizerConfig::default()
                .with_portfolios(*portfolios)
                .with_progress(cli.output == OutputFormat::Text);
            if let Some(seed) = seed {
                config = config.with_seed(*seed);
            }
            if *sequential {
                config = config.sequential();
            }

            let job = Job {
                provider: &instruments.provider(),
                tickers: &instruments.tickers,
                range: instruments.date_range()?,
                risk_free: risk_free.as_ref(),
                universe: universe.as_ref(),
                config,
            };
            run_optimization(job, cli.output, trials_csv.as_deref())
        }

        Commands::Stats { instruments } => show_stats(instruments, cli.output),

        Commands::Init { output } => init_config(output),

        Commands::RunConfig { config } => run_from_config(config, cli.output),
    }
}

/// Everything one optimization run needs.
struct Job<'a> {
    provider: &'a dyn PriceProvider,
    tickers: &'a [String],
    range: DateRange,
    risk_free: &'a dyn RiskFreeSource,
    universe: Option<&'a TickerUniverse>,
    config: OptimizerConfig,
}

fn run_optimization(job: Job<'_>, output: OutputFormat, trials_csv: Option<&Path>) -> Result<()> {
    let instruments = load_instruments(job.provider, job.tickers, job.range)?;
    let rate = job.risk_free.rate(&job.range)?;
    info!("Risk-free rate for {}: {:.4}", job.range, rate);

    if output == OutputFormat::Text {
        ResultFormatter::print_stats(&instruments);
    }

    let config = job.config.with_risk_free_rate(rate);
    let result = MonteCarloOptimizer::from_instruments(&instruments, config)?.run()?;

    if let Some(path) = trials_csv {
        ResultFormatter::write_trials_csv(&result, path)?;
        info!("Wrote {} trials to {}", result.all_trials.len(), path.display());
    }

    match output {
        OutputFormat::Text => ResultFormatter::print_report(&result, job.universe),
        OutputFormat::Json => println!("{}", ResultFormatter::to_json(&result, job.universe)?),
        OutputFormat::Csv => print!("{}", ResultFormatter::trials_csv(&result)?),
    }

    Ok(())
}

fn show_stats(args: &InstrumentArgs, output: OutputFormat) -> Result<()> {
    let instruments = load_instruments(&args.provider(), &args.tickers, args.date_range()?)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&instruments)?),
        OutputFormat::Text | OutputFormat::Csv => ResultFormatter::print_stats(&instruments),
    }
    Ok(())
}

fn init_config(output: &PathBuf) -> Result<()> {
    let example = OptimizationFileConfig::example();
    fs::write(output, example)?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to choose your tickers and dates, then run:");
    println!("  agora run-config -c {}", output.display());
    Ok(())
}

fn run_from_config(config_path: &PathBuf, output: OutputFormat) -> Result<()> {
    let file_config = OptimizationFileConfig::load(config_path)?;
    let config = file_config
        .to_optimizer_config()?
        .with_progress(output == OutputFormat::Text);
    let risk_free = file_config.risk_free_source()?;
    let universe = file_config.universe()?;

    let job = Job {
        provider: &file_config.price_provider(),
        tickers: &file_config.portfolio.tickers,
        range: file_config.date_range()?,
        risk_free: risk_free.as_ref(),
        universe: universe.as_ref(),
        config,
    };
    run_optimization(job, output, None)
}
