//! Reporting of instrument statistics and optimization results.

use crate::error::{AgoraError, Result};
use crate::instrument::Instrument;
use crate::optimizer::{OptimizationResult, PortfolioTrial};
use crate::universe::TickerUniverse;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// One selected portfolio, rounded for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub trial: usize,
    /// Annual return in percent.
    pub annual_return_pct: f64,
    pub annual_std: f64,
    pub sharpe_ratio: Option<f64>,
    /// Weight per ticker, in percent.
    pub weights_pct: Vec<(String, f64)>,
    /// Fraction allocated to stocks, when a ticker universe is known.
    pub stock_share: Option<f64>,
}

impl PortfolioSummary {
    pub fn from_trial(
        tickers: &[String],
        trial: &PortfolioTrial,
        universe: Option<&TickerUniverse>,
    ) -> Self {
        Self {
            trial: trial.index,
            annual_return_pct: round3(trial.annual_return * 100.0),
            annual_std: round3(trial.annual_std),
            sharpe_ratio: trial.sharpe_ratio.map(round3),
            weights_pct: tickers
                .iter()
                .zip(trial.weights.iter())
                .map(|(t, w)| (t.clone(), round3(w * 100.0)))
                .collect(),
            stock_share: universe.map(|u| round3(u.stock_weight(tickers, &trial.weights))),
        }
    }
}

/// Machine-readable optimization report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub tickers: Vec<String>,
    pub risk_free_rate: f64,
    pub num_portfolios: usize,
    pub max_sharpe: PortfolioSummary,
    pub min_std: PortfolioSummary,
}

impl OptimizationReport {
    pub fn new(result: &OptimizationResult, universe: Option<&TickerUniverse>) -> Self {
        Self {
            tickers: result.tickers.clone(),
            risk_free_rate: result.risk_free_rate,
            num_portfolios: result.all_trials.len(),
            max_sharpe: PortfolioSummary::from_trial(&result.tickers, &result.max_sharpe_trial, universe),
            min_std: PortfolioSummary::from_trial(&result.tickers, &result.min_std_trial, universe),
        }
    }
}

/// Format results for terminal display.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Per-instrument descriptive statistics as a table.
    pub fn stats_table(instruments: &[Instrument]) -> String {
        let mut builder = Builder::new();
        builder.push_record([
            "Ticker", "Prices", "Annual Return %", "Annual Std", "APR %", "APY %",
        ]);

        let pct = |x: Option<f64>| x.map(|v| format!("{:.3}", v * 100.0)).unwrap_or_else(|| "-".to_string());
        for inst in instruments {
            let stats = inst.return_statistics();
            builder.push_record([
                inst.ticker().to_string(),
                inst.n_trading_dates().to_string(),
                format!("{:.3}", stats.expected_annual_return * 100.0),
                format!("{:.3}", inst.annual_std()),
                pct(stats.apr),
                pct(stats.apy),
            ]);
        }

        builder.build().with(Style::rounded()).to_string()
    }

    /// Print descriptive statistics to stdout.
    pub fn print_stats(instruments: &[Instrument]) {
        println!();
        println!("{}", "Descriptive Statistics".bold().underline());
        println!("{}", Self::stats_table(instruments));
    }

    /// Weights of one portfolio as a table.
    pub fn weights_table(summary: &PortfolioSummary) -> String {
        let mut builder = Builder::new();
        builder.push_record(["Ticker", "Weight %"]);
        for (ticker, w) in &summary.weights_pct {
            builder.push_record([ticker.clone(), format!("{:.3}", w)]);
        }
        builder.build().with(Style::rounded()).to_string()
    }

    /// Render one selected portfolio as text.
    pub fn render_portfolio(title: &str, summary: &PortfolioSummary) -> String {
        let sharpe = summary
            .sharpe_ratio
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "n/a".to_string());

        let mut out = String::new();
        out.push_str(&format!("{}\n", title.bold().underline()));
        out.push_str(&format!("  Trial:           {:>10}\n", summary.trial));
        out.push_str(&format!(
            "  Annual Return:   {:>10}  {}\n",
            format!("{:.3}%", summary.annual_return_pct),
            Self::format_return(summary.annual_return_pct)
        ));
        out.push_str(&format!("  Annual Std:      {:>10.3}\n", summary.annual_std));
        out.push_str(&format!("  Sharpe Ratio:    {:>10}\n", sharpe));
        if let Some(share) = summary.stock_share {
            out.push_str(&format!("  Stock Share:     {:>9.1}%\n", share * 100.0));
        }
        out.push_str(&Self::weights_table(summary));
        out.push('\n');
        out
    }

    fn format_return(pct: f64) -> String {
        if pct >= 0.0 {
            "(gain)".green().to_string()
        } else {
            "(loss)".red().to_string()
        }
    }

    /// Print the optimal portfolios to stdout.
    pub fn print_report(result: &OptimizationResult, universe: Option<&TickerUniverse>) {
        let report = OptimizationReport::new(result, universe);

        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " OPTIMAL PORTFOLIOS ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();
        println!("  Instruments:     {}", report.tickers.join(", "));
        println!("  Portfolios:      {}", report.num_portfolios);
        println!("  Risk-free Rate:  {:.3}%", report.risk_free_rate * 100.0);
        println!();
        println!("{}", Self::render_portfolio("Max Sharpe Ratio", &report.max_sharpe));
        println!("{}", Self::render_portfolio("Min Standard Deviation", &report.min_std));
        println!("{}", "═".repeat(60).blue());
    }

    /// Export the optimal portfolios to JSON.
    pub fn to_json(result: &OptimizationResult, universe: Option<&TickerUniverse>) -> Result<String> {
        Ok(serde_json::to_string_pretty(&OptimizationReport::new(result, universe))?)
    }

    /// CSV header for the trial export.
    pub fn csv_header(tickers: &[String]) -> Vec<String> {
        let mut header = vec![
            "trial".to_string(),
            "annual_std".to_string(),
            "annual_return".to_string(),
            "sharpe_ratio".to_string(),
        ];
        header.extend(tickers.iter().map(|t| format!("w_{}", t)));
        header
    }

    /// Every trial as CSV, for plotting the (std, return) cloud.
    pub fn trials_csv(result: &OptimizationResult) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(Self::csv_header(&result.tickers))?;

        for trial in &result.all_trials {
            let mut record = vec![
                trial.index.to_string(),
                trial.annual_std.to_string(),
                trial.annual_return.to_string(),
                trial.sharpe_ratio.map(|s| s.to_string()).unwrap_or_default(),
            ];
            record.extend(trial.weights.iter().map(|w| w.to_string()));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AgoraError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| AgoraError::InvalidConfiguration(e.to_string()))
    }

    /// Write [`trials_csv`](Self::trials_csv) to a file.
    pub fn write_trials_csv(result: &OptimizationResult, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, Self::trials_csv(result)?)?;
        Ok(())
    }
}
