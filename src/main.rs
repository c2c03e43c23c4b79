use anyhow::Context;
use clap::{Parser, Subcommand};
use ipc_tracker::app::{CompareUseCase, ComparisonRequest, SourceSelection};
use ipc_tracker::comparator::SalaryPair;
use ipc_tracker::config::Config;
use ipc_tracker::infra::ReqwestHttp;
use ipc_tracker::logging;
use ipc_tracker::parser::{ApiWindow, Region};
use ipc_tracker::series::MonthKey;
use ipc_tracker::storage::FsSeriesStore;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ipc_tracker")]
#[command(about = "Compare a salary change against Argentine consumer price inflation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a salary change against inflation between two months
    Compare {
        /// Data source: api, csv or excel
        #[arg(long, default_value = "api")]
        source: String,
        /// Spreadsheet region (name, slug or 1-7); only used with --source excel
        #[arg(long)]
        region: Option<Region>,
        /// Start month, YYYY-MM
        #[arg(long)]
        start: MonthKey,
        /// End month, YYYY-MM
        #[arg(long)]
        end: MonthKey,
        #[arg(long)]
        start_salary: f64,
        #[arg(long)]
        end_salary: f64,
        /// Save the loaded series to the configured store
        #[arg(long)]
        save: bool,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a source and print a summary of its series
    Series {
        #[arg(long, default_value = "api")]
        source: String,
        #[arg(long)]
        region: Option<Region>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let http = Arc::new(ReqwestHttp::new(config.api.timeout_seconds)?);

    match cli.command {
        Commands::Compare {
            source,
            region,
            start,
            end,
            start_salary,
            end_salary,
            save,
            json,
        } => {
            let selection = SourceSelection::parse(&source, region)?;
            let store_dir = config.store.dir.clone();
            let mut use_case = CompareUseCase::new(config, http);
            if save {
                use_case = use_case.with_store(Box::new(FsSeriesStore::new(store_dir)));
            }
            let request = ComparisonRequest {
                source: selection,
                start,
                end,
                salary: SalaryPair {
                    start: start_salary,
                    end: end_salary,
                },
                save_as: save.then(|| format!("{}-{}-{}", source.to_lowercase(), start, end)),
            };

            let report = match use_case.run(&request) {
                Ok(report) => report,
                Err(e) => {
                    error!("Comparison failed: {}", e);
                    return Err(e.into());
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            let c = &report.comparison;
            println!("Source: {} ({} months)", report.source, report.series_len);
            println!(
                "Start index: {} = {:.4} ({:?})",
                c.start.month, c.start.value, c.start.strategy
            );
            println!(
                "End index:   {} = {:.4} ({:?})",
                c.end.month, c.end.value, c.end.strategy
            );
            println!("Inflation:            {:.3}%", c.inflation_pct);
            match c.salary_change_pct {
                Some(change) => println!("Salary change:        {:.3}%", change),
                None => println!("Salary change:        undefined"),
            }
            if let Some(gap) = c.gap_points {
                println!("Gap:                  {:+.3} points", gap);
            }
            println!("Real purchasing power: {:.2}", c.real_purchasing_power);
            println!("Result: {}", c.outcome.describe());
            if let Some(stored) = &report.stored_as {
                println!("Series saved as {}", stored);
            }
            for diagnostic in &report.diagnostics {
                println!("  note: {}", diagnostic.message);
            }
        }
        Commands::Series { source, region } => {
            let selection = SourceSelection::parse(&source, region)?;
            let today = chrono::Local::now().date_naive();
            let use_case = CompareUseCase::new(config, http);
            let report = use_case.load_series(selection, ApiWindow::latest_published(today));

            for diagnostic in &report.diagnostics {
                println!("  {:?}: {}", diagnostic.severity, diagnostic.message);
            }
            match report.series.summary() {
                Some(summary) => {
                    info!("Summarized {} values", summary.count);
                    println!("Source: {}", report.series.source());
                    println!(
                        "Months: {} ({} .. {})",
                        summary.count, summary.first_month, summary.last_month
                    );
                    println!("Min:    {:.4}", summary.min);
                    println!("Max:    {:.4}", summary.max);
                    println!("Mean:   {:.4}", summary.mean);
                    if let Some((month, value)) = report.series.last() {
                        println!("Latest: {} = {:.4}", month, value);
                    }
                }
                None => {
                    anyhow::bail!("{} produced no data", report.series.source());
                }
            }
        }
    }
    Ok(())
}
