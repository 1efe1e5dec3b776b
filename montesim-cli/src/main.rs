//! MonteSim CLI — run Monte Carlo trading simulations and inspect saved runs.
//!
//! Commands:
//! - `run` — start a simulation from flags or a TOML config, stream daily
//!   updates to stdout, print the final report, and save the record
//! - `history list` — list saved simulations
//! - `history show` — print one saved simulation as JSON

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use montesim_core::domain::{SimulationId, TradeParameters};
use montesim_core::metrics::SimulationMetrics;
use montesim_runner::{
    ChannelSink, FinalResults, JsonlStore, RunConfig, SimulationRegistry, SimulationStore,
    StartOptions, StreamEvent,
};

#[derive(Parser)]
#[command(name = "montesim", about = "MonteSim — Monte Carlo trading simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and stream daily results to stdout.
    Run {
        /// Path to a TOML run config. Flags below are ignored except
        /// --seed/--speed/--start, which override the config when given.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 10_000.0)]
        initial_balance: f64,

        /// Risk per trade, percent of balance.
        #[arg(long, default_value_t = 1.0)]
        risk: f64,

        /// Reward-to-risk ratio.
        #[arg(long, default_value_t = 2.0)]
        risk_reward: f64,

        #[arg(long, default_value_t = 3)]
        max_trades_per_day: u32,

        /// Monthly profit cashout, percent.
        #[arg(long, default_value_t = 0.0)]
        cashout: f64,

        #[arg(long, default_value_t = 0.55)]
        win_rate: f64,

        /// Simulation horizon in calendar days.
        #[arg(long, default_value_t = 365)]
        days: u32,

        /// RNG seed. Random if omitted; pin it to reproduce a run.
        #[arg(long)]
        seed: Option<u64>,

        /// Start date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        start: Option<String>,

        /// Initial speed multiplier in [0.1, 10]. Defaults to 10 (fastest)
        /// unless the config pins one.
        #[arg(long)]
        speed: Option<f64>,

        /// Only print the final report.
        #[arg(long, default_value_t = false)]
        quiet: bool,

        /// JSONL store file for saved runs.
        #[arg(long, default_value = "results/simulations.jsonl")]
        store: PathBuf,

        /// Skip saving the run record.
        #[arg(long, default_value_t = false)]
        no_save: bool,

        /// Optional label stored with the run.
        #[arg(long)]
        name: Option<String>,
    },
    /// Inspect saved simulations.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved simulations, newest first.
    List {
        #[arg(long, default_value = "results/simulations.jsonl")]
        store: PathBuf,
    },
    /// Print one saved simulation as JSON.
    Show {
        id: String,
        #[arg(long, default_value = "results/simulations.jsonl")]
        store: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Commands::Run {
            config,
            initial_balance,
            risk,
            risk_reward,
            max_trades_per_day,
            cashout,
            win_rate,
            days,
            seed,
            start,
            speed,
            quiet,
            store,
            no_save,
            name,
        } => {
            let start_date = start
                .map(|s| parse_date(&s))
                .transpose()?;

            let (params, mut options) = match config {
                Some(path) => {
                    let config = RunConfig::from_toml_file(&path)
                        .with_context(|| format!("loading config {}", path.display()))?;
                    (config.parameters.clone(), config.start_options())
                }
                None => {
                    let params = TradeParameters {
                        initial_balance,
                        risk_per_trade_percent: risk,
                        risk_reward_ratio: risk_reward,
                        max_trades_per_day,
                        monthly_cashout_percent: cashout,
                        win_rate,
                        simulation_days: days,
                    };
                    params.validate()?;
                    (
                        params,
                        StartOptions {
                            name: name.clone(),
                            ..StartOptions::default()
                        },
                    )
                }
            };
            if let Some(seed) = seed {
                options.seed = Some(seed);
            }
            if let Some(date) = start_date {
                options.start_date = Some(date);
            }
            if let Some(speed) = speed {
                options.speed = Some(speed);
            }
            options.speed.get_or_insert(10.0);
            cmd_run(params, options, quiet, (!no_save).then(|| JsonlStore::new(store)))
        }
        Commands::History { action } => match action {
            HistoryAction::List { store } => cmd_history_list(&JsonlStore::new(store)),
            HistoryAction::Show { id, store } => {
                cmd_history_show(&JsonlStore::new(store), &SimulationId::from(id))
            }
        },
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{text}', expected YYYY-MM-DD"))
}

fn cmd_run(
    params: TradeParameters,
    options: StartOptions,
    quiet: bool,
    store: Option<JsonlStore>,
) -> Result<()> {
    let registry = SimulationRegistry::new();
    let (sink, rx) = ChannelSink::rendezvous();
    let id = registry.start(params, options, Arc::new(sink))?;

    if let Some(store) = &store {
        let descriptor = registry
            .descriptor(&id)
            .context("run vanished before its descriptor was read")?;
        store.create(&descriptor)?;
        println!("simulation {id} (seed {})", descriptor.seed);
    } else {
        println!("simulation {id}");
    }

    for event in rx.iter() {
        match event {
            StreamEvent::DailyUpdate { day, data } => {
                if !quiet {
                    println!(
                        "day {day:>4}  {}  balance {:>12.2}  trades {}  pnl {:>+10.2}  dd {:>5.2}%",
                        data.date,
                        data.ending_balance,
                        data.trades_taken,
                        data.daily_pnl,
                        data.drawdown,
                    );
                }
            }
            StreamEvent::SimulationComplete {
                daily_results,
                metrics,
            } => {
                print_report(&metrics);
                if let Some(store) = &store {
                    store.save(
                        &id,
                        &FinalResults {
                            daily_results,
                            metrics,
                        },
                    )?;
                    println!("\nsaved to {}", store.path().display());
                }
                return Ok(());
            }
            StreamEvent::SimulationStopped { message } => {
                println!("{message}");
                return Ok(());
            }
        }
    }
    bail!("stream ended without a terminal event")
}

fn print_report(metrics: &SimulationMetrics) {
    println!();
    println!("── Simulation report ─────────────────────────");
    println!("Total trades:        {}", metrics.total_trades);
    println!(
        "Win rate:            {:.2}%  ({} wins / {} losses)",
        metrics.overall_win_rate * 100.0,
        metrics.total_wins,
        metrics.total_losses
    );
    println!("Total PnL:           {:>+.2}", metrics.total_pnl);
    println!("Final balance:       {:.2}", metrics.final_balance);
    println!("Total cashed out:    {:.2}", metrics.total_cashout);
    println!(
        "Max drawdown:        {:.2}  (longest {} days below peak)",
        metrics.max_drawdown, metrics.max_drawdown_duration
    );
    println!(
        "Streaks:             {} winning / {} losing days",
        metrics.longest_winning_streak, metrics.longest_losing_streak
    );
    println!("Sharpe ratio:        {:.2}", metrics.sharpe_ratio);
    if metrics.profit_factor.is_finite() {
        println!("Profit factor:       {:.2}", metrics.profit_factor);
    } else {
        println!("Profit factor:       inf (no losing trades)");
    }
    println!(
        "Avg win / avg loss:  {:.2} / {:.2}",
        metrics.average_win, metrics.average_loss
    );
    println!(
        "Largest win / loss:  {:.2} / {:.2}",
        metrics.largest_win, metrics.largest_loss
    );
}

fn cmd_history_list(store: &JsonlStore) -> Result<()> {
    let records = store.list_all()?;
    if records.is_empty() {
        println!("no saved simulations in {}", store.path().display());
        return Ok(());
    }
    for record in records {
        let label = record.descriptor.name.as_deref().unwrap_or("-");
        let outcome = match &record.metrics {
            Some(metrics) => format!("final {:.2}", metrics.final_balance),
            None => "incomplete".to_string(),
        };
        println!(
            "{}  {}  {:>10}  seed {:<20}  {}",
            record.descriptor.simulation_id,
            record.descriptor.created_at.format("%Y-%m-%d %H:%M"),
            label,
            record.descriptor.seed,
            outcome
        );
    }
    Ok(())
}

fn cmd_history_show(store: &JsonlStore, id: &SimulationId) -> Result<()> {
    match store.get(id)? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => bail!("no saved simulation with id '{id}'"),
    }
}
