//! SimulationEngine — day-by-day Monte Carlo trading simulation.
//!
//! The engine owns all numeric state for one run: balance, running peak,
//! streaks, drawdown extremes, the trade log, and the daily snapshots. It
//! steps one business day at a time, skipping weekends, and observes a
//! cooperative cancellation flag between days — never mid-day, never
//! mid-trade. Cancellation preserves every piece of state, so a later `run`
//! call continues exactly where the previous one left off.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use thiserror::Error;

use crate::domain::{DailyResult, ParamsError, TradeOutcome, TradeParameters, TradeRecord};
use crate::metrics::{self, PathSummary, SimulationMetrics};
use crate::progress::{ProgressSink, SinkError};
use crate::rng;

/// Fraction of `max_trades_per_day` used as the Poisson mean. Models days
/// offering fewer setups than the trader's own limit allows.
const EXPECTED_TRADES_FACTOR: f64 = 0.7;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("progress sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// How a call to [`SimulationEngine::run`] ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The horizon was exhausted. Carries the full ordered daily sequence and
    /// the aggregated metrics.
    Completed {
        daily_results: Vec<DailyResult>,
        metrics: SimulationMetrics,
    },
    /// Cancellation was observed at a day boundary. State is preserved; a
    /// later `run` call continues from the next unsimulated day.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreakKind {
    Win,
    Loss,
}

pub struct SimulationEngine {
    params: TradeParameters,
    start_date: NaiveDate,
    rng: StdRng,
    trades_per_day: Poisson<f64>,

    current_balance: f64,
    peak_balance: f64,
    total_cashout: f64,

    current_streak: u32,
    streak: Option<StreakKind>,
    longest_winning_streak: u32,
    longest_losing_streak: u32,

    max_drawdown: f64,
    max_drawdown_duration: u32,
    current_drawdown_duration: u32,

    /// Calendar days consumed so far, weekends included.
    days_elapsed: u32,
    trades: Vec<TradeRecord>,
    daily_results: Vec<DailyResult>,
}

impl SimulationEngine {
    /// Validate the parameters and set up a run starting at `start_date`.
    ///
    /// The same `(params, seed, start_date)` triple always replays the same
    /// history.
    pub fn new(
        params: TradeParameters,
        seed: u64,
        start_date: NaiveDate,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        let mean = EXPECTED_TRADES_FACTOR * f64::from(params.max_trades_per_day);
        let trades_per_day = Poisson::new(mean).expect("Poisson mean must be positive");
        Ok(Self {
            current_balance: params.initial_balance,
            peak_balance: params.initial_balance,
            total_cashout: 0.0,
            current_streak: 0,
            streak: None,
            longest_winning_streak: 0,
            longest_losing_streak: 0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
            current_drawdown_duration: 0,
            days_elapsed: 0,
            trades: Vec::new(),
            daily_results: Vec::new(),
            rng: rng::seeded(seed),
            trades_per_day,
            start_date,
            params,
        })
    }

    /// One Bernoulli trade at the current balance. Pure given RNG state: the
    /// caller applies the balance update.
    pub fn simulate_single_trade(&mut self) -> (TradeOutcome, f64) {
        let is_win = self.rng.gen_bool(self.params.win_rate);
        let risk_amount = self.current_balance * self.params.risk_per_trade_percent / 100.0;
        if is_win {
            (TradeOutcome::Win, risk_amount * self.params.risk_reward_ratio)
        } else {
            (TradeOutcome::Loss, -risk_amount)
        }
    }

    /// Simulate one business day: draw a trade count, execute trades
    /// sequentially, then update streaks, peak, and drawdown.
    pub fn simulate_single_day(&mut self, date: NaiveDate) -> DailyResult {
        let starting_balance = self.current_balance;
        let drawn = self.trades_per_day.sample(&mut self.rng) as u32;
        let num_trades = drawn.min(self.params.max_trades_per_day);

        let mut trades_taken = 0u32;
        let mut wins = 0u32;
        let mut losses = 0u32;
        let mut daily_pnl = 0.0;

        for _ in 0..num_trades {
            if self.current_balance <= 0.0 {
                break;
            }
            let (outcome, pnl) = self.simulate_single_trade();
            self.current_balance += pnl;
            daily_pnl += pnl;
            trades_taken += 1;
            match outcome {
                TradeOutcome::Win => wins += 1,
                TradeOutcome::Loss => losses += 1,
            }
            self.trades.push(TradeRecord {
                date,
                outcome,
                pnl,
                balance_after: self.current_balance,
            });
        }

        self.update_streaks(wins, losses);

        if self.current_balance > self.peak_balance {
            self.peak_balance = self.current_balance;
            self.current_drawdown_duration = 0;
        } else {
            self.current_drawdown_duration += 1;
            let current_drawdown = self.peak_balance - self.current_balance;
            self.max_drawdown = self.max_drawdown.max(current_drawdown);
            self.max_drawdown_duration = self
                .max_drawdown_duration
                .max(self.current_drawdown_duration);
        }

        let win_rate = if trades_taken > 0 {
            f64::from(wins) / f64::from(trades_taken)
        } else {
            0.0
        };

        DailyResult {
            date,
            starting_balance,
            ending_balance: self.current_balance,
            trades_taken,
            wins,
            losses,
            daily_pnl,
            win_rate,
            cumulative_pnl: self.current_balance - self.params.initial_balance,
            drawdown: (self.peak_balance - self.current_balance) / self.peak_balance * 100.0,
            max_drawdown_to_date: self.max_drawdown,
        }
    }

    // A day feeds at most one streak: only-wins extends the win streak,
    // only-losses the loss streak, anything else resets both.
    fn update_streaks(&mut self, wins: u32, losses: u32) {
        if wins > 0 && losses == 0 {
            if self.streak == Some(StreakKind::Win) {
                self.current_streak += 1;
            } else {
                self.current_streak = 1;
                self.streak = Some(StreakKind::Win);
            }
        } else if losses > 0 && wins == 0 {
            if self.streak == Some(StreakKind::Loss) {
                self.current_streak += 1;
            } else {
                self.current_streak = 1;
                self.streak = Some(StreakKind::Loss);
            }
        } else {
            self.current_streak = 0;
            self.streak = None;
        }

        match self.streak {
            Some(StreakKind::Win) => {
                self.longest_winning_streak = self.longest_winning_streak.max(self.current_streak);
            }
            Some(StreakKind::Loss) => {
                self.longest_losing_streak = self.longest_losing_streak.max(self.current_streak);
            }
            None => {}
        }
    }

    /// Withdraw the configured share of accrued profit. Call on the 1st of a
    /// month; a no-op when nothing is configured or the run is not in profit.
    pub fn handle_monthly_cashout(&mut self) {
        if self.params.monthly_cashout_percent <= 0.0 {
            return;
        }
        let profit = self.current_balance - self.params.initial_balance;
        if profit <= 0.0 {
            return;
        }
        let cashout = profit * self.params.monthly_cashout_percent / 100.0;
        self.current_balance -= cashout;
        self.total_cashout += cashout;
    }

    /// Step business days until the horizon is exhausted or `cancel` is set.
    ///
    /// Each simulated day is appended to the ordered log and handed to the
    /// sink before the next one starts. The cancellation flag is observed
    /// once per business day, before simulating it.
    pub fn run(
        &mut self,
        sink: &dyn ProgressSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunOutcome, EngineError> {
        while self.days_elapsed < self.params.simulation_days {
            let day = self.days_elapsed;
            let date = self.start_date + Duration::days(i64::from(day));
            if is_weekend(date) {
                self.days_elapsed += 1;
                continue;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Ok(RunOutcome::Cancelled);
            }

            let result = self.simulate_single_day(date);
            if date.day() == 1 {
                self.handle_monthly_cashout();
            }
            self.daily_results.push(result.clone());
            self.days_elapsed += 1;
            sink.on_day(day, &result)?;
        }

        Ok(RunOutcome::Completed {
            daily_results: self.daily_results.clone(),
            metrics: self.final_metrics(),
        })
    }

    /// Aggregate metrics over the state accumulated so far.
    pub fn final_metrics(&self) -> SimulationMetrics {
        metrics::aggregate(&self.trades, &self.daily_results, &self.path_summary())
    }

    fn path_summary(&self) -> PathSummary {
        PathSummary {
            max_drawdown: self.max_drawdown,
            max_drawdown_duration: self.max_drawdown_duration,
            longest_winning_streak: self.longest_winning_streak,
            longest_losing_streak: self.longest_losing_streak,
            total_cashout: self.total_cashout,
            final_balance: self.current_balance,
        }
    }

    pub fn params(&self) -> &TradeParameters {
        &self.params
    }

    pub fn current_balance(&self) -> f64 {
        self.current_balance
    }

    pub fn total_cashout(&self) -> f64 {
        self.total_cashout
    }

    /// Calendar days consumed so far, weekends included.
    pub fn days_elapsed(&self) -> u32 {
        self.days_elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.days_elapsed >= self.params.simulation_days
    }

    pub fn daily_results(&self) -> &[DailyResult] {
        &self.daily_results
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    #[cfg(test)]
    fn set_balance_for_test(&mut self, balance: f64) {
        self.current_balance = balance;
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullSink;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    /// First Monday of 2024.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn params(days: u32) -> TradeParameters {
        TradeParameters {
            simulation_days: days,
            ..TradeParameters::default()
        }
    }

    struct RecordingSink {
        days: Mutex<Vec<(u32, DailyResult)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                days: Mutex::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<(u32, DailyResult)> {
            std::mem::take(&mut *self.days.lock().unwrap())
        }
    }

    impl ProgressSink for RecordingSink {
        fn on_day(&self, day: u32, result: &DailyResult) -> Result<(), SinkError> {
            self.days.lock().unwrap().push((day, result.clone()));
            Ok(())
        }

        fn on_complete(
            &self,
            _daily_results: &[DailyResult],
            _metrics: &SimulationMetrics,
        ) -> Result<(), SinkError> {
            Ok(())
        }

        fn on_stopped(&self, _message: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn run_to_completion(params: TradeParameters, seed: u64) -> (Vec<DailyResult>, SimulationMetrics) {
        let mut engine = SimulationEngine::new(params, seed, monday()).unwrap();
        match engine.run(&NullSink, None).unwrap() {
            RunOutcome::Completed {
                daily_results,
                metrics,
            } => (daily_results, metrics),
            RunOutcome::Cancelled => panic!("run without cancel flag cannot be cancelled"),
        }
    }

    #[test]
    fn invalid_parameters_never_build_an_engine() {
        let bad = TradeParameters {
            win_rate: 1.5,
            ..TradeParameters::default()
        };
        assert!(SimulationEngine::new(bad, 1, monday()).is_err());
    }

    #[test]
    fn fixed_seed_replays_identical_history() {
        let (days_a, metrics_a) = run_to_completion(params(90), 42);
        let (days_b, metrics_b) = run_to_completion(params(90), 42);
        assert_eq!(days_a, days_b);
        assert_eq!(metrics_a, metrics_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let (days_a, _) = run_to_completion(params(90), 1);
        let (days_b, _) = run_to_completion(params(90), 2);
        assert_ne!(days_a, days_b);
    }

    #[test]
    fn one_week_from_monday_has_five_business_days() {
        let (days, _) = run_to_completion(params(7), 7);
        assert_eq!(days.len(), 5);
        for result in &days {
            assert!(!is_weekend(result.date), "{} is a weekend", result.date);
        }
        assert_eq!(days[0].date, monday());
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn trade_count_never_exceeds_maximum() {
        let (days, _) = run_to_completion(params(365), 42);
        for result in &days {
            assert!(result.trades_taken <= 3);
            assert_eq!(result.wins + result.losses, result.trades_taken);
        }
    }

    #[test]
    fn trade_counts_spread_like_a_capped_poisson() {
        // Poisson(0.7 * 3 = 2.1) capped at 3: over a year of business days
        // the count must actually vary, hit both extremes, and average near
        // the (capped) mean rather than the configured maximum.
        let (days, _) = run_to_completion(params(365), 42);
        assert!(days.iter().any(|d| d.trades_taken == 0));
        assert!(days.iter().any(|d| d.trades_taken == 3));
        let average = days.iter().map(|d| f64::from(d.trades_taken)).sum::<f64>()
            / days.len() as f64;
        assert!(
            (1.5..2.7).contains(&average),
            "average trades/day {average} is far from the capped Poisson mean"
        );
    }

    #[test]
    fn reference_parameters_are_reproducible() {
        // The documented example set: 10k balance, 1% risk, 2:1 reward,
        // max 3 trades/day, 55% win rate, one year.
        let (days_a, metrics_a) = run_to_completion(params(365), 1234);
        let (days_b, metrics_b) = run_to_completion(params(365), 1234);
        assert_eq!(metrics_a.final_balance, metrics_b.final_balance);
        assert_eq!(metrics_a.total_trades, metrics_b.total_trades);
        assert_eq!(metrics_a.sharpe_ratio, metrics_b.sharpe_ratio);
        assert_eq!(days_a.len(), days_b.len());
        assert_eq!(
            metrics_a.total_trades,
            days_a.iter().map(|d| d.trades_taken).sum::<u32>()
        );
    }

    #[test]
    fn daily_identities_hold() {
        let initial = 10_000.0;
        let (days, _) = run_to_completion(params(120), 9);
        for result in &days {
            assert_eq!(result.cumulative_pnl, result.ending_balance - initial);
            if result.trades_taken > 0 {
                assert_eq!(
                    result.win_rate,
                    f64::from(result.wins) / f64::from(result.trades_taken)
                );
            } else {
                assert_eq!(result.win_rate, 0.0);
            }
            assert!(result.drawdown >= 0.0);
        }
    }

    #[test]
    fn max_drawdown_to_date_is_non_decreasing() {
        let (days, metrics) = run_to_completion(params(365), 5);
        let mut previous = 0.0;
        for result in &days {
            assert!(result.max_drawdown_to_date >= previous);
            previous = result.max_drawdown_to_date;
        }
        assert_eq!(metrics.max_drawdown, previous);
    }

    #[test]
    fn balance_continuity_between_days_without_cashout() {
        let (days, _) = run_to_completion(params(60), 11);
        for pair in days.windows(2) {
            assert_eq!(pair[1].starting_balance, pair[0].ending_balance);
        }
    }

    #[test]
    fn cashout_deducts_exactly_on_the_first_of_month() {
        // 2024-01-01 is a Monday, 2024-02-01 a Thursday, 2024-03-01 a Friday:
        // two month boundaries inside the horizon, both business days.
        let p = TradeParameters {
            monthly_cashout_percent: 10.0,
            simulation_days: 70,
            ..TradeParameters::default()
        };
        let mut engine = SimulationEngine::new(p, 42, monday()).unwrap();
        let outcome = engine.run(&NullSink, None).unwrap();
        let days = match outcome {
            RunOutcome::Completed { daily_results, .. } => daily_results,
            RunOutcome::Cancelled => unreachable!(),
        };

        let mut expected_cashout = 0.0;
        for pair in days.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.date.day() == 1 && prev.cumulative_pnl > 0.0 {
                let deduction = prev.cumulative_pnl * 0.10;
                expected_cashout += deduction;
                assert!(
                    (next.starting_balance - (prev.ending_balance - deduction)).abs() < 1e-9,
                    "cashout on {} not applied to the following day",
                    prev.date
                );
            } else {
                assert_eq!(next.starting_balance, prev.ending_balance);
            }
        }
        assert!((engine.total_cashout() - expected_cashout).abs() < 1e-9);
    }

    #[test]
    fn cashout_is_a_noop_without_profit() {
        let p = TradeParameters {
            monthly_cashout_percent: 10.0,
            ..TradeParameters::default()
        };
        let mut engine = SimulationEngine::new(p, 3, monday()).unwrap();
        engine.set_balance_for_test(9_000.0);
        engine.handle_monthly_cashout();
        assert_eq!(engine.current_balance(), 9_000.0);
        assert_eq!(engine.total_cashout(), 0.0);
    }

    #[test]
    fn cashout_withdraws_share_of_profit() {
        let p = TradeParameters {
            monthly_cashout_percent: 10.0,
            ..TradeParameters::default()
        };
        let mut engine = SimulationEngine::new(p, 3, monday()).unwrap();
        engine.set_balance_for_test(12_000.0);
        engine.handle_monthly_cashout();
        assert!((engine.current_balance() - 11_800.0).abs() < 1e-9);
        assert!((engine.total_cashout() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn cashout_disabled_leaves_balance_alone() {
        let mut engine = SimulationEngine::new(TradeParameters::default(), 3, monday()).unwrap();
        engine.set_balance_for_test(12_000.0);
        engine.handle_monthly_cashout();
        assert_eq!(engine.current_balance(), 12_000.0);
    }

    #[test]
    fn depleted_balance_takes_no_trades() {
        let mut engine = SimulationEngine::new(TradeParameters::default(), 8, monday()).unwrap();
        engine.set_balance_for_test(0.0);
        let result = engine.simulate_single_day(monday());
        assert_eq!(result.trades_taken, 0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.ending_balance, 0.0);
    }

    #[test]
    fn preset_cancel_flag_stops_before_any_day() {
        let mut engine = SimulationEngine::new(params(30), 21, monday()).unwrap();
        let cancel = AtomicBool::new(true);
        let sink = RecordingSink::new();
        let outcome = engine.run(&sink, Some(&cancel)).unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert!(sink.take().is_empty());
        assert_eq!(engine.days_elapsed(), 0);
    }

    #[test]
    fn cancelled_run_resumes_into_identical_history() {
        let seed = 77;
        let (reference, reference_metrics) = run_to_completion(params(30), seed);

        let mut engine = SimulationEngine::new(params(30), seed, monday()).unwrap();
        let cancel = AtomicBool::new(false);
        let counting = CountingCancelSink {
            cancel: &cancel,
            after: 6,
            seen: Mutex::new(0),
        };
        let outcome = engine.run(&counting, Some(&cancel)).unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert!(engine.days_elapsed() < 30);

        cancel.store(false, Ordering::Relaxed);
        let outcome = engine.run(&NullSink, Some(&cancel)).unwrap();
        match outcome {
            RunOutcome::Completed {
                daily_results,
                metrics,
            } => {
                assert_eq!(daily_results, reference);
                assert_eq!(metrics, reference_metrics);
            }
            RunOutcome::Cancelled => panic!("second segment should complete"),
        }
    }

    /// Sets the cancel flag after a fixed number of accepted days.
    struct CountingCancelSink<'a> {
        cancel: &'a AtomicBool,
        after: u32,
        seen: Mutex<u32>,
    }

    impl ProgressSink for CountingCancelSink<'_> {
        fn on_day(&self, _day: u32, _result: &DailyResult) -> Result<(), SinkError> {
            let mut seen = self.seen.lock().unwrap();
            *seen += 1;
            if *seen >= self.after {
                self.cancel.store(true, Ordering::Relaxed);
            }
            Ok(())
        }

        fn on_complete(
            &self,
            _daily_results: &[DailyResult],
            _metrics: &SimulationMetrics,
        ) -> Result<(), SinkError> {
            Ok(())
        }

        fn on_stopped(&self, _message: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_aborts_the_run() {
        struct FailingSink;
        impl ProgressSink for FailingSink {
            fn on_day(&self, _day: u32, _result: &DailyResult) -> Result<(), SinkError> {
                Err(SinkError::Disconnected)
            }
            fn on_complete(
                &self,
                _daily_results: &[DailyResult],
                _metrics: &SimulationMetrics,
            ) -> Result<(), SinkError> {
                Ok(())
            }
            fn on_stopped(&self, _message: &str) -> Result<(), SinkError> {
                Ok(())
            }
        }

        let mut engine = SimulationEngine::new(params(10), 4, monday()).unwrap();
        let err = engine.run(&FailingSink, None).unwrap_err();
        assert!(matches!(err, EngineError::Sink(SinkError::Disconnected)));
    }

    #[test]
    fn emitted_days_match_engine_log() {
        let mut engine = SimulationEngine::new(params(14), 13, monday()).unwrap();
        let sink = RecordingSink::new();
        engine.run(&sink, None).unwrap();
        let emitted = sink.take();
        let logged = engine.daily_results();
        assert_eq!(emitted.len(), logged.len());
        for ((day, result), expected) in emitted.iter().zip(logged) {
            assert_eq!(result, expected);
            // Day indices are calendar offsets, so they match the date.
            assert_eq!(
                monday() + Duration::days(i64::from(*day)),
                result.date
            );
        }
    }
}
