//! payoff-runner: headless forecast runner.
//!
//! Usage:
//!   payoff-runner --db debts.db --months 36 --budget 600 --strategy snowball
//!   payoff-runner --demo --start 2026-06-01
//!   payoff-runner --db debts.db --ipc-mode
//!
//! In IPC mode `{"type":"calculate","budget":null}` runs on minimums only;
//! leaving `budget` out keeps the session budget.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use payoff_core::{
    bucket::{BucketKind, PromoTerms},
    card::CardSnapshot,
    clock::{add_months, first_of_month},
    config::{CashFlow, ForecastRequest, RunnerConfig},
    ledger::ForecastOutcome,
    service::ForecastService,
    store::{decimal_arg, DebtStore},
    strategy::Strategy,
    types::Month,
};
use rust_decimal::Decimal;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Calculate {
        #[serde(default)]
        start: Option<NaiveDate>,
        #[serde(default)]
        months: Option<u32>,
        #[serde(default, deserialize_with = "explicit_budget")]
        budget: Option<Option<Decimal>>,
        #[serde(default)]
        strategy: Option<Strategy>,
        #[serde(default)]
        cash_flow: Option<CashFlow>,
    },
    Recalculate {
        #[serde(default)]
        months: Option<u32>,
        #[serde(default, deserialize_with = "explicit_budget")]
        budget: Option<Option<Decimal>>,
        #[serde(default)]
        strategy: Option<Strategy>,
    },
    Strategy,
    Cliffs {
        #[serde(default)]
        lookahead_months: Option<u32>,
    },
    Forecasts {
        #[serde(default)]
        month: Option<Month>,
    },
    Payoff,
    Clear,
    Quit,
}

/// Absent keeps the session budget; `null` asks for minimums only.
fn explicit_budget<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<Decimal> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

/// Defaults for one session: config file, then stored debt config, then flags.
struct Session {
    config:   RunnerConfig,
    today:    NaiveDate,
    months:   u32,
    budget:   Option<Decimal>,
    strategy: Strategy,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match flag_value(&args, "--config") {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    let db = flag_value(&args, "--db").unwrap_or(config.db_path.as_str()).to_string();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let demo = args.iter().any(|a| a == "--demo");
    let today = match flag_value(&args, "--start") {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--start expects YYYY-MM-DD, got {s}"))?,
        None => Utc::now().date_naive(),
    };

    let store = DebtStore::open(&db)?;
    store.migrate()?;
    if demo && store.card_count()? == 0 {
        seed_demo(&store, today)?;
    }

    let stored = store.latest_debt_config()?;
    let budget = match flag_value(&args, "--budget") {
        Some(b) => Some(decimal_arg(b)?),
        None => stored.as_ref().and_then(|c| c.monthly_payment_budget),
    };
    let strategy = match flag_value(&args, "--strategy") {
        Some(s) => s.parse::<Strategy>()?,
        None => stored.map(|c| c.strategy).unwrap_or(config.default_strategy),
    };
    let session = Session {
        months: parse_arg(&args, "--months", config.default_months),
        config,
        today,
        budget,
        strategy,
    };

    if ipc_mode {
        run_ipc_loop(&store, &session)?;
    } else {
        println!("payoff-runner");
        println!("  db:        {db}");
        println!("  start:     {}", first_of_month(today));
        println!("  months:    {}", session.months);
        println!("  strategy:  {}", session.strategy);
        match session.budget {
            Some(b) => println!("  budget:    {b}"),
            None => println!("  budget:    minimums only"),
        }
        println!();

        let service = ForecastService::new(&store);
        let request = ForecastRequest::new(today, session.strategy)
            .with_months(session.months)
            .with_budget(session.budget);
        let outcome = service.calculate(request)?;
        print_summary(&outcome, &service, &session)?;
    }

    Ok(())
}

fn run_ipc_loop(store: &DebtStore, session: &Session) -> Result<()> {
    let service = ForecastService::new(store);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unreadable command: {e}");
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        let reply = match handle_command(&service, session, cmd) {
            Ok(Some(value)) => value,
            Ok(None) => break,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    service: &ForecastService<'_>,
    session: &Session,
    cmd: IpcCommand,
) -> Result<Option<serde_json::Value>> {
    let value = match cmd {
        IpcCommand::Calculate { start, months, budget, strategy, cash_flow } => {
            let mut request = ForecastRequest::new(
                start.unwrap_or(session.today),
                strategy.unwrap_or(session.strategy),
            )
            .with_months(months.unwrap_or(session.months))
            .with_budget(budget.unwrap_or(session.budget));
            if let Some(cf) = cash_flow {
                request = request.with_cash_flow(cf);
            }
            serde_json::to_value(service.calculate(request)?)?
        }
        IpcCommand::Recalculate { months, budget, strategy } => {
            let result = service.recalculate(
                strategy.unwrap_or(session.strategy),
                budget.unwrap_or(session.budget),
                months.unwrap_or(session.config.recalculate_months),
                session.today,
            )?;
            serde_json::to_value(result)?
        }
        IpcCommand::Strategy => serde_json::to_value(service.strategy(session.today)?)?,
        IpcCommand::Cliffs { lookahead_months } => {
            let lookahead = lookahead_months.unwrap_or(session.config.lookahead_months);
            serde_json::to_value(service.cliffs(session.today, lookahead)?)?
        }
        IpcCommand::Forecasts { month } => serde_json::to_value(service.forecasts(month)?)?,
        IpcCommand::Payoff => serde_json::to_value(service.payoff()?)?,
        IpcCommand::Clear => {
            service.clear()?;
            serde_json::json!({ "cleared": true })
        }
        IpcCommand::Quit => return Ok(None),
    };
    Ok(Some(value))
}

fn print_summary(outcome: &ForecastOutcome, service: &ForecastService<'_>, session: &Session) -> Result<()> {
    let summary = &outcome.summary;
    println!("=== FORECAST SUMMARY ===");
    println!("  starting debt:   {}", summary.total_debt);
    println!("  total interest:  {}", summary.total_interest);
    println!("  months:          {}", summary.months_to_payoff);
    match outcome.debt_free_date {
        Some(date) => println!("  debt free:       {date}"),
        None => println!("  debt free:       not within {} months", session.months),
    }

    println!();
    println!("=== PAYOFF ORDER ===");
    let payoffs = service.payoff()?;
    if payoffs.is_empty() {
        println!("  (No card paid off within the horizon)");
    }
    for p in &payoffs {
        println!(
            "  {} | {} | interest {}",
            p.entry.payoff_month, p.card_name, p.entry.total_interest_on_card
        );
    }

    let cliffs = service.cliffs(session.today, session.config.lookahead_months)?;
    if !cliffs.is_empty() {
        println!();
        println!("=== PROMO CLIFFS (next {} months) ===", session.config.lookahead_months);
        for c in &cliffs {
            println!(
                "  {} | {} / {} | balance {} | +{}/month",
                c.promo_end_date, c.card_name, c.bucket_name, c.balance, c.monthly_interest_increase
            );
        }
    }
    Ok(())
}

fn seed_demo(store: &DebtStore, today: NaiveDate) -> Result<()> {
    let start = first_of_month(today);
    let cards = [
        CardSnapshot::new("Everyday Rewards", decimal_arg("0.2299")?)
            .with_limit(decimal_arg("10000")?, 12)
            .with_bucket("Purchases", BucketKind::Purchases, decimal_arg("3200")?, PromoTerms::none())
            .with_bucket(
                "Balance transfer",
                BucketKind::Transfer,
                decimal_arg("2500")?,
                PromoTerms::until(Decimal::ZERO, add_months(start, 2)),
            ),
        CardSnapshot::new("Store Card", decimal_arg("26.99")?)
            .with_bucket("Purchases", BucketKind::Purchases, decimal_arg("850")?, PromoTerms::none()),
        CardSnapshot::new("Travel Card", decimal_arg("0.1849")?)
            .with_minimum(decimal_arg("0.03")?, decimal_arg("35")?)
            .with_bucket(
                "Purchases",
                BucketKind::Purchases,
                decimal_arg("4100")?,
                PromoTerms::until(decimal_arg("0.0499")?, add_months(start, 14)),
            ),
    ];
    for card in &cards {
        store.insert_card(card)?;
    }
    log::info!("seeded {} demo cards", cards.len());
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
