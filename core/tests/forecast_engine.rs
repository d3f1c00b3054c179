//! Forecast engine behaviour: the five monthly phases, run termination
//! and the shape of the emitted outcome.
//!
//! Every scenario is built from an in-memory snapshot; nothing here
//! touches the store.

use chrono::NaiveDate;
use payoff_core::{
    bucket::{BucketKind, PromoTerms},
    card::CardSnapshot,
    clock::MonthClock,
    config::{CashFlow, ForecastRequest},
    engine::{ForecastEngine, SimState},
    ledger::ForecastOutcome,
    snapshot::DebtSnapshot,
    strategy::Strategy,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn card(name: &str, apr: Decimal, balance: Decimal) -> CardSnapshot {
    CardSnapshot::new(name, apr).with_bucket("Purchases", BucketKind::Purchases, balance, PromoTerms::none())
}

fn run(cards: Vec<CardSnapshot>, request: ForecastRequest) -> ForecastOutcome {
    let request = request.validated().expect("valid request");
    ForecastEngine::new(request).run(&DebtSnapshot::new(cards))
}

fn request(strategy: Strategy) -> ForecastRequest {
    ForecastRequest::new(ymd(2026, 1, 1), strategy)
}

/// 1000 at 12% with no budget: 10.00 interest, a 25.00 floor minimum,
/// 985.00 left after the first month.
#[test]
fn single_card_minimum_only_first_month() {
    let c = card("Visa", dec!(0.12), dec!(1000));
    let id = c.id.clone();
    let outcome = run(vec![c], request(Strategy::Avalanche));

    let first = outcome.card_rows(&id).next().expect("first card row");
    assert_eq!(first.month, ymd(2026, 1, 1));
    assert_eq!(first.beginning_balance, dec!(1000.00));
    assert_eq!(first.interest, dec!(10.00));
    assert_eq!(first.payment, dec!(25.00));
    assert_eq!(first.ending_balance, dec!(985.00));

    let summary = outcome.summary_rows().next().expect("first summary row");
    assert_eq!(summary.total_minimum_payments, dec!(25.00));
    assert_eq!(summary.total_extra_payments, dec!(0));
}

/// An APR entered in percentage points forecasts the same as its fraction.
#[test]
fn percentage_point_apr_matches_fraction() {
    let a = run(vec![card("Visa", dec!(12), dec!(1000))], request(Strategy::Avalanche));
    let b = run(vec![card("Visa", dec!(0.12), dec!(1000))], request(Strategy::Avalanche));
    assert_eq!(a.summary.total_interest, b.summary.total_interest);
    assert_eq!(a.summary.months_to_payoff, b.summary.months_to_payoff);
}

/// A budget ten times the debt clears everything in the first month.
#[test]
fn oversized_budget_pays_off_within_two_months() {
    let outcome = run(
        vec![card("Visa", dec!(0.1999), dec!(5000))],
        request(Strategy::Avalanche).with_budget(dec!(50000)),
    );
    assert!(outcome.summary.months_to_payoff <= 2);
    assert_eq!(outcome.payoff_schedule.len(), 1);
    assert_eq!(outcome.payoff_schedule[0].payoff_month, ymd(2026, 1, 1));
    assert_eq!(outcome.debt_free_date, Some(ymd(2026, 2, 1)));
}

/// Budget 30 against 50 of minimums: each minimum scaled by 0.6.
#[test]
fn short_budget_scales_every_minimum() {
    let a = card("A", dec!(0), dec!(500));
    let b = card("B", dec!(0), dec!(500));
    let (a_id, b_id) = (a.id.clone(), b.id.clone());
    let outcome = run(vec![a, b], request(Strategy::Avalanche).with_budget(dec!(30)));

    let summary = outcome.summary_rows().next().unwrap();
    assert_eq!(summary.total_minimum_payments, dec!(30.00));
    assert_eq!(summary.total_extra_payments, dec!(0));
    for id in [&a_id, &b_id] {
        let row = outcome.card_rows(id).next().unwrap();
        assert_eq!(row.payment, dec!(15.00));
        assert_eq!(row.ending_balance, dec!(485.00));
    }
}

/// Scaled minimums that sum to a hair over the budget must not produce a
/// negative extra pool.
#[test]
fn extra_pool_never_goes_negative_after_scaling() {
    let cards = vec![
        card("A", dec!(0), dec!(1000)),
        card("B", dec!(0), dec!(1000)),
        card("C", dec!(0), dec!(1000)),
    ];
    let outcome = run(cards, request(Strategy::Snowball).with_budget(dec!(10)).with_months(6));

    for row in outcome.summary_rows() {
        assert_eq!(row.total_extra_payments, dec!(0), "month {}", row.month);
        assert_eq!(row.total_minimum_payments, dec!(10.00), "month {}", row.month);
        assert!(row.total_ending_debt < row.total_beginning_debt);
    }
}

/// Per card per month: ending = beginning + interest - payment, to the cent
/// (independent roundings of each column allow a few cents of slack).
#[test]
fn card_rows_conserve_balance() {
    let cards = vec![
        card("High", dec!(0.2499), dec!(4200)),
        card("Mid", dec!(17.9), dec!(2600)),
        CardSnapshot::new("Split", dec!(0.219))
            .with_bucket("Purchases", BucketKind::Purchases, dec!(900), PromoTerms::none())
            .with_bucket("Transfer", BucketKind::Transfer, dec!(3100), PromoTerms::until(dec!(0), ymd(2026, 6, 1))),
    ];
    let outcome = run(cards, request(Strategy::Avalanche).with_budget(dec!(650)).with_months(60));

    let tolerance = dec!(0.03);
    for row in outcome.forecast_rows.iter().filter_map(|r| r.as_card()) {
        let expected = row.beginning_balance + row.interest - row.payment;
        assert!(
            (expected - row.ending_balance).abs() <= tolerance,
            "{} {}: {} + {} - {} != {}",
            row.month, row.card_id, row.beginning_balance, row.interest, row.payment, row.ending_balance
        );
    }
    for s in outcome.summary_rows() {
        let expected = s.total_beginning_debt + s.total_interest
            - s.total_minimum_payments - s.total_extra_payments;
        assert!((expected - s.total_ending_debt).abs() <= dec!(0.05), "summary {}", s.month);
    }
}

/// When payments outrun interest, total debt never rises month to month.
#[test]
fn total_debt_is_monotonic_when_budget_covers_interest() {
    let cards = vec![card("A", dec!(0.24), dec!(3000)), card("B", dec!(0.09), dec!(1500))];
    let outcome = run(cards, request(Strategy::Snowball).with_budget(dec!(300)).with_months(60));

    let endings: Vec<Decimal> = outcome.summary_rows().map(|s| s.total_ending_debt).collect();
    assert!(!endings.is_empty());
    for pair in endings.windows(2) {
        assert!(pair[1] <= pair[0], "debt rose from {} to {}", pair[0], pair[1]);
    }
    assert!(outcome.debt_free_date.is_some());
}

/// A large low-rate balance against a small high-rate one: avalanche pays
/// less total interest than snowball.
#[test]
fn avalanche_beats_snowball_on_interest() {
    let cards = || vec![card("Costly", dec!(0.25), dec!(5000)), card("Cheap", dec!(0.05), dec!(1000))];
    let avalanche = run(cards(), request(Strategy::Avalanche).with_budget(dec!(600)).with_months(120));
    let snowball = run(cards(), request(Strategy::Snowball).with_budget(dec!(600)).with_months(120));

    assert!(avalanche.debt_free_date.is_some());
    assert!(snowball.debt_free_date.is_some());
    assert!(
        avalanche.summary.total_interest < snowball.summary.total_interest,
        "avalanche {} vs snowball {}",
        avalanche.summary.total_interest,
        snowball.summary.total_interest
    );
}

/// Minimums go to the highest-APR bucket of a card first, even under
/// snowball and even when a zero-rate bucket sits earlier on the card.
#[test]
fn minimum_drains_highest_apr_bucket_first() {
    let snapshot = DebtSnapshot::new(vec![CardSnapshot::new("Split", dec!(0.24))
        .with_bucket("Transfer", BucketKind::Transfer, dec!(1000), PromoTerms::until(dec!(0), ymd(2027, 1, 1)))
        .with_bucket("Purchases", BucketKind::Purchases, dec!(100), PromoTerms::none())]);

    let start = ymd(2026, 1, 1);
    let mut state = SimState::from_snapshot(&snapshot, MonthClock::new(start, 12));
    let mut payoffs = Vec::new();
    let tick = state.tick(start, state.clock.previous(), Strategy::Snowball, Some(dec!(25)), &mut payoffs);

    // 100 + 2.00 interest on purchases, then the whole 25 minimum lands there.
    assert_eq!(tick.totals.minimum, dec!(25));
    assert_eq!(tick.totals.extra, dec!(0));
    assert_eq!(state.buckets[0].balance, dec!(1000));
    assert_eq!(state.buckets[1].balance, dec!(77));
}

/// Snowball sends the extra pool to the smallest remaining bucket even
/// when another card carries a far higher APR; avalanche does the reverse.
#[test]
fn snowball_extra_goes_to_smallest_balance() {
    let snapshot = DebtSnapshot::new(vec![
        card("Costly", dec!(0.30), dec!(2000)),
        card("Small", dec!(0.06), dec!(300)),
    ]);
    let start = ymd(2026, 1, 1);

    // After interest: 2050 (min 41) and 301.50 (min 25), so 434 is extra.
    let mut snowball = SimState::from_snapshot(&snapshot, MonthClock::new(start, 12));
    let mut payoffs = Vec::new();
    let tick = snowball.tick(start, snowball.clock.previous(), Strategy::Snowball, Some(dec!(500)), &mut payoffs);
    assert_eq!(tick.totals.extra, dec!(434));
    assert_eq!(snowball.buckets[1].balance, dec!(0));
    assert_eq!(snowball.buckets[0].balance, dec!(1851.5));
    assert_eq!(payoffs.len(), 1);
    assert_eq!(payoffs[0].card_id, snapshot.cards[1].id);

    let mut avalanche = SimState::from_snapshot(&snapshot, MonthClock::new(start, 12));
    let mut payoffs = Vec::new();
    avalanche.tick(start, avalanche.clock.previous(), Strategy::Avalanche, Some(dec!(500)), &mut payoffs);
    assert_eq!(avalanche.buckets[0].balance, dec!(1575));
    assert_eq!(avalanche.buckets[1].balance, dec!(276.5));
    assert!(payoffs.is_empty());
}

/// Promo ending 2026-08-01: still promo in August, standard from September,
/// and the cliff is reported once with the post-interest balance.
#[test]
fn promo_cliff_is_reported_in_the_first_standard_month() {
    let c = CardSnapshot::new("Transfer Card", dec!(0.20)).with_bucket(
        "Transfer",
        BucketKind::Transfer,
        dec!(1000),
        PromoTerms::until(dec!(0), ymd(2026, 8, 1)),
    );
    let id = c.id.clone();
    let outcome = run(vec![c], ForecastRequest::new(ymd(2026, 6, 15), Strategy::Avalanche).with_months(6));

    let aug = outcome.card_rows(&id).find(|r| r.month == ymd(2026, 8, 1)).unwrap();
    assert_eq!(aug.interest, dec!(0));
    let sep = outcome.card_rows(&id).find(|r| r.month == ymd(2026, 9, 1)).unwrap();
    assert_eq!(sep.interest, dec!(15.42));

    assert_eq!(outcome.cliffs.len(), 1);
    let cliff = &outcome.cliffs[0];
    assert_eq!(cliff.month, ymd(2026, 9, 1));
    assert_eq!(cliff.from_apr, dec!(0));
    assert_eq!(cliff.to_apr, dec!(0.20));
    assert_eq!(cliff.balance_at_cliff, dec!(940.42));

    for s in outcome.summary_rows() {
        assert_eq!(s.has_cliff, s.month == ymd(2026, 9, 1), "month {}", s.month);
        assert_eq!(s.cliff_details.len(), usize::from(s.has_cliff));
    }
}

/// No cards, zero balances or bucketless cards: debt free at the start month.
#[test]
fn nothing_to_pay_is_debt_free_immediately() {
    let start = ymd(2026, 3, 1);
    let cases = vec![
        Vec::new(),
        vec![card("Empty", dec!(0.2), dec!(0))],
        vec![CardSnapshot::new("No buckets", dec!(0.2))],
    ];
    for cards in cases {
        let outcome = run(cards, ForecastRequest::new(start, Strategy::Avalanche));
        assert!(outcome.forecast_rows.is_empty());
        assert!(outcome.payoff_schedule.is_empty());
        assert_eq!(outcome.debt_free_date, Some(start));
        assert_eq!(outcome.summary.months_to_payoff, 0);
        assert_eq!(outcome.summary.total_debt, dec!(0));
    }
}

/// Two zero-rate cards under a 400 budget: A clears in January, B in
/// March, and the household is debt free from April.
#[test]
fn payoff_schedule_and_debt_free_date() {
    let a = card("A", dec!(0), dec!(300));
    let b = card("B", dec!(0), dec!(600));
    let (a_id, b_id) = (a.id.clone(), b.id.clone());
    let outcome = run(vec![a, b], request(Strategy::Avalanche).with_budget(dec!(400)));

    assert_eq!(outcome.summary.months_to_payoff, 3);
    assert_eq!(outcome.debt_free_date, Some(ymd(2026, 4, 1)));
    assert_eq!(outcome.summary.total_debt, dec!(900.00));
    assert_eq!(outcome.summary.total_interest, dec!(0.00));

    let schedule: Vec<(&str, NaiveDate)> = outcome
        .payoff_schedule
        .iter()
        .map(|p| (p.card_id.as_str(), p.payoff_month))
        .collect();
    assert_eq!(schedule, vec![(a_id.as_str(), ymd(2026, 1, 1)), (b_id.as_str(), ymd(2026, 3, 1))]);

    // A paid-off card emits no further rows.
    assert_eq!(outcome.card_rows(&a_id).count(), 1);
    assert_eq!(outcome.card_rows(&b_id).count(), 3);
    let b_feb = outcome.card_rows(&b_id).nth(1).unwrap();
    assert_eq!(b_feb.ending_balance, dec!(100.00));

    let rows: Vec<_> = outcome.summary_rows().collect();
    assert_eq!(rows.last().unwrap().debt_free_date, Some(ymd(2026, 4, 1)));
    assert!(rows[..rows.len() - 1].iter().all(|r| r.debt_free_date.is_none()));
}

/// A horizon too short to clear the debt ends without a debt-free date.
#[test]
fn horizon_exhaustion_is_not_an_error() {
    let outcome = run(vec![card("Visa", dec!(0.24), dec!(1000))], request(Strategy::Avalanche).with_months(3));
    assert_eq!(outcome.summary.months_to_payoff, 3);
    assert_eq!(outcome.summary_rows().count(), 3);
    assert!(outcome.debt_free_date.is_none());
    assert!(outcome.payoff_schedule.is_empty());
}

/// Supplied cash flow is echoed onto every summary row.
#[test]
fn cash_flow_columns_ride_on_summary_rows() {
    let cash_flow = CashFlow {
        account_balance:   dec!(2000),
        recurring_bills:   dec!(800),
        budgeted_spending: dec!(400),
    };
    let outcome = run(
        vec![card("Visa", dec!(0.18), dec!(2500))],
        request(Strategy::Avalanche).with_budget(dec!(500)).with_cash_flow(cash_flow).with_months(4),
    );
    for s in outcome.summary_rows() {
        let cf = s.cash_flow.as_ref().expect("cash flow columns");
        assert_eq!(cf.account_balance, dec!(2000.00));
        assert_eq!(cf.available_for_debt, dec!(500.00));
    }

    let without = run(vec![card("Visa", dec!(0.18), dec!(2500))], request(Strategy::Avalanche).with_months(2));
    assert!(without.summary_rows().all(|s| s.cash_flow.is_none()));
}

/// One engine, two runs, identical outcomes.
#[test]
fn engine_runs_are_repeatable() {
    let snapshot = DebtSnapshot::new(vec![
        card("A", dec!(0.2299), dec!(3200)),
        card("B", dec!(26.99), dec!(850)),
    ]);
    let engine = ForecastEngine::new(request(Strategy::Snowball).with_budget(dec!(400)).validated().unwrap());
    assert_eq!(engine.run(&snapshot), engine.run(&snapshot));
}
