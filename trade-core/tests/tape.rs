//! Event tape analysis over a recorded run of the example world.

#![cfg(feature = "instrument")]

use std::sync::Arc;
use std::time::Duration;

use polars::prelude::*;
use trade_core::instrument::{Recording, Tape};
use trade_core::{Economy, ManualClock, Registry, SimConfig, TickReport, setup_example_world, targets};

const TICKS: usize = 200;

fn col_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn col_u64(df: &DataFrame, name: &str) -> Vec<u64> {
    df.column(name)
        .unwrap()
        .u64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn recorded_run(seed: u64) -> (Tape, Vec<TickReport>) {
    let registry = Arc::new(Registry::new());
    let clock = Arc::new(ManualClock::new(0));
    let config = SimConfig::default()
        .with_seed(seed)
        .with_default_trade_lifetime(Duration::from_secs(3));
    setup_example_world(&registry, &config);
    let economy = Economy::new(registry, clock.clone(), &config);

    let recording = Recording::start(targets::ALL);
    let reports = (0..TICKS)
        .map(|_| {
            let report = economy.run_tick().unwrap();
            clock.advance(Duration::from_millis(100));
            report
        })
        .collect();
    (recording.finish(), reports)
}

#[test]
fn test_tape_rows_match_tick_reports() {
    let (tape, reports) = recorded_run(4);

    // Two production units fire every tick.
    assert_eq!(tape.rows(targets::PRODUCTION), 2 * TICKS);

    let offers: usize = reports.iter().map(|r| r.offers_posted.len()).sum();
    let fills: usize = reports.iter().map(|r| r.fills.len()).sum();
    let timeouts: usize = reports.iter().map(|r| r.timed_out.len()).sum();
    assert_eq!(tape.rows(targets::OFFER), offers);
    assert_eq!(tape.rows(targets::FILL), fills);
    assert_eq!(tape.rows(targets::TIMEOUT), timeouts);
    assert!(fills > 0);
}

#[test]
fn test_every_fill_clears_inside_the_price_band() {
    let (tape, _) = recorded_run(8);
    let fills = tape.table(targets::FILL).unwrap().to_dataframe().unwrap();

    let outside = fills
        .clone()
        .lazy()
        .filter(col("price").lt(col("ask")).or(col("price").gt(col("bid"))))
        .collect()
        .unwrap();
    assert_eq!(outside.height(), 0, "fills outside [ask, bid]:\n{outside}");

    let prices = col_f64(&fills, "price");
    let quantities = col_u64(&fills, "quantity");
    let payments = col_u64(&fills, "payment");
    for ((price, quantity), payment) in prices.iter().zip(&quantities).zip(&payments) {
        assert_eq!(*price, *payment as f64 / *quantity as f64);
    }
}

#[test]
fn test_traded_volume_per_tick_matches_reports() {
    let (tape, reports) = recorded_run(15);
    let fills = tape.table(targets::FILL).unwrap().to_dataframe().unwrap();

    let by_tick = fills
        .lazy()
        .group_by([col("tick")])
        .agg([col("quantity").sum().alias("volume")])
        .sort(["tick"], Default::default())
        .collect()
        .unwrap();

    let ticks = col_u64(&by_tick, "tick");
    let volumes = col_u64(&by_tick, "volume");
    for (tick, volume) in ticks.iter().zip(&volumes) {
        let report = &reports[*tick as usize];
        let expected: u64 = report.fills.iter().map(|f| f.sell_amount).sum();
        assert_eq!(*volume, expected, "volume mismatch at tick {tick}");
    }
}

#[test]
fn test_tape_persists_as_parquet() {
    let (tape, _) = recorded_run(2);
    let dir = tempfile::tempdir().unwrap();

    let written = trade_core::instrument::save_parquet(&tape, dir.path()).unwrap();
    assert_eq!(written.len(), tape.targets().count());
    for target in targets::ALL {
        if tape.rows(target) > 0 {
            assert!(dir.path().join(format!("{target}.parquet")).exists());
        }
    }
}
