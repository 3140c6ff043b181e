//! sim-runner: headless runner for the ISP market simulation.
//!
//! Usage:
//!   sim-runner --seed 12345 --months 120 --profile realistic --db run.db
//!   sim-runner --runs 8 --seed 100 --profile idealistic --json
//!   sim-runner --params params.json --data-dir ./data

use anyhow::Result;
use isp_market_core::{
    config::{MarketProfile, SimParams},
    engine::SimEngine,
    market::MarketCatalogue,
    metrics::MarketReport,
    monte_carlo,
    store::SimStore,
    types::Quadrant,
};
use std::env;

#[derive(serde::Serialize)]
struct FirmSummary {
    name:    String,
    solvent: bool,
    profit:  f64,
    savings: f64,
}

#[derive(serde::Serialize)]
struct RunSummary {
    seed:    u64,
    reports: Vec<MarketReport>,
    firms:   Vec<FirmSummary>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json = args.iter().any(|a| a == "--json");
    let db = string_arg(&args, "--db");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let profile: MarketProfile = string_arg(&args, "--profile").unwrap_or("realistic").parse()?;

    let mut params = match string_arg(&args, "--params") {
        Some(path) => SimParams::load(path)?,
        None => SimParams::default(),
    };
    params.seed = parse_arg(&args, "--seed", params.seed);
    params.months = parse_arg(&args, "--months", params.months);
    params.validate()?;
    let runs = parse_arg(&args, "--runs", 1u64).max(1);

    if !json {
        println!("ISP market sim-runner");
        println!("  seed:      {}", params.seed);
        println!("  months:    {}", params.months);
        println!("  profile:   {profile}");
        println!("  runs:      {runs}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let catalogue = MarketCatalogue::load(data_dir, profile, params.initial_money_pool)?;

    let summaries = if runs == 1 {
        vec![run_single(&params, catalogue, profile, db)?]
    } else {
        let seeds: Vec<u64> = (0..runs).map(|i| params.seed + i).collect();
        monte_carlo::run_many(&params, &catalogue, &seeds)
            .into_iter()
            .map(|output| RunSummary {
                seed:    output.seed,
                reports: output.reports,
                firms:   output.final_firms.iter().map(firm_summary).collect(),
            })
            .collect()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary);
        }
        if runs > 1 {
            println!("{} of {runs} runs completed", summaries.len());
        }
    }
    Ok(())
}

fn run_single(
    params: &SimParams,
    catalogue: MarketCatalogue,
    profile: MarketProfile,
    db: Option<&str>,
) -> Result<RunSummary> {
    let run_id = format!("run-{}-{}", params.seed, unix_time());
    let mut engine = SimEngine::build(run_id.clone(), params.clone(), catalogue)?;

    if let Some(path) = db {
        let store = SimStore::open(path)?;
        store.migrate()?;
        store.insert_run(
            &run_id,
            params.seed,
            env!("CARGO_PKG_VERSION"),
            profile.as_str(),
            &serde_json::to_string(params)?,
        )?;
        engine.attach_store(store);
        log::info!("persisting run {run_id} to {path}");
    }

    engine.run()?;
    let (ctx, reports) = engine.into_parts();
    Ok(RunSummary {
        seed: params.seed,
        reports,
        firms: ctx.market.firms.iter().map(firm_summary).collect(),
    })
}

fn firm_summary(firm: &isp_market_core::market::Firm) -> FirmSummary {
    FirmSummary {
        name:    firm.name.clone(),
        solvent: firm.is_solvent(),
        profit:  firm.profit,
        savings: firm.savings,
    }
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY (seed {}) ===", summary.seed);
    if let Some(last) = summary.reports.last() {
        let fmt = |v: Option<f64>| v.map_or("n/a".to_string(), |x| format!("{x:.1}"));
        println!("  final month:     {}", last.month);
        println!("  HHI mobile:      {}", fmt(last.hhi_mobile));
        println!("  HHI fixed:       {}", fmt(last.hhi_fixed));
        println!("  $/GB (mobile):   {}", last.mean_price_per_gb.map_or("n/a".to_string(), |x| format!("{x:.2}")));
        println!("  complete:        {}", last.complete);
        println!("  mobile only:     {}", last.mobile_only);
        println!("  fixed only:      {}", last.fixed_only);
        println!("  disconnected:    {}", last.disconnected);
        println!();
        println!("  {:<15} {:>6} {:>6} {:>6} {:>6} {:>8} {:>6} {:>10}", "share of income", "<2%", "<5%", "<10%", ">=10%", "partial", "none", "min good");
        for q in Quadrant::ALL {
            let b = &last.by_quadrant[q.index()];
            println!(
                "  {:<15} {:>6} {:>6} {:>6} {:>6} {:>8} {:>6} {:>10}",
                format!("{q:?}"),
                b.under_2,
                b.under_5,
                b.under_10,
                b.at_least_10,
                b.partial,
                b.disconnected,
                last.min_good_bundle_price[q.index()].map_or("n/a".to_string(), |p| format!("${p:.2}")),
            );
        }
        for (i, b) in last.by_income_quartile.iter().enumerate() {
            println!(
                "  {:<15} {:>6} {:>6} {:>6} {:>6} {:>8} {:>6}",
                format!("quartile {}", i + 1),
                b.under_2,
                b.under_5,
                b.under_10,
                b.at_least_10,
                b.partial,
                b.disconnected,
            );
        }
    }
    println!();
    println!("=== FIRMS ===");
    for firm in &summary.firms {
        println!(
            "  {:<12} {:<9} profit ${:>12.2}  savings ${:>14.2}",
            firm.name,
            if firm.solvent { "solvent" } else { "bankrupt" },
            firm.profit,
            firm.savings
        );
    }
    println!();
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
