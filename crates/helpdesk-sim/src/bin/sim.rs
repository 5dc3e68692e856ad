#![forbid(unsafe_code)]

use std::env;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use helpdesk_sim::{CampaignConfig, run_campaign};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "sim",
    about = "Race concurrent staff consoles against the ticket core and check invariants",
    after_help = "EXAMPLES:\n    # Default campaign, 50 seeds\n    sim\n\n    # Replay one seed with a heavier workload\n    sim --seed-start 17 --seeds 1 --rounds 200 --consoles 8"
)]
struct Cli {
    /// First seed to run.
    #[arg(long, default_value_t = 0)]
    seed_start: u64,

    /// Number of seeds to run.
    #[arg(long, default_value_t = 50)]
    seeds: u64,

    /// Staff consoles racing each round.
    #[arg(long, default_value_t = 4)]
    consoles: usize,

    /// Tickets opened before each run.
    #[arg(long, default_value_t = 6)]
    tickets: usize,

    /// Claim-race rounds per seed.
    #[arg(long, default_value_t = 24)]
    rounds: u64,

    /// Allow replies to resolved tickets.
    #[arg(long)]
    allow_post_resolution_reply: bool,

    /// Emit the report as JSON instead of a summary line.
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HELPDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "helpdesk=debug,info"
        } else {
            "helpdesk=info,warn"
        })
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let config = CampaignConfig {
        seed_range: cli.seed_start..cli.seed_start.saturating_add(cli.seeds),
        console_count: cli.consoles,
        ticket_count: cli.tickets,
        rounds: cli.rounds,
        allow_post_resolution_reply: cli.allow_post_resolution_reply,
        ..CampaignConfig::default()
    };

    let report = run_campaign(&config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "campaign complete: seeds={} passed={} claims_won={} claims_lost={} first_failure={:?}",
            report.seeds_run,
            report.seeds_passed,
            report.total_claims_won,
            report.total_claims_lost,
            report.first_failure
        );
        for failure in &report.failures {
            eprintln!("seed {} failed:", failure.seed);
            for violation in &failure.violations {
                eprintln!("  - {violation}");
            }
        }
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
