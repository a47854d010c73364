use clap::Args;

use crate::cli::OutputFormat;
use crate::core::pairing::Pairing;
use crate::core::types::{DerangementPolicy, PoolTag};
use crate::matching::coordinator::{MatchCoordinator, MatchReport, PoolStatus};
use crate::matching::engine::MatchingConfig;
use crate::store::PairingStore;
use crate::utils::validation::validate_pool_tag;

#[derive(Args)]
pub struct MatchArgs {
    /// Shape of the drawn pairing
    #[arg(long, value_enum, default_value = "single-cycle")]
    pub policy: DerangementPolicy,

    /// Seed for a reproducible draw
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args)]
pub struct AssignArgs {
    /// Pool to assign
    #[arg(long, required = true)]
    pub pool: String,

    /// Pairs as GIVER:RECEIVER; must cover every accepted member of the pool
    #[arg(required = true, num_args = 1..)]
    pub pairs: Vec<String>,
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the round cannot be committed. Pools that could not be
/// matched are reported but are not errors.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run_match(
    args: MatchArgs,
    store: &dyn PairingStore,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = MatchingConfig {
        policy: args.policy,
        seed: args.seed,
    };

    if verbose {
        eprintln!(
            "Drawing with {} policy{}",
            config.policy,
            config
                .seed
                .map(|s| format!(" (seed {s})"))
                .unwrap_or_default()
        );
    }

    let report = MatchCoordinator::with_config(store, config).run_match()?;

    match format {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Tsv => print_tsv_report(&report),
    }

    Ok(())
}

/// Execute reset subcommand
///
/// # Errors
///
/// Returns an error if the store cannot be updated.
pub fn run_reset(store: &dyn PairingStore, format: OutputFormat) -> anyhow::Result<()> {
    let cleared = MatchCoordinator::new(store).reset()?;

    match format {
        OutputFormat::Text => println!("Cleared pairings of {cleared} participants."),
        OutputFormat::Json => println!("{}", serde_json::json!({ "cleared": cleared })),
        OutputFormat::Tsv => println!("cleared\n{cleared}"),
    }

    Ok(())
}

/// Execute assign subcommand
///
/// # Errors
///
/// Returns an error if a pair cannot be parsed, the pairs are not a
/// derangement of the pool, or the store rejects the write.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run_assign(
    args: AssignArgs,
    store: &dyn PairingStore,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let pool = PoolTag::new(args.pool);
    validate_pool_tag(&pool)?;

    let pairs = args
        .pairs
        .iter()
        .map(|s| {
            Pairing::parse(s)
                .ok_or_else(|| anyhow::anyhow!("Invalid pair '{s}': expected GIVER:RECEIVER"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    MatchCoordinator::new(store).assign_pool(&pool, &pairs)?;

    match format {
        OutputFormat::Text => {
            println!("Assigned {} pairs in pool {pool}:", pairs.len());
            for pair in &pairs {
                println!("  {pair}");
            }
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "pool": pool, "pairs": pairs }))?
        ),
        OutputFormat::Tsv => {
            println!("pool\tgiver\treceiver");
            for pair in &pairs {
                println!("{pool}\t{}\t{}", pair.giver, pair.receiver);
            }
        }
    }

    Ok(())
}

fn print_text_report(report: &MatchReport) {
    println!("Match Round");
    println!("{}", "=".repeat(60));
    println!("Policy: {}", report.policy);

    if report.pools.is_empty() {
        println!("\nNo eligible participants.");
        return;
    }

    for pool in &report.pools {
        println!("\nPool: {} ({} participants)", pool.pool, pool.participants);
        match pool.status {
            PoolStatus::Matched => {
                for pair in &pool.pairs {
                    println!("  {pair}");
                }
            }
            PoolStatus::InsufficientParticipants | PoolStatus::InvariantViolation => {
                println!(
                    "  Not matched: {}",
                    pool.message.as_deref().unwrap_or("unknown reason")
                );
            }
        }
    }
}

fn print_tsv_report(report: &MatchReport) {
    println!("pool\tstatus\tgiver\treceiver");
    for pool in &report.pools {
        let status = serde_json::to_value(pool.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        if pool.pairs.is_empty() {
            println!("{}\t{status}\t\t", pool.pool);
        }
        for pair in &pool.pairs {
            println!("{}\t{status}\t{}\t{}", pool.pool, pair.giver, pair.receiver);
        }
    }
}
