use clap::Args;

use crate::cli::OutputFormat;
use crate::core::types::ParticipantId;
use crate::matching::verify::{cycles, is_closed};
use crate::store::PairingStore;

#[derive(Args)]
pub struct ShowArgs {
    /// Show only this participant's giver and receiver
    pub id: Option<String>,
}

/// Execute show subcommand
///
/// # Errors
///
/// Returns an error if the store cannot be read or the participant is unknown.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ShowArgs, store: &dyn PairingStore, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(id) = args.id {
        let id = ParticipantId::new(id);
        let view = store.pairing_of(&id)?;
        match format {
            OutputFormat::Text => {
                println!("Participant: {id}");
                println!(
                    "  Receives from: {}",
                    view.giver.as_ref().map_or("-", ParticipantId::as_str)
                );
                println!(
                    "  Gives to:      {}",
                    view.receiver.as_ref().map_or("-", ParticipantId::as_str)
                );
            }
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "id": id,
                    "giver": view.giver,
                    "receiver": view.receiver,
                }))?
            ),
            OutputFormat::Tsv => {
                println!("id\tgiver\treceiver");
                println!(
                    "{id}\t{}\t{}",
                    view.giver.as_ref().map_or("", ParticipantId::as_str),
                    view.receiver.as_ref().map_or("", ParticipantId::as_str)
                );
            }
        }
        return Ok(());
    }

    let pairs = store.pairings()?;
    match format {
        OutputFormat::Text => {
            if pairs.is_empty() {
                println!("No pairings.");
                return Ok(());
            }
            for (i, chain) in cycles(&pairs).iter().enumerate() {
                let mut names: Vec<&str> = chain.iter().map(ParticipantId::as_str).collect();
                // A broken cycle is printed as the open chain that is stored
                let label = if is_closed(chain, &pairs) {
                    if let Some(first) = names.first().copied() {
                        names.push(first);
                    }
                    "Cycle"
                } else {
                    "Chain"
                };
                println!("{label} {}: {}", i + 1, names.join(" -> "));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pairs)?),
        OutputFormat::Tsv => {
            println!("giver\treceiver");
            for pair in &pairs {
                println!("{}\t{}", pair.giver, pair.receiver);
            }
        }
    }

    Ok(())
}
