use clap::{Args, Subcommand};

use crate::cli::OutputFormat;
use crate::core::participant::Participant;
use crate::core::types::{ParticipantId, PoolTag};
use crate::store::PairingStore;
use crate::utils::validation::validate_new_participant;

#[derive(Args)]
pub struct ParticipantArgs {
    #[command(subcommand)]
    pub command: ParticipantCommands,
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to the roster
    Add {
        /// Unique participant ID
        #[arg(required = true)]
        id: String,

        /// Role pool (participants are only matched within their pool)
        #[arg(long, required = true)]
        pool: String,

        /// Admit the participant immediately
        #[arg(long)]
        accepted: bool,
    },

    /// Admit a pending participant
    Accept {
        #[arg(required = true)]
        id: String,
    },

    /// Return a participant to pending; clears their pairing
    Revoke {
        #[arg(required = true)]
        id: String,
    },

    /// Remove a participant; clears every reference to them
    Remove {
        #[arg(required = true)]
        id: String,
    },

    /// List participants
    List {
        /// Only show this pool
        #[arg(long)]
        pool: Option<String>,

        /// Only show participants awaiting acceptance
        #[arg(long)]
        pending: bool,
    },
}

/// Execute participant subcommand
///
/// # Errors
///
/// Returns an error if validation fails or the store rejects the change.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: ParticipantArgs,
    store: &dyn PairingStore,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    match args.command {
        ParticipantCommands::Add { id, pool, accepted } => {
            let mut participant = Participant::new(id, pool);
            participant.accepted = accepted;
            validate_new_participant(&participant)?;

            let added = store.add_participant(participant)?;
            print_participants(&[added], format);
        }
        ParticipantCommands::Accept { id } => {
            let updated = store.set_accepted(&ParticipantId::new(id), true)?;
            print_participants(&[updated], format);
        }
        ParticipantCommands::Revoke { id } => {
            let updated = store.set_accepted(&ParticipantId::new(id), false)?;
            print_participants(&[updated], format);
        }
        ParticipantCommands::Remove { id } => {
            let removed = store.remove_participant(&ParticipantId::new(id))?;
            if verbose {
                eprintln!("Removed {} from pool {}", removed.id, removed.pool);
            }
            print_participants(&[removed], format);
        }
        ParticipantCommands::List { pool, pending } => {
            let pool = pool.map(PoolTag::new);
            let participants: Vec<Participant> = store
                .participants()?
                .into_iter()
                .filter(|p| pool.as_ref().map_or(true, |tag| &p.pool == tag))
                .filter(|p| !pending || !p.accepted)
                .collect();

            if verbose {
                eprintln!("{} participants listed", participants.len());
            }
            print_participants(&participants, format);
        }
    }

    Ok(())
}

fn print_participants(participants: &[Participant], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if participants.is_empty() {
                println!("No participants.");
                return;
            }
            println!("{:<24} {:<16} {:<10} {:<24} {:<24}", "ID", "Pool", "Status", "Giver", "Receiver");
            println!("{}", "-".repeat(100));
            for p in participants {
                println!(
                    "{:<24} {:<16} {:<10} {:<24} {:<24}",
                    p.id,
                    p.pool,
                    status_label(p),
                    p.giver.as_ref().map_or("-", ParticipantId::as_str),
                    p.receiver.as_ref().map_or("-", ParticipantId::as_str),
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(participants).unwrap_or_default();
            println!("{json}");
        }
        OutputFormat::Tsv => {
            println!("id\tpool\taccepted\tgiver\treceiver");
            for p in participants {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    p.id,
                    p.pool,
                    p.accepted,
                    p.giver.as_ref().map_or("", ParticipantId::as_str),
                    p.receiver.as_ref().map_or("", ParticipantId::as_str),
                );
            }
        }
    }
}

fn status_label(participant: &Participant) -> &'static str {
    if participant.accepted {
        "accepted"
    } else {
        "pending"
    }
}
