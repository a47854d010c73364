//! Command-line interface for secret-santa.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **participant**: Add, accept, revoke, remove or list participants
//! - **match**: Draw a new pairing for every pool and commit it
//! - **reset**: Clear every pairing
//! - **show**: Print current pairings, or one participant's giver and receiver
//! - **assign**: Commit a hand-picked pairing for one pool
//! - **serve**: Start the JSON API server
//!
//! ## Usage
//!
//! ```text
//! # Build a roster
//! secret-santa --store event.json participant add alice --pool elves --accepted
//! secret-santa --store event.json participant add bob --pool elves
//! secret-santa --store event.json participant accept bob
//!
//! # Draw and inspect
//! secret-santa --store event.json match
//! secret-santa --store event.json show alice --format json
//!
//! # Override one pool by hand
//! secret-santa --store event.json assign --pool elves alice:bob bob:alice
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod draw;
pub mod participant;
pub mod show;

#[derive(Parser)]
#[command(name = "secret-santa")]
#[command(version)]
#[command(about = "Run Secret Santa events: approve participants and draw gift pairings")]
#[command(
    long_about = "secret-santa keeps an event roster, draws giver/receiver pairings within each role pool, and commits them atomically.\n\nEvery accepted participant in a pool of two or more gives exactly one gift and receives exactly one gift, and nobody draws themselves."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the event store (JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "SECRET_SANTA_STORE",
        default_value = "secret-santa.json"
    )]
    pub store: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the participant roster
    Participant(participant::ParticipantArgs),

    /// Draw new pairings for every pool
    Match(draw::MatchArgs),

    /// Clear every pairing
    Reset,

    /// Show current pairings
    Show(show::ShowArgs),

    /// Assign a pool's pairing by hand
    Assign(draw::AssignArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Derangement policy for draws triggered through the API
    #[arg(long, value_enum, default_value = "single-cycle")]
    pub policy: crate::core::types::DerangementPolicy,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
