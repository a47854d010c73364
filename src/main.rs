use clap::Parser;
use tracing_subscriber::EnvFilter;

use secret_santa::cli;
use secret_santa::store::file::FileStore;
use secret_santa::web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("secret_santa=debug,info")
    } else {
        EnvFilter::new("secret_santa=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let store = FileStore::open(&cli.store);

    match cli.command {
        cli::Commands::Participant(args) => {
            cli::participant::run(args, &store, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::draw::run_match(args, &store, cli.format, cli.verbose)?;
        }
        cli::Commands::Reset => {
            cli::draw::run_reset(&store, cli.format)?;
        }
        cli::Commands::Show(args) => {
            cli::show::run(args, &store, cli.format)?;
        }
        cli::Commands::Assign(args) => {
            cli::draw::run_assign(args, &store, cli.format)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args, cli.store)?;
        }
    }

    Ok(())
}
