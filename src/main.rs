//! acf-porter CLI entry point.

use acfp::cli::commands;
use acfp::cli::{Cli, Commands};
use acfp::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let backup_dir = cli.backup_dir.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, backup_dir, *force, json),
        Commands::Version => commands::version::execute(json),

        // Host store
        Commands::Item { command } => commands::item::execute(command, db, actor, json),
        Commands::Field { command } => commands::field::execute(command, db, actor, json),

        // Transfer
        Commands::Export(args) => commands::export::execute(args, db, backup_dir, actor, json),
        Commands::Import(args) => commands::import::execute(args, db, backup_dir, actor, json),
        Commands::Preview(args) => commands::preview::execute(args, db, backup_dir, actor, json),
        Commands::Backup { command } => {
            commands::backup::execute(command, db, backup_dir, actor, json)
        }

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
