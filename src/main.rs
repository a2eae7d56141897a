//! Funnelboard CLI - move opportunities through a sales pipeline

use clap::Parser;
use funnelboard::cli::{Cli, Commands};
use funnelboard::errors::to_exit_code;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(to_exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> funnelboard::Result<()> {
    let cwd = cli.cwd.as_deref();
    match cli.command {
        Some(Commands::Init { force }) => {
            funnelboard::cli::commands::init::run(cwd, force, cli.dry_run).await
        }
        Some(Commands::Status { json }) => funnelboard::cli::commands::status::run(cwd, json).await,
        Some(Commands::Show { id, json }) => {
            funnelboard::cli::commands::show::run(cwd, &id, json).await
        }
        Some(Commands::Check { id, to }) => {
            funnelboard::cli::commands::check::run(cwd, &id, &to).await
        }
        Some(Commands::Move {
            id,
            to,
            index,
            field,
            task,
            win_reason,
            loss_reason,
        }) => {
            let args = funnelboard::cli::commands::move_cmd::MoveArgs {
                id,
                to,
                index,
                fields: field,
                tasks: task,
                win_reason,
                loss_reason,
            };
            funnelboard::cli::commands::move_cmd::run(cwd, args, cli.dry_run).await
        }
        Some(Commands::Doctor) => funnelboard::cli::commands::doctor::run(cwd).await,
        None => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}
