//! CLI entry point - the composition root.
//!
//! Command dispatch routes to handlers, which receive the composed
//! [`CliContext`](rehearse_cli::CliContext).

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rehearse_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers, paths};

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads REHEARSE_* defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = paths::data_root(cli.data_dir.as_deref())?;
    let offline = matches!(&cli.command, Commands::Practice(args) if args.offline);
    let ctx = bootstrap(CliConfig {
        data_dir,
        sync_token: cli.sync_token,
        offline,
    })
    .await?;

    match cli.command {
        Commands::Practice(args) => handlers::practice::execute(&ctx, args).await?,
        Commands::Config { command } => handlers::config::execute(&ctx, command).await?,
        Commands::Progress { script, character } => {
            handlers::progress::execute(&ctx, &script, &character).await?;
        }
    }

    // Let any pending remote sync go out before exiting.
    ctx.progress.close().await;
    Ok(())
}
