//! harbench - Main entry point

use clap::Parser;
use harbench::cli::{cmd_fetch, cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harbench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            cache_dir,
            output,
            seed,
            train_fraction,
            n_estimators,
            cv_folds,
            save_model,
        } => {
            cmd_run(
                &cache_dir,
                &output,
                seed,
                train_fraction,
                n_estimators,
                cv_folds,
                save_model.as_deref(),
            )?;
        }
        Commands::Fetch { cache_dir } => {
            cmd_fetch(&cache_dir)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
