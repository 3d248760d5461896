use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use slotcycle::batch::{BatchCoordinator, BatchRequest, LogSink};
use slotcycle::clock::{Delay, TokioDelay};
use slotcycle::combo::ComboRunner;
use slotcycle::config::Config;
use slotcycle::panel::{
    PrimaryPanel, SecondaryPanel, SlotDirectory, SlotMutator, SlotScanner,
};

#[derive(Parser)]
#[command(name = "slotcycle", about = "Dual-panel slot recycling engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one recycling batch and print the JSON summary.
    Run {
        /// Manager account numbers, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        accounts: Vec<String>,

        /// Disposable number cycled through every eligible slot.
        #[arg(long)]
        disposable: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slotcycle=info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            accounts,
            disposable,
        } => {
            let config = Config::resolve().context("failed to resolve configuration")?;

            let delay: Arc<dyn Delay> = Arc::new(TokioDelay);
            let primary = Arc::new(PrimaryPanel::new(config.primary.clone()));
            let secondary = Arc::new(SecondaryPanel::new(
                config.secondary.clone(),
                Arc::clone(&delay),
            ));

            let primary_directory: Arc<dyn SlotDirectory> = primary.clone();
            let secondary_directory: Arc<dyn SlotDirectory> = secondary.clone();
            let primary_mutator: Arc<dyn SlotMutator> = primary;
            let secondary_mutator: Arc<dyn SlotMutator> = secondary;

            let scanner = Arc::new(SlotScanner::new(primary_directory, secondary_directory));
            let combo = ComboRunner::new(
                Arc::clone(&scanner),
                primary_mutator,
                secondary_mutator,
                Arc::clone(&delay),
                config.engine.post_add_delay,
                config.engine.required_add_credits,
            );
            let coordinator =
                BatchCoordinator::new(scanner, combo, Arc::clone(&delay), config.engine.clone());

            let request = BatchRequest {
                accounts,
                disposable_msisdn: disposable,
            };
            let summary = coordinator
                .run(&request, &LogSink)
                .await
                .context("batch run aborted")?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
