use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use sitemetrics_refresh::RefreshRunner;
use sitemetrics_refresh::builtin_tasks;
use sitemetrics_refresh::load_env_file;
use sitemetrics_store::store_from_env;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sitemetrics-refresh")]
#[command(about = "Refresh cached site metrics artifacts when they go stale")]
struct Args {
    /// Env file to load before anything else; existing variables win.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Freshness window in hours.
    #[arg(long, default_value_t = 24)]
    max_age_hours: u64,

    /// Directory holding the cached metrics artifacts.
    #[arg(long, env = "SITEMETRICS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Evaluate staleness and prerequisites without spawning anything.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Inspect or clear the shared refresh lock.
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
}

#[derive(Debug, Subcommand)]
enum LockAction {
    /// Print the current lock payload, if any.
    Show,
    /// Delete the lock record.
    Clear,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Env-file loading mutates the environment, which is not thread-safe,
    // so it happens before the Tokio runtime exists.
    if let Some(env_file) = args.env_file.as_deref() {
        load_env_file(env_file);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Some(Cmd::Lock { action }) => run_lock(action).await,
        None => {
            let runner = RefreshRunner::new(builtin_tasks(&args.data_dir))
                .with_max_age(Duration::from_secs(args.max_age_hours * 60 * 60))
                .dry_run(args.dry_run);
            // Individual task failures are already reported; the batch
            // completing at all is success for the build pipeline.
            runner.run().await;
            Ok(())
        }
    }
}

async fn run_lock(action: LockAction) -> anyhow::Result<()> {
    let store = store_from_env().await?;
    match action {
        LockAction::Show => match store.get_lock().await? {
            Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            None => println!("no lock held"),
        },
        LockAction::Clear => {
            store.clear_lock().await?;
            println!("lock cleared");
        }
    }
    Ok(())
}
