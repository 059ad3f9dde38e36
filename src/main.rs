use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use shift_register::config::Config;
use shift_register::report::Reporter;
use shift_register::{credentials, logging};

#[derive(Parser, Debug)]
#[command(name = "shift-register", version)]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive register with background sync (default).
    Run,
    /// Run one sync pass and one cleanup pass, then exit.
    Sync,
    /// Sales reports read from the remote store.
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// Store the remote API key in the OS credential store.
    SetApiKey { key: String },
    /// Remove the stored remote API key.
    ForgetApiKey,
}

#[derive(Subcommand, Debug)]
enum ReportKind {
    /// Today's total, or an aggregate between two dd-mm-YYYY dates.
    Daily {
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Aggregate over the current month.
    Monthly,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("invalid configuration")?;

    logging::init(&config.log_dir);
    info!(version = %shift_register::version(), "Starting Shift Register");

    match args.cmd.unwrap_or(Command::Run) {
        Command::Run => shift_register::run(config).await,
        Command::Sync => shift_register::sync_once(config).await,
        Command::Report { kind } => report(config, kind).await,
        Command::SetApiKey { key } => {
            credentials::save_remote_api_key(&key).context("failed to store API key")?;
            println!("API key stored");
            Ok(())
        }
        Command::ForgetApiKey => {
            credentials::forget_remote_api_key().context("failed to remove API key")?;
            println!("API key removed");
            Ok(())
        }
    }
}

async fn report(config: Config, kind: ReportKind) -> anyhow::Result<()> {
    config.require_remote_url()?;
    let remote = shift_register::remote_store(&config)?
        .context("remote store unavailable")?;
    let clock = shift_register::system_clock(&config);
    let reporter = Reporter::new(remote.as_ref(), clock.as_ref());

    let report = match kind {
        ReportKind::Daily { from, to } => {
            let range = from.as_deref().zip(to.as_deref());
            reporter.daily_report(range).await?
        }
        ReportKind::Monthly => reporter.monthly_report().await?,
    };
    println!("{}", report.render());
    Ok(())
}
