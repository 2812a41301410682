use clap::{Parser, Subcommand};
use connectpay::application::engine::EscrowEngine;
use connectpay::application::locks::EntityLocks;
use connectpay::application::users::Users;
use connectpay::config::{ExportArgs, LogFormat, ServeArgs, StorageArgs};
use connectpay::domain::ports::{PaymentProvider, StoreHandle, UserStore};
use connectpay::domain::user::{User, Visibility};
use connectpay::infrastructure::chapa::ChapaClient;
use connectpay::infrastructure::open_store;
use connectpay::interfaces::csv::ledger_writer::LedgerWriter;
use connectpay::interfaces::csv::user_reader::UserReader;
use connectpay::interfaces::http::{AppState, router};
use connectpay::logging;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Write every user's connects balance to stdout as CSV.
    ExportLedger(ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::ExportLedger(args) => export_ledger(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let store = prepare_store(&args.storage).await?;
    let config = args.pricing.engine_config().into_diagnostic()?;
    let provider: Arc<dyn PaymentProvider> = Arc::new(
        ChapaClient::new(args.gateway.chapa_config())
            .into_diagnostic()
            .wrap_err("failed to configure payment gateway")?,
    );
    if args.gateway.callback_url.is_none() {
        warn!("no callback URL configured; the provider will use its dashboard default");
    }

    let engine = EscrowEngine::new(store, provider, config);
    let app = router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %args.bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    info!("shut down");
    Ok(())
}

async fn export_ledger(args: ExportArgs) -> Result<()> {
    let store = prepare_store(&args.storage).await?;
    let users = Users::new(store, EntityLocks::new())
        .all(Visibility::IncludeInactive)
        .await
        .into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    writer.write_users(users).into_diagnostic()?;
    Ok(())
}

/// Opens the store and loads the seed file, skipping rows that fail to parse
/// and users that already exist.
async fn prepare_store(args: &StorageArgs) -> Result<StoreHandle> {
    let store = open_store(args.db_path.as_deref()).into_diagnostic()?;
    let Some(path) = &args.seed_users else {
        return Ok(store);
    };

    let file = File::open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to open seed file {}", path.display()))?;
    let mut fresh: Vec<User> = Vec::new();
    for result in UserReader::new(file).users() {
        match result {
            Ok(user) => {
                if store
                    .user(user.id, Visibility::IncludeInactive)
                    .await
                    .into_diagnostic()?
                    .is_some()
                {
                    warn!(user_id = %user.id, "seed user already exists, skipping");
                    continue;
                }
                fresh.push(user);
            }
            Err(e) => warn!(error = %e, "skipping invalid seed row"),
        }
    }

    if !fresh.is_empty() {
        Users::new(store.clone(), EntityLocks::new())
            .import(fresh)
            .await
            .into_diagnostic()?;
    }
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
