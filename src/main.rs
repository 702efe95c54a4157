use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use pix_monitor::application::broadcaster::EventBroadcaster;
use pix_monitor::application::lifecycle::LifecycleExecutor;
use pix_monitor::application::service::PaymentService;
use pix_monitor::config::{GatewayConfig, LifecycleConfig};
use pix_monitor::domain::ports::{PacerRef, PaymentStoreRef};
use pix_monitor::infrastructure::clock::TokioPacer;
use pix_monitor::infrastructure::gateway::SimulatedPixGateway;
use pix_monitor::infrastructure::in_memory::{InMemoryNotifier, InMemoryPaymentStore};
use pix_monitor::interfaces::csv::payment_writer::PaymentWriter;
use pix_monitor::interfaces::csv::request_reader::PaymentRequestReader;
use pix_monitor::interfaces::sse::MonitorSession;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Create one payment per row of a CSV file (column `amount`), wait for
    /// every lifecycle and print the final payments as CSV
    Run {
        /// Input payment requests CSV file
        input: PathBuf,
    },
    /// Create a payment and stream its status changes to stdout
    Watch {
        #[arg(long)]
        amount: Decimal,
    },
}

#[derive(Args)]
struct Settings {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Pause before the first gateway call
    #[arg(long, global = true, default_value_t = 1000)]
    initial_delay_ms: u64,

    /// Pause before authorization
    #[arg(long, global = true, default_value_t = 2000)]
    authorize_delay_ms: u64,

    /// Pause before settlement
    #[arg(long, global = true, default_value_t = 3000)]
    settle_delay_ms: u64,

    /// Simulated latency of every gateway call (defaults to 100/200/300 ms)
    #[arg(long, global = true)]
    gateway_latency_ms: Option<u64>,

    /// Run lifecycles without any pause or simulated latency
    #[arg(long, global = true)]
    immediate: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Settings {
    fn lifecycle(&self) -> LifecycleConfig {
        if self.immediate {
            return LifecycleConfig::immediate();
        }
        LifecycleConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            authorize_delay: Duration::from_millis(self.authorize_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    fn gateway(&self) -> GatewayConfig {
        if self.immediate {
            return GatewayConfig::immediate();
        }
        match self.gateway_latency_ms {
            Some(ms) => GatewayConfig::with_uniform_latency(Duration::from_millis(ms)),
            None => GatewayConfig::default(),
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<&PathBuf>) -> Result<PaymentStoreRef> {
    use pix_monitor::infrastructure::rocksdb::RocksDbPaymentStore;

    match db_path {
        Some(path) => {
            info!(path = %path.display(), "Using RocksDB payment store");
            Ok(Arc::new(RocksDbPaymentStore::open(path).into_diagnostic()?))
        }
        None => Ok(Arc::new(InMemoryPaymentStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<&PathBuf>) -> Result<PaymentStoreRef> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Arc::new(InMemoryPaymentStore::new()))
}

fn build_service(settings: &Settings) -> Result<PaymentService> {
    let store = open_store(settings.db_path.as_ref())?;
    let pacer: PacerRef = Arc::new(TokioPacer);
    let gateway = SimulatedPixGateway::new(settings.gateway(), Arc::clone(&pacer));

    let executor = LifecycleExecutor::new(
        store,
        Arc::new(gateway),
        Arc::new(InMemoryNotifier::new()),
        Arc::new(EventBroadcaster::new()),
        settings.lifecycle(),
    )
    .with_pacer(pacer);

    Ok(PaymentService::new(executor))
}

async fn run(service: PaymentService, input: PathBuf) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = PaymentRequestReader::new(file);
    for request in reader.requests() {
        match request {
            Ok(request) => {
                if let Err(e) = service.create(request.amount).await {
                    error!(amount = %request.amount, "Error creating payment: {}", e);
                }
            }
            Err(e) => {
                error!("Error reading payment request: {}", e);
            }
        }
    }

    // Wait for every lifecycle, then output final state
    let payments = service.shutdown().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(payments).into_diagnostic()?;
    Ok(())
}

async fn watch(service: PaymentService, amount: Decimal) -> Result<()> {
    let payment = service.create(amount).await.into_diagnostic()?;
    let session = MonitorSession::open(&service, payment.id())
        .await
        .into_diagnostic()?;

    let mut stdout = tokio::io::stdout();
    let frames = session.pipe_to(&mut stdout).await.into_diagnostic()?;
    info!(payment_id = %payment.id(), frames, "Stream finished");

    service.wait_idle().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.settings.verbose);

    let service = build_service(&cli.settings)?;
    match cli.command {
        Command::Run { input } => run(service, input).await,
        Command::Watch { amount } => watch(service, amount).await,
    }
}
