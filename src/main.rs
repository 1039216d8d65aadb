use chrono::Duration;
use clap::{Parser, Subcommand};
use configuration::load_config;
use core_types::{OrderRequest, OrderSide, OrderType};
use engine::{ReconciliationSweep, TradingCore};
use execution::{ExecutionClient, PaperBehavior, PaperExecutor};
use identity::{Authenticator, TokenAuthenticator};
use marketdata::{PriceSource, StaticPriceSource};
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use storage::{MemoryStore, Storage};
use tracing_subscriber::EnvFilter;

/// The main entry point for the Meridian trading core.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variable overrides from a .env file, if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Demo => handle_demo().await,
        Commands::CheckConfig => handle_check_config(),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Order management and account state for an automated trading platform.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an end-to-end order lifecycle against the paper executor.
    Demo,
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

// ==============================================================================
// Demo Command Logic
// ==============================================================================

/// Wires the core to its in-process collaborators and walks one account
/// through deposit, a limit buy, a fill and the resulting summary.
async fn handle_demo() -> anyhow::Result<()> {
    let config = load_config()?;

    let (executor, events_rx) = PaperExecutor::new(PaperBehavior::FillImmediately {
        market_price: dec!(150),
    });
    let executor = Arc::new(executor);
    let prices = Arc::new(StaticPriceSource::new());
    prices.set_price("AAPL", dec!(150)).await;
    prices.set_price("MSFT", dec!(300)).await;
    let store = Arc::new(MemoryStore::new());

    let reconciliation = config.reconciliation.clone();
    let core = Arc::new(TradingCore::new(
        config,
        Arc::clone(&executor) as Arc<dyn ExecutionClient>,
        Arc::clone(&prices) as Arc<dyn PriceSource>,
        store as Arc<dyn Storage>,
    ));
    core.load_from_storage().await?;

    // The event pump and the reconciliation sweep run for the lifetime
    // of the process.
    tokio::spawn(Arc::clone(&core).run_events(events_rx));
    tokio::spawn(ReconciliationSweep::new(Arc::clone(&core), reconciliation).start());

    // Open an account and issue a bearer token for its owner.
    let account_id = core.open_account("demo trader").await?;
    let auth = TokenAuthenticator::new();
    let mut account_ids = HashSet::new();
    account_ids.insert(account_id);
    let token = auth.issue("demo trader", account_ids, Duration::hours(1)).await;
    let identity = auth.authenticate(&token).await?;

    let view = core.deposit(&identity, account_id, dec!(20000)).await?;
    println!(
        "Account {} funded: cash {}, buying power {}",
        view.id, view.cash_balance, view.buying_power
    );

    let order = core
        .submit_order(
            &identity,
            OrderRequest {
                account_id,
                symbol: "AAPL".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                quantity: dec!(100),
                limit_price: Some(dec!(150)),
            },
        )
        .await?;
    println!("Order {} submitted: {}", order.id, order.status);

    // Give the event pump a moment to apply the paper fill.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let filled = core.get_order(&identity, account_id, order.id).await?;
    println!("Order {} is now: {}", filled.id, filled.status);

    for position in core.get_positions(&identity, account_id).await? {
        println!(
            "Position: {} x {} @ avg {}",
            position.symbol, position.quantity, position.average_price
        );
    }

    let summary = core.get_portfolio_summary(&identity, account_id).await?;
    println!(
        "Portfolio: cash {}, positions {}, total {}, total P&L {}",
        summary.cash_balance, summary.positions_value, summary.total_value, summary.total_pnl
    );

    Ok(())
}

// ==============================================================================
// Check-Config Command Logic
// ==============================================================================

fn handle_check_config() -> anyhow::Result<()> {
    let config = load_config()?;
    println!(
        "Configuration OK: {} symbols, margin multiplier {}, submit timeout {}ms",
        config.trading.symbols.len(),
        config.trading.margin_multiplier,
        config.execution.submit_timeout_ms
    );
    Ok(())
}
