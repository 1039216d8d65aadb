//! Shared harness for engine scenario tests: a `TradingCore` wired to
//! the paper executor, static prices and the in-memory store, with the
//! event channel held by the test for deterministic pumping.
#![allow(dead_code)]

use chrono::Utc;
use configuration::settings::{Config, ExecutionSettings, ReconciliationSettings, TradingSettings};
use core_types::{AccountId, Fill, FillId, OrderId, OrderRequest, OrderSide, OrderType};
use engine::TradingCore;
use execution::{ExecutionEvent, PaperBehavior, PaperExecutor};
use identity::Identity;
use marketdata::StaticPriceSource;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use storage::MemoryStore;
use tokio::sync::mpsc;

pub struct Harness {
    pub core: Arc<TradingCore>,
    pub executor: Arc<PaperExecutor>,
    pub events_rx: mpsc::Receiver<ExecutionEvent>,
    pub prices: Arc<StaticPriceSource>,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Config {
    Config {
        trading: TradingSettings {
            margin_multiplier: dec!(1),
            market_order_buffer_pct: dec!(0.05),
            symbols: vec![
                "AAPL".to_string(),
                "MSFT".to_string(),
                "TSLA".to_string(),
            ],
        },
        execution: ExecutionSettings {
            submit_timeout_ms: 200,
        },
        reconciliation: ReconciliationSettings {
            sweep_interval_secs: 1,
            stale_order_age_secs: 300,
        },
    }
}

impl Harness {
    pub async fn new(behavior: PaperBehavior) -> Self {
        Self::with_config(behavior, test_config()).await
    }

    pub async fn with_config(behavior: PaperBehavior, config: Config) -> Self {
        let (executor, events_rx) = PaperExecutor::new(behavior);
        let executor = Arc::new(executor);
        let prices = Arc::new(StaticPriceSource::new());
        prices.set_price("AAPL", dec!(150)).await;
        prices.set_price("MSFT", dec!(300)).await;
        prices.set_price("TSLA", dec!(200)).await;
        let store = Arc::new(MemoryStore::new());

        let core = Arc::new(TradingCore::new(
            config,
            Arc::clone(&executor) as Arc<dyn execution::ExecutionClient>,
            Arc::clone(&prices) as Arc<dyn marketdata::PriceSource>,
            Arc::clone(&store) as Arc<dyn storage::Storage>,
        ));

        Self {
            core,
            executor,
            events_rx,
            prices,
            store,
        }
    }

    /// Opens an account, funds it, and returns an identity covering it.
    pub async fn funded_account(&self, cash: Decimal) -> (AccountId, Identity) {
        let account_id = self.core.open_account("test trader").await.unwrap();
        let identity = identity_for(account_id);
        self.core
            .deposit(&identity, account_id, cash)
            .await
            .unwrap();
        (account_id, identity)
    }

    /// Receives the next event emitted by the paper executor and applies
    /// it, making fill delivery deterministic for assertions.
    pub async fn pump_one(&mut self) {
        let event = self.events_rx.recv().await.expect("event expected");
        self.core.apply_event(&event).await.unwrap();
    }

    /// Applies a synthetic fill directly, as if the venue delivered it.
    pub async fn inject_fill(
        &self,
        order_id: OrderId,
        quantity: Decimal,
        price: Decimal,
    ) -> Fill {
        let fill = Fill {
            fill_id: FillId::new(),
            order_id,
            filled_quantity: quantity,
            fill_price: price,
            timestamp: Utc::now(),
        };
        self.core
            .apply_event(&ExecutionEvent::Fill(fill.clone()))
            .await
            .unwrap();
        fill
    }
}

/// An identity authorized for exactly the given account.
pub fn identity_for(account_id: AccountId) -> Identity {
    let mut account_ids = HashSet::new();
    account_ids.insert(account_id);
    Identity {
        user: "test trader".to_string(),
        account_ids,
    }
}

pub fn limit_buy(account_id: AccountId, quantity: Decimal, limit_price: Decimal) -> OrderRequest {
    OrderRequest {
        account_id,
        symbol: "AAPL".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        quantity,
        limit_price: Some(limit_price),
    }
}

pub fn limit_sell(account_id: AccountId, quantity: Decimal, limit_price: Decimal) -> OrderRequest {
    OrderRequest {
        account_id,
        symbol: "AAPL".to_string(),
        side: OrderSide::Sell,
        order_type: OrderType::Limit,
        quantity,
        limit_price: Some(limit_price),
    }
}

pub fn market_buy(account_id: AccountId, quantity: Decimal) -> OrderRequest {
    OrderRequest {
        account_id,
        symbol: "AAPL".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Market,
        quantity,
        limit_price: None,
    }
}
