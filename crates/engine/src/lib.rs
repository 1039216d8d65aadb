//! # Meridian Engine
//!
//! The orchestrator tying the core together: identity checks, order
//! admission against the ledger, dispatch to the execution collaborator,
//! the asynchronous event pump and the reconciliation sweep.
//!
//! ## Concurrency model
//!
//! The account is the unit of serialization. Each `AccountId` maps to its
//! own `Arc<Mutex<AccountState>>`; ledger and order-book mutations for an
//! account happen only while that mutex is held, so `reserve`, `settle`,
//! `on_fill` and `cancel` can never interleave unsafely within one
//! account. Calls to external collaborators (execution, identity, market
//! data) never happen while an account lock is held. A cancel racing an
//! in-flight fill resolves by whichever acquires the lock first; the
//! loser becomes an idempotent no-op.
//!
//! Order submission dispatches to the execution collaborator only *after*
//! the local `accepted` transition has committed to storage, so a crash
//! between commit and dispatch is recovered by replaying accepted-but-
//! undispatched orders on restart.

pub mod reconciler;
mod state;

pub use reconciler::{ReconciliationSweep, SweepReport};
pub use state::AccountView;

use crate::state::AccountState;
use chrono::Utc;
use configuration::settings::Config;
use core_types::{
    Account, AccountId, CoreError, Order, OrderId, OrderRequest, OrderSide, OrderStatus, OrderType,
};
use execution::{ExecutionClient, ExecutionEvent};
use futures::future::join_all;
use identity::Identity;
use ledger::AccountLedger;
use marketdata::PriceSource;
use orderbook::{FillOutcome, OrderBook};
use portfolio::{EquityBaseline, PortfolioSummary};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use storage::Storage;
use tokio::sync::{Mutex, RwLock, mpsc};

/// The central orchestrator for the trading core.
///
/// All collaborators are injected at construction; there is no ambient
/// global state.
pub struct TradingCore {
    /// One serialization domain per account.
    accounts: RwLock<HashMap<AccountId, Arc<Mutex<AccountState>>>>,
    /// Routes an incoming fill/reject event to its owning account.
    order_index: RwLock<HashMap<OrderId, AccountId>>,
    execution: Arc<dyn ExecutionClient>,
    prices: Arc<dyn PriceSource>,
    storage: Arc<dyn Storage>,
    config: Config,
}

impl TradingCore {
    /// Creates a new `TradingCore` with all its required collaborators.
    pub fn new(
        config: Config,
        execution: Arc<dyn ExecutionClient>,
        prices: Arc<dyn PriceSource>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            order_index: RwLock::new(HashMap::new()),
            execution,
            prices,
            storage,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Rebuilds in-memory state from storage and re-dispatches orders
    /// that were accepted but never handed to the execution collaborator.
    /// Returns the number of accounts restored.
    pub async fn load_from_storage(&self) -> Result<usize, CoreError> {
        let records = self.storage.load_all().await.map_err(CoreError::from)?;
        let count = records.len();

        let mut undispatched = Vec::new();
        {
            let mut accounts = self.accounts.write().await;
            let mut order_index = self.order_index.write().await;
            for record in records {
                let state = AccountState::from_record(record);
                let account_id = state.account.id;
                for order in state.book.list(None) {
                    order_index.insert(order.id, account_id);
                }
                undispatched.extend(state.book.undispatched());
                accounts.insert(account_id, Arc::new(Mutex::new(state)));
            }
        }

        for order in undispatched {
            tracing::info!(
                account_id = %order.account_id,
                order_id = %order.id,
                correlation_id = %order.correlation_id,
                "re-dispatching order accepted before restart"
            );
            if let Err(err) = self.dispatch(&order).await {
                tracing::warn!(order_id = %order.id, error = %err, "re-dispatch failed; sweep will retry");
            }
        }

        Ok(count)
    }

    // ------------------------------------------------------------------
    // Account management
    // ------------------------------------------------------------------

    /// Opens a new, empty account and persists it. Granting an identity
    /// access to the new id is the job of the identity collaborator.
    pub async fn open_account(&self, owner: impl Into<String>) -> Result<AccountId, CoreError> {
        let account = Account {
            id: AccountId::new(),
            owner: owner.into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let account_id = account.id;
        let state = AccountState {
            ledger: AccountLedger::new(account_id, self.config.trading.margin_multiplier),
            book: OrderBook::new(),
            baseline: EquityBaseline::new(Decimal::ZERO),
            account,
        };
        self.storage
            .commit(state.record())
            .await
            .map_err(CoreError::from)?;
        self.accounts
            .write()
            .await
            .insert(account_id, Arc::new(Mutex::new(state)));
        tracing::info!(%account_id, "account opened");
        Ok(account_id)
    }

    /// Credits external funds to an account.
    pub async fn deposit(
        &self,
        identity: &Identity,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<AccountView, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let mut state = domain.lock().await;
        let pre = state.clone();

        state.ledger.deposit(amount)?;
        // Transfers move the baseline so they never read as P&L.
        state.baseline.equity += amount;
        self.commit_or_restore(&mut state, pre).await?;
        Ok(AccountView::from_state(&state))
    }

    /// Debits external funds; fails without side effect when live
    /// reservations would be left uncovered.
    pub async fn withdraw(
        &self,
        identity: &Identity,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<AccountView, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let mut state = domain.lock().await;
        let pre = state.clone();

        state.ledger.withdraw(amount)?;
        state.baseline.equity -= amount;
        self.commit_or_restore(&mut state, pre).await?;
        Ok(AccountView::from_state(&state))
    }

    pub async fn get_account(
        &self,
        identity: &Identity,
        account_id: AccountId,
    ) -> Result<AccountView, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let state = domain.lock().await;
        Ok(AccountView::from_state(&state))
    }

    // ------------------------------------------------------------------
    // Order operations
    // ------------------------------------------------------------------

    /// Validates, funds and admits an order, then dispatches it to the
    /// execution collaborator.
    ///
    /// Failures before admission (`Validation`, `InsufficientFunds`)
    /// leave the ledger untouched; the order is recorded as `rejected`
    /// and stays queryable. A dispatch timeout returns
    /// `ExecutionTimeout` while the order stays `accepted` with its
    /// reservation intact; the reconciliation sweep retries it.
    pub async fn submit_order(
        &self,
        identity: &Identity,
        request: OrderRequest,
    ) -> Result<Order, CoreError> {
        self.authorize(identity, request.account_id)?;
        let domain = self.domain(request.account_id).await?;

        // Market orders are sized off the current quote; fetch it before
        // taking the account lock.
        let reference_price = match request.order_type {
            OrderType::Market => {
                Some(self.prices.current_price(&request.symbol).await.map_err(|_| {
                    CoreError::Validation(format!(
                        "no current price for {}; cannot size a market order",
                        request.symbol
                    ))
                })?)
            }
            OrderType::Limit => None,
        };

        let order = Order::from_request(&request);
        tracing::info!(
            account_id = %request.account_id,
            order_id = %order.id,
            correlation_id = %order.correlation_id,
            symbol = %request.symbol,
            side = ?request.side,
            quantity = %request.quantity,
            "order submitted"
        );

        let admitted = {
            let mut state = domain.lock().await;

            if let Err(err) = self.validate(&state, &request) {
                let rejected = state.book.record_rejected(order, err.to_string());
                self.commit_rejection(&mut state, rejected.id).await;
                self.index_order(rejected.id, request.account_id).await;
                return Err(err);
            }

            let reserve_amount = self.reservation_amount(&state, &request, reference_price);
            let reserve_per_unit = reserve_amount / request.quantity;
            let pre = state.clone();

            match state.ledger.reserve(reserve_amount) {
                Ok(token) => {
                    let admitted = state.book.admit(order, token, reserve_per_unit);
                    self.commit_or_restore(&mut state, pre).await?;
                    admitted
                }
                Err(err) => {
                    let core_err = CoreError::from(err);
                    let rejected = state.book.record_rejected(order, core_err.to_string());
                    self.commit_rejection(&mut state, rejected.id).await;
                    self.index_order(rejected.id, request.account_id).await;
                    return Err(core_err);
                }
            }
        };
        self.index_order(admitted.id, request.account_id).await;

        // Dispatch happens after the accepted transition is committed;
        // the account lock is no longer held.
        self.dispatch(&admitted).await?;
        Ok(admitted)
    }

    /// Cancels a live order and releases its remaining reservation.
    /// From a terminal state this fails with `InvalidState` naming the
    /// state that was hit, and changes nothing.
    pub async fn cancel_order(
        &self,
        identity: &Identity,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<Order, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;

        let cancelled = {
            let mut state = domain.lock().await;
            let pre = state.clone();
            let outcome = state.book.cancel(order_id)?;
            if let Some(token) = &outcome.reservation {
                let released = state.ledger.release(token);
                tracing::info!(
                    %account_id,
                    %order_id,
                    correlation_id = %outcome.order.correlation_id,
                    %released,
                    "order cancelled, reservation released"
                );
            }
            self.commit_or_restore(&mut state, pre).await?;
            outcome.order
        };

        // Best-effort forward; the local transition is already
        // authoritative.
        if let Err(err) = self.execution.cancel_order(order_id).await {
            tracing::warn!(%order_id, error = %err, "cancel forwarding to execution failed");
        }
        Ok(cancelled)
    }

    pub async fn get_order(
        &self,
        identity: &Identity,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<Order, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let state = domain.lock().await;
        state
            .book
            .get(order_id)
            .map(|record| record.order.clone())
            .ok_or(CoreError::OrderNotFound(order_id))
    }

    pub async fn list_orders(
        &self,
        identity: &Identity,
        account_id: AccountId,
        status_filter: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let state = domain.lock().await;
        Ok(state.book.list(status_filter))
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub async fn get_positions(
        &self,
        identity: &Identity,
        account_id: AccountId,
    ) -> Result<Vec<core_types::Position>, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;
        let state = domain.lock().await;
        Ok(portfolio::positions(&state.ledger))
    }

    /// Builds the portfolio summary. The ledger snapshot is taken under
    /// the account lock; price lookups run after the lock is released. A
    /// symbol without a price is flagged, never fatal.
    pub async fn get_portfolio_summary(
        &self,
        identity: &Identity,
        account_id: AccountId,
    ) -> Result<PortfolioSummary, CoreError> {
        self.authorize(identity, account_id)?;
        let domain = self.domain(account_id).await?;

        let (ledger, baseline) = {
            let state = domain.lock().await;
            (state.ledger.clone(), state.baseline)
        };

        let symbols: Vec<String> = ledger.positions().map(|p| p.symbol.clone()).collect();
        let lookups = join_all(
            symbols
                .iter()
                .map(|symbol| self.prices.current_price(symbol)),
        )
        .await;

        let mut prices = HashMap::new();
        for (symbol, result) in symbols.into_iter().zip(lookups) {
            match result {
                Ok(price) => {
                    prices.insert(symbol, price);
                }
                Err(err) => {
                    tracing::warn!(%account_id, %symbol, error = %err, "price lookup failed; excluding position from valuation");
                }
            }
        }

        Ok(portfolio::summarize(&ledger, &prices, &baseline))
    }

    // ------------------------------------------------------------------
    // Event pump
    // ------------------------------------------------------------------

    /// Consumes execution events until the channel closes. Run this in
    /// its own task alongside callers.
    pub async fn run_events(self: Arc<Self>, mut events_rx: mpsc::Receiver<ExecutionEvent>) {
        while let Some(event) = events_rx.recv().await {
            if let Err(err) = self.apply_event(&event).await {
                tracing::error!(error = %err, ?event, "failed to apply execution event");
            }
        }
        tracing::info!("execution event channel closed; event pump stopping");
    }

    /// Applies one execution event under the owning account's lock.
    pub async fn apply_event(&self, event: &ExecutionEvent) -> Result<(), CoreError> {
        match event {
            ExecutionEvent::Fill(fill) => self.apply_fill(fill).await,
            ExecutionEvent::Reject { order_id, reason } => {
                self.apply_reject(*order_id, reason).await
            }
        }
    }

    async fn apply_fill(&self, fill: &core_types::Fill) -> Result<(), CoreError> {
        let account_id = self.account_for_order(fill.order_id).await?;
        let domain = self.domain(account_id).await?;
        let mut state = domain.lock().await;
        let pre = state.clone();

        match state.book.apply_fill(fill)? {
            FillOutcome::Applied(application) => {
                let settlement = state.ledger.settle(
                    &application.reservation,
                    application.reserved_delta,
                    application.cash_delta,
                );
                if !settlement.shortfall.is_zero() {
                    tracing::warn!(
                        %account_id,
                        order_id = %fill.order_id,
                        fill_id = %fill.fill_id,
                        shortfall = %settlement.shortfall,
                        "venue-reported cost overran the reservation; buying power negative pending reconciliation"
                    );
                }
                state.ledger.apply_fill(
                    &application.symbol,
                    application.side.sign() * application.fill_quantity,
                    application.fill_price,
                )?;
                if application.completed {
                    // Terminal state: drop whatever hold remains.
                    state.ledger.release(&application.reservation);
                }
                self.commit_or_restore(&mut state, pre).await?;
                tracing::info!(
                    %account_id,
                    order_id = %fill.order_id,
                    fill_id = %fill.fill_id,
                    quantity = %fill.filled_quantity,
                    price = %fill.fill_price,
                    completed = application.completed,
                    "fill applied"
                );
            }
            // The book logs these no-ops at their source.
            FillOutcome::Duplicate | FillOutcome::Superseded(_) => {}
        }
        Ok(())
    }

    async fn apply_reject(&self, order_id: OrderId, reason: &str) -> Result<(), CoreError> {
        let account_id = self.account_for_order(order_id).await?;
        let domain = self.domain(account_id).await?;
        let mut state = domain.lock().await;
        let pre = state.clone();

        match state.book.apply_reject(order_id, reason)? {
            Some(outcome) => {
                if let Some(token) = &outcome.reservation {
                    state.ledger.release(token);
                }
                self.commit_or_restore(&mut state, pre).await?;
                tracing::warn!(%account_id, %order_id, reason, "order rejected by venue");
            }
            None => {
                tracing::warn!(%account_id, %order_id, reason, "venue reject for terminal order ignored");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn authorize(&self, identity: &Identity, account_id: AccountId) -> Result<(), CoreError> {
        if identity.can_access(account_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden { account_id })
        }
    }

    async fn domain(&self, account_id: AccountId) -> Result<Arc<Mutex<AccountState>>, CoreError> {
        self.accounts
            .read()
            .await
            .get(&account_id)
            .cloned()
            .ok_or(CoreError::AccountNotFound(account_id))
    }

    async fn account_for_order(&self, order_id: OrderId) -> Result<AccountId, CoreError> {
        self.order_index
            .read()
            .await
            .get(&order_id)
            .copied()
            .ok_or(CoreError::OrderNotFound(order_id))
    }

    async fn index_order(&self, order_id: OrderId, account_id: AccountId) {
        self.order_index.write().await.insert(order_id, account_id);
    }

    /// Field-level validation plus the position check for sells. Runs
    /// before any ledger mutation.
    fn validate(&self, state: &AccountState, request: &OrderRequest) -> Result<(), CoreError> {
        if !state.account.is_active {
            return Err(CoreError::Validation("account is inactive".to_string()));
        }
        if !self
            .config
            .trading
            .symbols
            .iter()
            .any(|s| s == &request.symbol)
        {
            return Err(CoreError::Validation(format!(
                "unknown symbol: {}",
                request.symbol
            )));
        }
        if request.quantity <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        match (request.order_type, request.limit_price) {
            (OrderType::Limit, None) => {
                return Err(CoreError::Validation(
                    "limit orders require a limit price".to_string(),
                ));
            }
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => {
                return Err(CoreError::Validation(
                    "limit price must be positive".to_string(),
                ));
            }
            (OrderType::Market, Some(_)) => {
                return Err(CoreError::Validation(
                    "market orders must not carry a limit price".to_string(),
                ));
            }
            _ => {}
        }

        // A cash account cannot sell more than it holds. With margin,
        // the uncovered portion is reserved like a buy instead.
        if request.side == OrderSide::Sell && self.config.trading.margin_multiplier == dec!(1) {
            let held = state.ledger.position_quantity(&request.symbol);
            if held < request.quantity {
                return Err(CoreError::Validation(format!(
                    "insufficient position in {}: selling {} but holding {}",
                    request.symbol, request.quantity, held
                )));
            }
        }
        Ok(())
    }

    /// Sizes the buying-power hold for an admitted order. Sells covered
    /// by an existing long position reserve nothing; the uncovered
    /// (short) portion of a margin sell reserves like a buy.
    fn reservation_amount(
        &self,
        state: &AccountState,
        request: &OrderRequest,
        reference_price: Option<Decimal>,
    ) -> Decimal {
        let per_unit = match (request.order_type, request.limit_price, reference_price) {
            (OrderType::Limit, Some(limit), _) => limit,
            (_, _, Some(reference)) => {
                reference * (dec!(1) + self.config.trading.market_order_buffer_pct)
            }
            // Unreachable after validation; reserve nothing rather than
            // guess.
            _ => Decimal::ZERO,
        };

        let reserved_quantity = match request.side {
            OrderSide::Buy => request.quantity,
            OrderSide::Sell => {
                let held = state.ledger.position_quantity(&request.symbol).max(Decimal::ZERO);
                (request.quantity - held).max(Decimal::ZERO)
            }
        };
        per_unit * reserved_quantity
    }

    /// Dispatches an accepted order to the execution collaborator under
    /// the configured timeout. Any failure surfaces as a retryable
    /// `ExecutionTimeout`; the order stays accepted, reservation intact,
    /// and the reconciliation sweep picks it up.
    pub(crate) async fn dispatch(&self, order: &Order) -> Result<(), CoreError> {
        let timeout = std::time::Duration::from_millis(self.config.execution.submit_timeout_ms);
        match tokio::time::timeout(timeout, self.execution.submit_order(order)).await {
            Ok(Ok(ticket)) => {
                let domain = self.domain(order.account_id).await?;
                let mut state = domain.lock().await;
                state.book.mark_dispatched(order.id);
                if let Err(err) = self.storage.commit(state.record()).await {
                    // The dispatch flag is advisory; losing it only means
                    // the sweep may hand the order to the venue twice,
                    // which the venue deduplicates by order id.
                    tracing::warn!(order_id = %order.id, error = %err, "failed to persist dispatch mark");
                }
                tracing::debug!(order_id = %order.id, venue_ref = %ticket.venue_ref, "order dispatched");
                Ok(())
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    account_id = %order.account_id,
                    order_id = %order.id,
                    correlation_id = %order.correlation_id,
                    error = %err,
                    "execution dispatch failed; order stays accepted for retry"
                );
                Err(CoreError::ExecutionTimeout { order_id: order.id })
            }
            Err(_elapsed) => {
                tracing::warn!(
                    account_id = %order.account_id,
                    order_id = %order.id,
                    correlation_id = %order.correlation_id,
                    "execution dispatch timed out; order stays accepted for retry"
                );
                Err(CoreError::ExecutionTimeout { order_id: order.id })
            }
        }
    }

    /// Lists the per-account domains, for the reconciliation sweep.
    pub(crate) async fn domains(&self) -> Vec<(AccountId, Arc<Mutex<AccountState>>)> {
        self.accounts
            .read()
            .await
            .iter()
            .map(|(id, domain)| (*id, Arc::clone(domain)))
            .collect()
    }

    /// Commits the mutated state; on failure restores the pre-image so
    /// no partial mutation survives in memory either.
    async fn commit_or_restore(
        &self,
        state: &mut AccountState,
        pre: AccountState,
    ) -> Result<(), CoreError> {
        match self.storage.commit(state.record()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let account_id = state.account.id;
                *state = pre;
                tracing::error!(%account_id, error = %err, "storage commit failed; in-memory state rolled back");
                Err(CoreError::from(err))
            }
        }
    }

    /// Persists a rejection record. Rejections carry no ledger change,
    /// so a failed commit only costs audit history; it must not mask the
    /// rejection itself.
    async fn commit_rejection(&self, state: &mut AccountState, order_id: OrderId) {
        if let Err(err) = self.storage.commit(state.record()).await {
            tracing::warn!(%order_id, error = %err, "failed to persist order rejection");
        }
    }
}
