//! Swap quote router.
//!
//! Every quote request takes a token from a monotonically increasing
//! generation counter. A response is applied only if its token is still the
//! newest one issued; anything older is dropped without touching the
//! current routes or selection.

use crate::lifecycle::{Executed, TransactionExecutor};
use crate::notify::Notification;
use aurum_domain::entities::{HolderId, SwapRoute, Token, TxKind};
use aurum_domain::error::ActionError;
use aurum_protocols::aggregator::{QuoteAggregator, QuoteRequest};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of a quote request.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// Non-positive amount; routes were cleared.
    Empty,
    /// Routes applied, the first one selected.
    Routes(Vec<SwapRoute>),
    /// A newer request was issued meanwhile; nothing was applied.
    Superseded,
}

#[derive(Debug, Default)]
struct QuoteState {
    request: Option<QuoteRequest>,
    routes: Vec<SwapRoute>,
    selected: Option<usize>,
}

impl QuoteState {
    fn clear(&mut self) {
        self.request = None;
        self.routes.clear();
        self.selected = None;
    }
}

/// Fetches quotes, tracks the selected route and executes swaps.
pub struct SwapRouter {
    aggregator: Arc<dyn QuoteAggregator>,
    executor: Arc<TransactionExecutor>,
    generation: AtomicU64,
    state: RwLock<QuoteState>,
}

impl SwapRouter {
    /// Creates a new SwapRouter.
    pub fn new(aggregator: Arc<dyn QuoteAggregator>, executor: Arc<TransactionExecutor>) -> Self {
        Self {
            aggregator,
            executor,
            generation: AtomicU64::new(0),
            state: RwLock::new(QuoteState::default()),
        }
    }

    fn is_latest(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    /// Requests routes for swapping `amount` of `input` into `output`.
    ///
    /// # Errors
    /// `QuoteFetchFailed` if the newest request fails; routes and selection
    /// are cleared. Failures of superseded requests are dropped.
    pub async fn request_quote(
        &self,
        input: Token,
        output: Token,
        amount: Decimal,
        slippage_bps: u16,
    ) -> Result<QuoteOutcome, ActionError> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if amount <= Decimal::ZERO {
            let mut state = self.state.write().await;
            if self.is_latest(token) {
                state.clear();
            }
            return Ok(QuoteOutcome::Empty);
        }

        let request = QuoteRequest {
            input,
            output,
            amount,
            slippage_bps,
        };
        debug!(
            token,
            input = %request.input.symbol,
            output = %request.output.symbol,
            amount = %amount,
            slippage_bps,
            "Requesting quote"
        );
        let result = self.aggregator.get_quote(&request).await;

        let mut state = self.state.write().await;
        if !self.is_latest(token) {
            debug!(token, "Discarding superseded quote response");
            return Ok(QuoteOutcome::Superseded);
        }

        match result {
            Ok(routes) => {
                info!(
                    token,
                    routes = routes.len(),
                    best_out = ?routes.first().map(|r| r.out_amount),
                    "Quote applied"
                );
                state.selected = if routes.is_empty() { None } else { Some(0) };
                state.routes = routes.clone();
                state.request = Some(request);
                Ok(QuoteOutcome::Routes(routes))
            }
            Err(e) => {
                state.clear();
                let err = ActionError::from(e);
                warn!(token, error = %err, "Quote failed");
                self.executor
                    .notifier()
                    .notify(Notification::from_error("quote", &err));
                Err(err)
            }
        }
    }

    /// Selects `route` among the current candidates; false if it is not one.
    pub async fn select_route(&self, route: &SwapRoute) -> bool {
        let mut state = self.state.write().await;
        match state.routes.iter().position(|r| r == route) {
            Some(index) => {
                state.selected = Some(index);
                debug!(venues = %route.venue_path(), "Route selected");
                true
            }
            None => false,
        }
    }

    pub async fn routes(&self) -> Vec<SwapRoute> {
        self.state.read().await.routes.clone()
    }

    pub async fn selected_route(&self) -> Option<SwapRoute> {
        let state = self.state.read().await;
        state.selected.and_then(|i| state.routes.get(i).cloned())
    }

    /// The request the current routes answer.
    pub async fn current_request(&self) -> Option<QuoteRequest> {
        self.state.read().await.request.clone()
    }

    /// Drops routes and selection; in-flight quotes become stale.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.clear();
    }

    /// Executes exactly `route` with the connected wallet.
    ///
    /// Local balances are not changed; the chain is the source of truth for
    /// swapped tokens. Routes are cleared after a confirmed swap.
    ///
    /// # Errors
    /// `NotConnected` without a wallet, `SwapFailed` for any other failure.
    pub async fn execute_swap(
        &self,
        input: &Token,
        output: &Token,
        route: &SwapRoute,
    ) -> Result<Executed<String>, ActionError> {
        let kind = TxKind::Swap;
        let Some(address) = self.executor.session().address().await else {
            return Err(self.executor.reject(kind, ActionError::NotConnected));
        };
        if route.input_mint != input.mint_address || route.output_mint != output.mint_address {
            return Err(self.executor.reject(
                kind,
                ActionError::SwapFailed(format!(
                    "route does not swap {} into {}",
                    input.symbol, output.symbol
                )),
            ));
        }
        if route.in_amount <= Decimal::ZERO {
            return Err(self.executor.reject(
                kind,
                ActionError::InvalidAmount {
                    amount: route.in_amount,
                },
            ));
        }

        let holder = HolderId::new(address);
        let summary = format!(
            "swap {} {} for {} {}",
            route.in_amount, input.symbol, route.out_amount, output.symbol
        );
        let aggregator = Arc::clone(&self.aggregator);
        let route = route.clone();

        let executed = self
            .executor
            .execute(
                kind,
                &holder,
                summary,
                |user| async move {
                    aggregator
                        .get_swap_transaction(&route, &user)
                        .await
                        .map_err(ActionError::from)
                },
                |signature| async move { Ok(signature) },
            )
            .await?;

        info!(holder = %holder, signature = %executed.value, "Swap confirmed");
        self.clear().await;
        Ok(executed)
    }
}
