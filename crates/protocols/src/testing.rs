//! Scripted signer and aggregator for tests.

use crate::aggregator::{AggregatorError, QuoteAggregator, QuoteRequest};
use crate::signer::{SignedTransaction, SignerError, TransactionSigner, UnsignedTransaction};
use async_trait::async_trait;
use aurum_domain::entities::SwapRoute;
use aurum_domain::math::price_impact::min_out_with_slippage;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Stage at which a [`ScriptedSigner`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerStage {
    Sign,
    Broadcast,
    Confirm,
}

/// Signer that succeeds unless told to fail at a stage.
#[derive(Debug, Default)]
pub struct ScriptedSigner {
    address: String,
    failure: Mutex<Option<(SignerStage, SignerError)>>,
    signed: Mutex<Vec<UnsignedTransaction>>,
    broadcasts: AtomicUsize,
}

impl ScriptedSigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Fails every call reaching `stage` with `error`.
    pub fn fail_at(&self, stage: SignerStage, error: SignerError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some((stage, error));
        }
    }

    pub fn succeed(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Transactions signed so far, oldest first.
    pub fn signed(&self) -> Vec<UnsignedTransaction> {
        self.signed.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn check(&self, stage: SignerStage) -> Result<(), SignerError> {
        match self.failure.lock() {
            Ok(failure) => match failure.as_ref() {
                Some((at, error)) if *at == stage => Err(error.clone()),
                _ => Ok(()),
            },
            Err(_) => Err(SignerError::Unavailable),
        }
    }
}

#[async_trait]
impl TransactionSigner for ScriptedSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, SignerError> {
        self.check(SignerStage::Sign)?;
        let payload = tx.label();
        if let Ok(mut signed) = self.signed.lock() {
            signed.push(tx);
        }
        Ok(SignedTransaction {
            signer: self.address.clone(),
            payload,
        })
    }

    async fn broadcast(&self, _signed: &SignedTransaction) -> Result<String, SignerError> {
        self.check(SignerStage::Broadcast)?;
        let n = self.broadcasts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sig-{n}"))
    }

    async fn confirm(&self, _signature: &str) -> Result<(), SignerError> {
        self.check(SignerStage::Confirm)
    }
}

struct ScriptedQuote {
    result: Result<Vec<SwapRoute>, AggregatorError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Aggregator answering from a script, falling back to a fixed rate.
///
/// Gated responses wait until the test releases them, which lets a test
/// deliver responses out of request order.
pub struct ScriptedAggregator {
    rate: Decimal,
    price_impact_percent: Option<Decimal>,
    script: Mutex<VecDeque<ScriptedQuote>>,
    swap_failure: Mutex<Option<String>>,
    quote_calls: AtomicUsize,
    swap_calls: AtomicUsize,
}

impl ScriptedAggregator {
    /// Quotes `amount × rate` for any pair.
    pub fn with_rate(rate: Decimal) -> Self {
        Self {
            rate,
            price_impact_percent: None,
            script: Mutex::new(VecDeque::new()),
            swap_failure: Mutex::new(None),
            quote_calls: AtomicUsize::new(0),
            swap_calls: AtomicUsize::new(0),
        }
    }

    /// Reports `pct` as the aggregator's own price impact.
    pub fn reporting_impact(mut self, pct: Decimal) -> Self {
        self.price_impact_percent = Some(pct);
        self
    }

    pub fn push_routes(&self, routes: Vec<SwapRoute>) {
        self.push(Ok(routes), None);
    }

    pub fn push_error(&self, reason: impl Into<String>) {
        self.push(Err(AggregatorError::QuoteFetch(reason.into())), None);
    }

    /// Queues routes that are only returned once the sender fires.
    pub fn push_gated_routes(&self, routes: Vec<SwapRoute>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Ok(routes), Some(rx));
        tx
    }

    /// Queues an error that is only returned once the sender fires.
    pub fn push_gated_error(&self, reason: impl Into<String>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Err(AggregatorError::QuoteFetch(reason.into())), Some(rx));
        tx
    }

    pub fn fail_swap_build(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.swap_failure.lock() {
            *failure = Some(reason.into());
        }
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::SeqCst)
    }

    /// Yields until at least `n` quote calls have started.
    pub async fn wait_for_quote_calls(&self, n: usize) {
        while self.quote_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    /// A route converting `amount` at `rate`.
    pub fn route(request: &QuoteRequest, rate: Decimal, venue: &str) -> SwapRoute {
        let out_amount = request.amount * rate;
        SwapRoute {
            input_mint: request.input.mint_address.clone(),
            output_mint: request.output.mint_address.clone(),
            in_amount: request.amount,
            out_amount,
            out_amount_with_slippage: min_out_with_slippage(out_amount, request.slippage_bps),
            price_impact_percent: Decimal::ZERO,
            slippage_bps: request.slippage_bps,
            venues: vec![venue.to_string()],
            quote: serde_json::json!({ "venue": venue, "outAmount": out_amount.to_string() }),
        }
    }

    fn push(&self, result: Result<Vec<SwapRoute>, AggregatorError>, gate: Option<oneshot::Receiver<()>>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedQuote { result, gate });
        }
    }
}

#[async_trait]
impl QuoteAggregator for ScriptedAggregator {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Vec<SwapRoute>, AggregatorError> {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        match next {
            Some(scripted) => {
                if let Some(gate) = scripted.gate {
                    let _ = gate.await;
                }
                scripted.result
            }
            None => {
                let mut route = Self::route(request, self.rate, "Scripted");
                if let Some(pct) = self.price_impact_percent {
                    route.price_impact_percent = pct;
                }
                Ok(vec![route])
            }
        }
    }

    async fn get_swap_transaction(
        &self,
        route: &SwapRoute,
        user: &str,
    ) -> Result<UnsignedTransaction, AggregatorError> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.swap_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(AggregatorError::SwapBuild(reason));
        }
        Ok(UnsignedTransaction::Serialized {
            payload: format!("swap:{}:{}:{}", user, route.input_mint, route.out_amount),
            last_valid_block_height: None,
        })
    }
}
