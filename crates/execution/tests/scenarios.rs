//! End-to-end flows through the wired account core.

use aurum_data::MemoryAccountStore;
use aurum_domain::clock::ManualClock;
use aurum_domain::entities::{HolderId, PoolId, PoolState, Token, TxKind, TxStatus};
use aurum_execution::app::{AppBuilder, AurumApp, LiquidityPoolConfig};
use aurum_execution::config::AppConfig;
use aurum_execution::lifecycle::LifecyclePhase;
use aurum_execution::swap::QuoteOutcome;
use aurum_execution::testing::RecordingSink;
use aurum_execution::notify::Severity;
use aurum_protocols::aggregator::QuoteRequest;
use aurum_protocols::testing::{ScriptedAggregator, ScriptedSigner};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const STAKING_POOL: &str = "gold-staking";

fn gold() -> Token {
    Token::new("GoLDmint1111111111111111111111111111111111", "GOLD", 6, "Aurum Gold")
}

struct Setup {
    app: AurumApp,
    clock: Arc<ManualClock>,
    aggregator: Arc<ScriptedAggregator>,
    sink: Arc<RecordingSink>,
}

async fn setup(holder: &HolderId) -> Setup {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let aggregator = Arc::new(ScriptedAggregator::with_rate(dec!(150)));
    let sink = Arc::new(RecordingSink::default());
    let app = AppBuilder::new(AppConfig::default(), Arc::new(MemoryAccountStore::new()))
        .clock(clock.clone())
        .notifier(sink.clone())
        .aggregator(aggregator.clone())
        .staking_pool(PoolId::new(STAKING_POOL), "GOLD")
        .liquidity_pool(LiquidityPoolConfig {
            state: PoolState::new(PoolId::new("gold-usdc"), "GOLD", "USDC", dec!(5000), dec!(2)),
            volume_24h: dec!(25_000),
            fee_bps: 30,
        })
        .build()
        .await
        .unwrap();
    app.session
        .connect(Arc::new(ScriptedSigner::new(holder.as_str())))
        .await;
    Setup {
        app,
        clock,
        aggregator,
        sink,
    }
}

async fn fund(app: &AurumApp, holder: &HolderId, token: &str, amount: Decimal) {
    let mut account = app.book.holder(holder).await.unwrap();
    account.balances.credit(token, amount).unwrap();
    account.commit().await.unwrap();
}

async fn balance(app: &AurumApp, holder: &HolderId, token: &str) -> Decimal {
    app.book.read_holder(holder).await.unwrap().balances.get(token)
}

#[tokio::test]
async fn stake_for_a_week_and_claim() {
    let alice = HolderId::new("alice");
    let Setup { app, clock, sink, .. } = setup(&alice).await;
    let pool = PoolId::new(STAKING_POOL);
    fund(&app, &alice, "GOLD", dec!(1000)).await;

    let phases = app.executor.subscribe();
    app.staking.stake(&alice, &pool, dec!(400)).await.unwrap();
    assert_eq!(balance(&app, &alice, "GOLD").await, dec!(600));
    assert_eq!(phases.borrow().phase, LifecyclePhase::Success);
    assert_eq!(phases.borrow().kind, Some(TxKind::Stake));

    clock.advance(chrono::Duration::days(7));
    let view = app.staking.view(&alice, &pool).await.unwrap();
    assert_eq!(view.pending_rewards.round_dp(2), dec!(0.92));
    assert_eq!(view.lock_remaining_secs, 0);

    let claimed = app.staking.claim(&alice, &pool).await.unwrap();
    assert_eq!(claimed.round_dp(2), dec!(0.92));
    assert_eq!(balance(&app, &alice, "GOLD").await.round_dp(2), dec!(600.92));
    assert_eq!(app.staking.pending_rewards(&alice, &pool).await.unwrap(), Decimal::ZERO);

    let history = app.executor.history().for_holder(&alice).await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.status == TxStatus::Completed));
    assert_eq!(history[0].kind, TxKind::Claim);
    assert!(
        sink.notifications()
            .iter()
            .all(|n| n.severity == Severity::Success)
    );
}

#[tokio::test]
async fn sequential_stakes_accumulate() {
    let alice = HolderId::new("alice");
    let Setup { app, clock, .. } = setup(&alice).await;
    let pool = PoolId::new(STAKING_POOL);
    fund(&app, &alice, "GOLD", dec!(100)).await;

    let first = app.staking.stake(&alice, &pool, dec!(12.5)).await.unwrap();
    clock.advance(chrono::Duration::hours(5));
    let second = app.staking.stake(&alice, &pool, dec!(7.5)).await.unwrap();

    assert_eq!(second.staked_amount, dec!(20));
    assert_eq!(second.stake_start_time, first.stake_start_time);
}

#[tokio::test]
async fn newest_quote_wins_when_responses_arrive_out_of_order() {
    let alice = HolderId::new("alice");
    let Setup { app, aggregator, .. } = setup(&alice).await;
    let request = |amount| QuoteRequest {
        input: Token::sol(),
        output: gold(),
        amount,
        slippage_bps: 100,
    };
    let slow_route = ScriptedAggregator::route(&request(dec!(1)), dec!(149), "Slow");
    let fast_route = ScriptedAggregator::route(&request(dec!(2)), dec!(150), "Fast");
    let release = aggregator.push_gated_routes(vec![slow_route]);
    aggregator.push_routes(vec![fast_route.clone()]);

    let router = Arc::clone(&app.router);
    let slow = tokio::spawn(async move {
        router.request_quote(Token::sol(), gold(), dec!(1), 100).await
    });
    aggregator.wait_for_quote_calls(1).await;
    let fast = app
        .router
        .request_quote(Token::sol(), gold(), dec!(2), 100)
        .await
        .unwrap();
    release.send(()).unwrap();

    assert_eq!(fast, QuoteOutcome::Routes(vec![fast_route.clone()]));
    assert_eq!(slow.await.unwrap().unwrap(), QuoteOutcome::Superseded);
    assert_eq!(app.router.selected_route().await, Some(fast_route));
}

#[tokio::test]
async fn sol_to_gold_quote_within_price_impact() {
    let alice = HolderId::new("alice");
    let Setup { app, aggregator, .. } = setup(&alice).await;
    let market_rate = dec!(150);
    let mut route = ScriptedAggregator::route(
        &QuoteRequest {
            input: Token::sol(),
            output: gold(),
            amount: Decimal::ONE,
            slippage_bps: 100,
        },
        dec!(149.94),
        "Orca",
    );
    route.price_impact_percent = dec!(0.05);
    aggregator.push_routes(vec![route]);

    let outcome = app
        .router
        .request_quote(Token::sol(), gold(), Decimal::ONE, 100)
        .await
        .unwrap();
    let QuoteOutcome::Routes(routes) = outcome else {
        panic!("expected routes, got {outcome:?}");
    };
    let best = &routes[0];
    let deviation_pct = ((best.execution_rate() - market_rate) / market_rate * Decimal::ONE_HUNDRED).abs();
    assert!(deviation_pct <= best.price_impact_percent);
    assert_eq!(best.out_amount_with_slippage, dec!(148.4406));

    let executed = app.router.execute_swap(&Token::sol(), &gold(), best).await.unwrap();
    assert_eq!(executed.record.status, TxStatus::Completed);
}

#[tokio::test]
async fn disconnected_wallet_rejects_without_mutation() {
    let alice = HolderId::new("alice");
    let Setup { app, sink, .. } = setup(&alice).await;
    fund(&app, &alice, "GOLD", dec!(10)).await;
    app.session.disconnect().await;

    let pools = app.pool(&PoolId::new("gold-usdc")).unwrap();
    let err = pools.add_liquidity(&alice, dec!(5)).await.unwrap_err();
    assert_eq!(err, aurum_domain::error::ActionError::NotConnected);
    assert_eq!(balance(&app, &alice, "GOLD").await, dec!(10));
    assert!(app.executor.history().is_empty().await);
    assert_eq!(sink.notifications().len(), 1);
}
