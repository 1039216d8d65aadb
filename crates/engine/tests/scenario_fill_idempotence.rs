//! Venue events are at-least-once: duplicate fills, fills for orders
//! that already resolved, and late rejects must all land harmlessly.

mod common;

use common::{Harness, limit_buy};
use core_types::OrderStatus;
use execution::{ExecutionEvent, PaperBehavior};
use rust_decimal_macros::dec;

#[tokio::test]
async fn duplicate_fill_is_applied_once() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let order = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(100), dec!(150)))
        .await
        .unwrap();
    let fill = harness.inject_fill(order.id, dec!(40), dec!(149.50)).await;

    let after_first = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(after_first.cash_balance, dec!(14020));
    assert_eq!(after_first.reserved, dec!(9000));

    // Same fill id delivered again: no double-apply, no error.
    harness
        .core
        .apply_event(&ExecutionEvent::Fill(fill))
        .await
        .unwrap();

    let after_second = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(after_second.cash_balance, dec!(14020));
    assert_eq!(after_second.reserved, dec!(9000));
    let refreshed = harness
        .core
        .get_order(&identity, account_id, order.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, OrderStatus::PartiallyFilled);

    let positions = harness
        .core
        .get_positions(&identity, account_id)
        .await
        .unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(40));
}

#[tokio::test]
async fn fill_after_cancel_is_ignored() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let order = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    harness
        .core
        .cancel_order(&identity, account_id, order.id)
        .await
        .unwrap();

    // The venue filled before it saw the cancel; the event loses the
    // race and must not resurrect the order or touch cash.
    harness.inject_fill(order.id, dec!(10), dec!(150)).await;

    let refreshed = harness
        .core
        .get_order(&identity, account_id, order.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, OrderStatus::Cancelled);
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.cash_balance, dec!(20000));
    assert_eq!(view.reserved, dec!(0));
    let positions = harness
        .core
        .get_positions(&identity, account_id)
        .await
        .unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
async fn reject_after_fill_is_ignored() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let order = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    harness.inject_fill(order.id, dec!(10), dec!(150)).await;

    harness
        .core
        .apply_event(&ExecutionEvent::Reject {
            order_id: order.id,
            reason: "late venue reject".to_string(),
        })
        .await
        .unwrap();

    let refreshed = harness
        .core
        .get_order(&identity, account_id, order.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, OrderStatus::Filled);
    assert!(refreshed.reject_reason.is_none());
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.cash_balance, dec!(18500));
}

#[tokio::test]
async fn venue_reject_releases_reservation() {
    let mut harness = Harness::new(PaperBehavior::RejectAfterAck {
        reason: "symbol halted".to_string(),
    })
    .await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let order = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Accepted);

    harness.pump_one().await;

    let refreshed = harness
        .core
        .get_order(&identity, account_id, order.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, OrderStatus::Rejected);
    assert_eq!(refreshed.reject_reason.as_deref(), Some("symbol halted"));
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.cash_balance, dec!(20000));
    assert_eq!(view.reserved, dec!(0));
}

#[tokio::test]
async fn overfill_is_refused() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let order = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    harness.inject_fill(order.id, dec!(8), dec!(150)).await;

    // 8 filled, 2 open; a 5-share fill exceeds the remainder.
    let fill = core_types::Fill {
        fill_id: core_types::FillId::new(),
        order_id: order.id,
        filled_quantity: dec!(5),
        fill_price: dec!(150),
        timestamp: chrono::Utc::now(),
    };
    let err = harness
        .core
        .apply_event(&ExecutionEvent::Fill(fill))
        .await
        .unwrap_err();
    assert!(matches!(err, core_types::CoreError::Validation(_)));

    // Ledger reflects only the legitimate fill.
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.cash_balance, dec!(18800));
    let refreshed = harness
        .core
        .get_order(&identity, account_id, order.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, OrderStatus::PartiallyFilled);
}
