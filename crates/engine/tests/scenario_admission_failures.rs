//! Validation and funding failures reject synchronously, before any
//! ledger mutation, and the rejected order stays queryable.

mod common;

use common::{Harness, limit_buy, limit_sell, market_buy};
use core_types::{CoreError, OrderRequest, OrderSide, OrderStatus, OrderType};
use execution::PaperBehavior;
use rust_decimal_macros::dec;

#[tokio::test]
async fn insufficient_funds_rejects_without_reservation() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(100)).await;

    let err = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(100), dec!(150)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::InsufficientFunds {
            required: dec!(15000),
            available: dec!(100),
        }
    );

    // No reservation was created.
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.reserved, dec!(0));
    assert_eq!(view.buying_power, dec!(100));

    // The rejection is recorded for audit.
    let rejected = harness
        .core
        .list_orders(&identity, account_id, Some(OrderStatus::Rejected))
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert!(
        rejected[0]
            .reject_reason
            .as_deref()
            .unwrap()
            .contains("Insufficient buying power")
    );
}

#[tokio::test]
async fn unknown_symbol_is_rejected() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let mut request = limit_buy(account_id, dec!(10), dec!(150));
    request.symbol = "DOGE".to_string();
    let err = harness.core.submit_order(&identity, request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.reserved, dec!(0));
}

#[tokio::test]
async fn limit_order_without_price_is_rejected() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let request = OrderRequest {
        account_id,
        symbol: "AAPL".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        quantity: dec!(10),
        limit_price: None,
    };
    let err = harness.core.submit_order(&identity, request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn market_order_with_limit_price_is_rejected() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let mut request = market_buy(account_id, dec!(10));
    request.limit_price = Some(dec!(150));
    let err = harness.core.submit_order(&identity, request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let err = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(0), dec!(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn cash_account_cannot_sell_more_than_held() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    // Buy and fill 10 shares first.
    let buy = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    harness.inject_fill(buy.id, dec!(10), dec!(150)).await;

    // Selling 25 against a 10-share position fails validation.
    let err = harness
        .core
        .submit_order(&identity, limit_sell(account_id, dec!(25), dec!(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Selling what is held is fine and reserves nothing.
    let sell = harness
        .core
        .submit_order(&identity, limit_sell(account_id, dec!(10), dec!(155)))
        .await
        .unwrap();
    assert_eq!(sell.status, OrderStatus::Accepted);
    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.reserved, dec!(0));
}

#[tokio::test]
async fn market_buy_reserves_buffered_reference_price() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    // AAPL quotes at 150; 5% buffer -> 157.50 per share.
    let order = harness
        .core
        .submit_order(&identity, market_buy(account_id, dec!(100)))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Accepted);

    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    assert_eq!(view.reserved, dec!(15750.00));
}

#[tokio::test]
async fn market_order_without_quote_is_rejected() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;
    harness.prices.remove_price("AAPL").await;

    let err = harness
        .core
        .submit_order(&identity, market_buy(account_id, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn sell_completion_credits_cash() {
    let harness = Harness::new(PaperBehavior::AcknowledgeOnly).await;
    let (account_id, identity) = harness.funded_account(dec!(20000)).await;

    let buy = harness
        .core
        .submit_order(&identity, limit_buy(account_id, dec!(10), dec!(150)))
        .await
        .unwrap();
    harness.inject_fill(buy.id, dec!(10), dec!(150)).await;

    let sell = harness
        .core
        .submit_order(&identity, limit_sell(account_id, dec!(10), dec!(155)))
        .await
        .unwrap();
    harness.inject_fill(sell.id, dec!(10), dec!(155)).await;

    let view = harness.core.get_account(&identity, account_id).await.unwrap();
    // 20000 - 1500 + 1550
    assert_eq!(view.cash_balance, dec!(20050));
    let positions = harness
        .core
        .get_positions(&identity, account_id)
        .await
        .unwrap();
    assert!(positions.is_empty());
}
