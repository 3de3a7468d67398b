//! Contention properties of the reservation and lifecycle paths.
//!
//! Run with: `cargo test --test seckill_concurrency -- --nocapture`

mod common;

use rust_decimal::Decimal;
use std::sync::Arc;

use common::{harness, TICKET_TYPE_ID};
use seckill_server::engine::EngineError;
use seckill_server::models::OrderStatus;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_purchases_never_oversell() {
    const TOTAL: i32 = 50;
    let h = harness(TOTAL, Decimal::new(100, 0)).await;
    let reservations = Arc::new(h.reservations.clone());

    // 200 buyers asking for 1..=5 units each: far more demand than supply.
    let mut handles = Vec::new();
    for buyer in 0..200i64 {
        let reservations = Arc::clone(&reservations);
        let quantity = (buyer % 5 + 1) as u32;
        handles.push(tokio::spawn(async move {
            reservations
                .attempt_purchase(buyer + 1, TICKET_TYPE_ID, quantity)
                .await
        }));
    }

    let mut reserved = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => reserved += order.quantity,
            Err(EngineError::StockInsufficient) => sold_out += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(reserved <= TOTAL);
    assert!(sold_out > 0);
    let stock = h.store.stock(TICKET_TYPE_ID).await.unwrap();
    assert_eq!(stock, TOTAL - reserved);

    let held: i32 = h.store.orders().await.iter().map(|o| o.quantity).sum();
    assert_eq!(held, reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_purchases_and_cancels_keep_stock_consistent() {
    const TOTAL: i32 = 30;
    let h = harness(TOTAL, Decimal::new(40, 0)).await;
    let reservations = Arc::new(h.reservations.clone());
    let lifecycle = Arc::new(h.lifecycle.clone());

    let mut handles = Vec::new();
    for buyer in 1..=60i64 {
        let reservations = Arc::clone(&reservations);
        let lifecycle = Arc::clone(&lifecycle);
        handles.push(tokio::spawn(async move {
            let order = reservations
                .attempt_purchase(buyer, TICKET_TYPE_ID, 2)
                .await
                .ok()?;
            if buyer % 2 == 0 {
                lifecycle.cancel(order.id, buyer).await.unwrap();
            }
            Some(order)
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let orders = h.store.orders().await;
    let active: i32 = orders
        .iter()
        .filter(|o| o.status.holds_stock())
        .map(|o| o.quantity)
        .sum();
    let stock = h.store.stock(TICKET_TYPE_ID).await.unwrap();
    assert!(active <= TOTAL);
    assert_eq!(stock, TOTAL - active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_payments_have_exactly_one_winner() {
    let h = harness(5, Decimal::new(100, 0)).await;
    let order_id = h
        .reservations
        .attempt_purchase(7, TICKET_TYPE_ID, 1)
        .await
        .unwrap()
        .id;

    let lifecycle = Arc::new(h.lifecycle.clone());
    let mut handles = Vec::new();
    for _ in 0..2 {
        let lifecycle = Arc::clone(&lifecycle);
        handles.push(tokio::spawn(async move { lifecycle.pay(order_id, 7).await }));
    }

    let mut paid = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                assert_eq!(order.status, OrderStatus::Paid);
                paid += 1;
            }
            Err(EngineError::OrderStatusError(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!((paid, rejected), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_pay_and_cancel_resolve_once() {
    for _ in 0..20 {
        let h = harness(3, Decimal::new(100, 0)).await;
        let order_id = h
            .reservations
            .attempt_purchase(9, TICKET_TYPE_ID, 3)
            .await
            .unwrap()
            .id;

        let pay = {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.pay(order_id, 9).await })
        };
        let cancel = {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.cancel(order_id, 9).await })
        };
        let paid = pay.await.unwrap().is_ok();
        let cancelled = cancel.await.unwrap().is_ok();
        assert!(paid ^ cancelled);

        let stock = h.store.stock(TICKET_TYPE_ID).await.unwrap();
        assert_eq!(stock, if paid { 0 } else { 3 });
    }
}
