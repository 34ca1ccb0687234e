//! Integration tests for checkout and the order lifecycle.

use std::time::Duration;

use checkout::{
    CheckoutCoordinator, CheckoutError, CheckoutRequest, InMemoryNotifier,
    InMemoryPaymentProcessor,
};
use common::{AggregateId, Money, ProductId, UserId};
use domain::{
    Address, Aggregate, CartOwner, Catalog, OrderStatus, PaymentMethod, PaymentStatus,
    StatusUpdate, StockStatus,
};
use event_store::InMemoryEventStore;

type TestCoordinator =
    CheckoutCoordinator<InMemoryEventStore, InMemoryPaymentProcessor, InMemoryNotifier>;

struct TestHarness {
    store: InMemoryEventStore,
    coordinator: TestCoordinator,
    payment: InMemoryPaymentProcessor,
    notifier: InMemoryNotifier,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        let payment = InMemoryPaymentProcessor::new();
        let notifier = InMemoryNotifier::new();
        let coordinator =
            CheckoutCoordinator::new(store.clone(), payment.clone(), notifier.clone());

        Self {
            store,
            coordinator,
            payment,
            notifier,
        }
    }

    async fn product(&self, name: &str, cents: i64, stock: u32) -> ProductId {
        self.coordinator
            .products()
            .list_product(name, Money::from_cents(cents), stock, None)
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, id: ProductId) -> u32 {
        self.coordinator
            .products()
            .get_product(id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn add_to_cart(&self, user_id: UserId, product_id: ProductId, quantity: u32) {
        self.coordinator
            .carts()
            .add_item(&CartOwner::User(user_id), product_id, quantity)
            .await
            .unwrap();
    }

    async fn open_cart(&self, user_id: UserId) {
        self.coordinator
            .carts()
            .get_cart(&CartOwner::User(user_id))
            .await
            .unwrap();
    }
}

fn address() -> Address {
    Address {
        street: "200 Orchard Rd".into(),
        city: "Madison".into(),
        state: "WI".into(),
        zip_code: "53703".into(),
        country: "US".into(),
    }
}

fn card_checkout() -> CheckoutRequest {
    CheckoutRequest::new(address(), PaymentMethod::CreditCard)
}

fn cod_checkout() -> CheckoutRequest {
    CheckoutRequest::new(address(), PaymentMethod::CashOnDelivery)
}

#[tokio::test]
async fn test_checkout_with_coupon_scenario() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let palm = h.product("Parlor Palm", 3000, 10).await;
    h.add_to_cart(user_id, palm, 2).await;

    let order = h
        .coordinator
        .place_order(user_id, card_checkout().with_coupon("save20"))
        .await
        .unwrap();

    let totals = order.totals();
    assert_eq!(totals.subtotal, Money::from_cents(6000));
    assert_eq!(totals.tax_amount, Money::from_cents(480));
    assert_eq!(totals.shipping_amount, Money::zero());
    assert_eq!(totals.discount_amount, Money::from_cents(1200));
    assert_eq!(totals.total, Money::from_cents(5280));

    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    let intent = order.payment_intent().unwrap();
    assert_eq!(intent.amount_minor, 5280);
    assert_eq!(intent.currency, "usd");

    assert_eq!(h.stock(palm).await, 8);
    let cart = h
        .coordinator
        .carts()
        .get_cart(&CartOwner::User(user_id))
        .await
        .unwrap();
    assert!(cart.items.is_empty());
    assert!(cart.applied_coupon.is_none());
}

#[tokio::test]
async fn test_explicit_lines_override_cart_contents() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let ivy = h.product("English Ivy", 1500, 5).await;
    let fern = h.product("Maidenhair Fern", 2200, 5).await;
    h.add_to_cart(user_id, ivy, 1).await;

    let order = h
        .coordinator
        .place_order(user_id, cod_checkout().with_line(fern, 2))
        .await
        .unwrap();

    assert_eq!(order.lines().len(), 1);
    assert_eq!(order.lines()[0].product_id, fern);
    assert_eq!(h.stock(fern).await, 3);
    assert_eq!(h.stock(ivy).await, 5);
}

#[tokio::test]
async fn test_insufficient_stock_rejects_whole_order() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let plenty = h.product("Spider Plant", 1200, 50).await;
    let scarce = h.product("Variegated Monstera", 9900, 1).await;
    h.open_cart(user_id).await;
    let before = h.store.event_count().await;

    let request = cod_checkout().with_line(plenty, 3).with_line(scarce, 2);
    let err = h.coordinator.place_order(user_id, request).await.unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            product_id,
            requested,
            available,
            ..
        } => {
            assert_eq!(product_id, scarce);
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.stock(plenty).await, 50);
    assert_eq!(h.stock(scarce).await, 1);
    assert_eq!(h.store.event_count().await, before);
}

#[tokio::test]
async fn test_unknown_and_inactive_products() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    h.open_cart(user_id).await;

    let missing = h
        .coordinator
        .place_order(user_id, cod_checkout().with_line(ProductId::new(), 1))
        .await
        .unwrap_err();
    assert!(matches!(missing, CheckoutError::NotFound { entity: "Product", .. }));

    let retired = h.product("Retired Cactus", 700, 9).await;
    h.coordinator.products().deactivate(retired).await.unwrap();
    let unavailable = h
        .coordinator
        .place_order(user_id, cod_checkout().with_line(retired, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        unavailable,
        CheckoutError::ProductUnavailable { product_id, .. } if product_id == retired
    ));
}

#[tokio::test]
async fn test_checkout_requires_an_opened_cart() {
    let h = TestHarness::new();
    let pothos = h.product("Neon Pothos", 1100, 5).await;

    let err = h
        .coordinator
        .place_order(UserId::new(), cod_checkout().with_line(pothos, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::NotFound { entity: "Cart", .. }));
    assert_eq!(h.stock(pothos).await, 5);
}

#[tokio::test]
async fn test_empty_cart_and_duplicate_lines_are_validation_errors() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let pothos = h.product("Neon Pothos", 1100, 5).await;
    h.open_cart(user_id).await;

    let empty = h.coordinator.place_order(user_id, cod_checkout()).await;
    assert!(matches!(empty, Err(CheckoutError::Validation(_))));

    let twice = cod_checkout().with_line(pothos, 1).with_line(pothos, 1);
    let dup = h.coordinator.place_order(user_id, twice).await;
    assert!(matches!(dup, Err(CheckoutError::Validation(_))));
}

#[tokio::test]
async fn test_checkout_coupons_are_resolved() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let succulent = h.product("Echeveria", 2499, 10).await;
    h.add_to_cart(user_id, succulent, 1).await;

    let unknown = h
        .coordinator
        .place_order(user_id, cod_checkout().with_coupon("HALFOFF"))
        .await;
    assert!(matches!(unknown, Err(CheckoutError::InvalidCoupon(_))));

    // SAVE10 needs a $25 subtotal
    let below = h
        .coordinator
        .place_order(user_id, cod_checkout().with_coupon("SAVE10"))
        .await;
    assert!(matches!(below, Err(CheckoutError::InvalidCoupon(_))));

    let freeship = h
        .coordinator
        .place_order(user_id, cod_checkout().with_coupon("freeship"))
        .await
        .unwrap();
    let totals = freeship.totals();
    assert_eq!(totals.shipping_amount, Money::from_cents(999));
    assert_eq!(totals.discount_amount, totals.shipping_amount);
    assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
}

#[tokio::test]
async fn test_cart_coupon_carries_into_order() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let owner = CartOwner::User(user_id);
    let palm = h.product("Parlor Palm", 3000, 10).await;
    h.add_to_cart(user_id, palm, 2).await;
    let cart = h
        .coordinator
        .carts()
        .apply_coupon(&owner, "SAVE20")
        .await
        .unwrap();

    let order = h.coordinator.place_order(user_id, cod_checkout()).await.unwrap();

    assert_eq!(order.totals(), &cart.totals);
    assert_eq!(order.totals().discount_amount, Money::from_cents(1200));
    assert_eq!(order.totals().total, Money::from_cents(5280));
    assert_eq!(order.coupon().map(|c| c.code.as_str()), Some("SAVE20"));

    let emptied = h.coordinator.carts().get_cart(&owner).await.unwrap();
    assert!(emptied.applied_coupon.is_none());
}

#[tokio::test]
async fn test_request_coupon_replaces_cart_coupon() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let palm = h.product("Parlor Palm", 3000, 10).await;
    h.add_to_cart(user_id, palm, 2).await;
    h.coordinator
        .carts()
        .apply_coupon(&CartOwner::User(user_id), "SAVE20")
        .await
        .unwrap();

    let order = h
        .coordinator
        .place_order(user_id, cod_checkout().with_coupon("SAVE5"))
        .await
        .unwrap();

    assert_eq!(order.coupon().map(|c| c.code.as_str()), Some("SAVE5"));
    assert_eq!(order.totals().discount_amount, Money::from_cents(500));
}

#[tokio::test]
async fn test_explicit_lines_do_not_use_cart_coupon() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let palm = h.product("Parlor Palm", 3000, 10).await;
    h.add_to_cart(user_id, palm, 2).await;
    h.coordinator
        .carts()
        .apply_coupon(&CartOwner::User(user_id), "SAVE20")
        .await
        .unwrap();

    let order = h
        .coordinator
        .place_order(user_id, cod_checkout().with_line(palm, 1))
        .await
        .unwrap();

    assert!(order.coupon().is_none());
    assert_eq!(order.totals().discount_amount, Money::zero());
}

#[tokio::test]
async fn test_cart_coupon_minimum_rechecked_at_live_prices() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let fern = h.product("Staghorn Fern", 3000, 5).await;
    h.add_to_cart(user_id, fern, 1).await;
    h.coordinator
        .carts()
        .apply_coupon(&CartOwner::User(user_id), "SAVE10")
        .await
        .unwrap();

    h.coordinator
        .products()
        .change_price(fern, Money::from_cents(2000))
        .await
        .unwrap();

    let events_before = h.store.event_count().await;
    let result = h.coordinator.place_order(user_id, cod_checkout()).await;
    assert!(matches!(result, Err(CheckoutError::InvalidCoupon(_))));
    assert_eq!(h.store.event_count().await, events_before);
    assert_eq!(h.stock(fern).await, 5);
}

#[tokio::test]
async fn test_cash_on_delivery_skips_payment() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let jade = h.product("Jade Plant", 1800, 4).await;
    h.add_to_cart(user_id, jade, 1).await;

    let order = h.coordinator.place_order(user_id, cod_checkout()).await.unwrap();

    assert!(order.payment_intent().is_none());
    assert!(!order.needs_payment_setup());
    assert_eq!(h.payment.intent_count().await, 0);
}

#[tokio::test]
async fn test_payment_setup_failure_keeps_order_pending() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let jade = h.product("Jade Plant", 1800, 4).await;
    h.add_to_cart(user_id, jade, 2).await;
    h.payment.set_failure(Some("processor timeout")).await;

    let err = h
        .coordinator
        .place_order(user_id, card_checkout())
        .await
        .unwrap_err();
    let order_id = match err {
        CheckoutError::PaymentSetupFailed { order_id, reason } => {
            assert_eq!(reason, "processor timeout");
            order_id
        }
        other => panic!("unexpected error {other:?}"),
    };

    let order = h
        .coordinator
        .orders()
        .get_order_for_user(user_id, order_id)
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    assert_eq!(order.payment_setup_error(), Some("processor timeout"));
    assert_eq!(h.stock(jade).await, 2);

    h.payment.set_failure(None).await;
    let retried = h
        .coordinator
        .retry_payment_setup(user_id, order_id)
        .await
        .unwrap();
    assert!(retried.payment_intent().is_some());
    assert!(retried.payment_setup_error().is_none());

    let again = h.coordinator.retry_payment_setup(user_id, order_id).await;
    assert!(matches!(again, Err(CheckoutError::InvalidState(_))));
}

#[tokio::test]
async fn test_customer_cancel_restores_stock() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let aloe = h.product("Aloe Vera", 900, 6).await;
    let basil = h.product("Sweet Basil", 450, 6).await;
    h.add_to_cart(user_id, aloe, 2).await;
    h.add_to_cart(user_id, basil, 6).await;

    let order = h.coordinator.place_order(user_id, cod_checkout()).await.unwrap();
    let order_id = order.id().unwrap();
    assert_eq!(h.stock(basil).await, 0);
    let sold_out = h.coordinator.products().get_product(basil).await.unwrap().unwrap();
    assert_eq!(sold_out.stock_status, StockStatus::OutOfStock);

    let cancelled = h
        .coordinator
        .cancel_order(user_id, order_id, Some("ordered twice".into()))
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at().is_some());
    assert_eq!(h.stock(aloe).await, 6);
    assert_eq!(h.stock(basil).await, 6);
}

#[tokio::test]
async fn test_customer_cannot_cancel_shipped_order() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let aloe = h.product("Aloe Vera", 900, 6).await;
    h.add_to_cart(user_id, aloe, 1).await;
    let order_id = h
        .coordinator
        .place_order(user_id, cod_checkout())
        .await
        .unwrap()
        .id()
        .unwrap();

    for to in [OrderStatus::Confirmed, OrderStatus::Processing] {
        h.coordinator
            .transition_order(order_id, StatusUpdate::to(to))
            .await
            .unwrap();
    }
    let shipped = h
        .coordinator
        .transition_order(
            order_id,
            StatusUpdate::to(OrderStatus::Shipped).with_tracking_number("9400111"),
        )
        .await
        .unwrap();
    assert_eq!(shipped.tracking_number(), Some("9400111"));

    let err = h
        .coordinator
        .cancel_order(user_id, order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidStatusTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled
        }
    ));
    assert_eq!(h.stock(aloe).await, 5);
}

#[tokio::test]
async fn test_admin_cancel_while_processing_restores_stock() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let aloe = h.product("Aloe Vera", 900, 6).await;
    h.add_to_cart(user_id, aloe, 3).await;
    let order_id = h
        .coordinator
        .place_order(user_id, cod_checkout())
        .await
        .unwrap()
        .id()
        .unwrap();
    for to in [OrderStatus::Confirmed, OrderStatus::Processing] {
        h.coordinator
            .transition_order(order_id, StatusUpdate::to(to))
            .await
            .unwrap();
    }

    assert!(h.coordinator.cancel_order(user_id, order_id, None).await.is_err());
    let cancelled = h
        .coordinator
        .transition_order(
            order_id,
            StatusUpdate::to(OrderStatus::Cancelled).with_reason("warehouse damage"),
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason(), Some("warehouse damage"));
    assert_eq!(h.stock(aloe).await, 6);

    let terminal = h
        .coordinator
        .transition_order(order_id, StatusUpdate::to(OrderStatus::Confirmed))
        .await;
    assert!(matches!(terminal, Err(CheckoutError::InvalidStatusTransition { .. })));
}

#[tokio::test]
async fn test_order_totals_frozen_after_price_change() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let olive = h.product("Olive Tree", 4500, 3).await;
    h.add_to_cart(user_id, olive, 1).await;
    let order = h.coordinator.place_order(user_id, cod_checkout()).await.unwrap();

    h.coordinator
        .products()
        .change_price(olive, Money::from_cents(9000))
        .await
        .unwrap();

    let reloaded = h
        .coordinator
        .orders()
        .get_order_for_user(user_id, order.id().unwrap())
        .await
        .unwrap();
    assert_eq!(reloaded.lines()[0].unit_price, Money::from_cents(4500));
    assert_eq!(reloaded.totals(), order.totals());
}

#[tokio::test]
async fn test_concurrent_checkouts_for_last_unit() {
    let h = TestHarness::new();
    let bonsai = h.product("Juniper Bonsai", 12000, 1).await;
    let alice = UserId::new();
    let bob = UserId::new();
    h.add_to_cart(alice, bonsai, 1).await;
    h.add_to_cart(bob, bonsai, 1).await;

    let (a, b) = tokio::join!(
        h.coordinator.place_order(alice, cod_checkout()),
        h.coordinator.place_order(bob, cod_checkout()),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(CheckoutError::Conflict) | Err(CheckoutError::InsufficientStock { .. })
    ));
    assert_eq!(h.stock(bonsai).await, 0);
}

#[tokio::test]
async fn test_payment_status_updates() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let fig = h.product("Fiddle Leaf Fig", 6500, 2).await;
    h.add_to_cart(user_id, fig, 1).await;
    let order_id = h
        .coordinator
        .place_order(user_id, card_checkout())
        .await
        .unwrap()
        .id()
        .unwrap();

    let paid = h
        .coordinator
        .set_payment_status(order_id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);

    let invalid = h
        .coordinator
        .set_payment_status(order_id, PaymentStatus::Pending)
        .await;
    assert!(matches!(invalid, Err(CheckoutError::InvalidState(_))));

    let missing = h
        .coordinator
        .set_payment_status(AggregateId::new(), PaymentStatus::Paid)
        .await;
    assert!(matches!(missing, Err(CheckoutError::NotFound { .. })));
}

#[tokio::test]
async fn test_confirmation_is_sent_in_background() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let fig = h.product("Fiddle Leaf Fig", 6500, 2).await;
    h.add_to_cart(user_id, fig, 1).await;

    let order = h.coordinator.place_order(user_id, cod_checkout()).await.unwrap();

    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = h.notifier.sent().await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].order_id, order.id().unwrap());
    assert_eq!(sent[0].total, order.totals().total);
}

#[tokio::test]
async fn test_notification_failure_does_not_block_checkout() {
    let h = TestHarness::new();
    let user_id = UserId::new();
    let fig = h.product("Fiddle Leaf Fig", 6500, 2).await;
    h.add_to_cart(user_id, fig, 1).await;
    h.notifier.set_failing(true).await;

    let order = h.coordinator.place_order(user_id, cod_checkout()).await;

    assert!(order.is_ok());
    assert_eq!(h.stock(fig).await, 1);
}
