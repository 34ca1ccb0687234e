//! Integration tests across the cart, catalog and order aggregates.
//!
//! These exercise the stage-then-commit flow the checkout layer builds on:
//! stock moves, the order and the emptied cart land in one atomic write.

use std::sync::Arc;

use common::{AggregateId, Money, ProductId, UserId};
use domain::{
    Address, Aggregate, CartOwner, CartService, Catalog, CatalogError, DomainError, Order,
    OrderLine, OrderService, OrderStatus, PaymentMethod, PlaceOrder, ProductService, StatusUpdate,
    StockReason, UnitOfWork,
};
use event_store::{CORRELATION_KEY, EventStore, InMemoryEventStore, Version};

struct Shop {
    store: InMemoryEventStore,
    products: Arc<ProductService<InMemoryEventStore>>,
    carts: CartService<InMemoryEventStore>,
    orders: OrderService<InMemoryEventStore>,
}

fn shop() -> Shop {
    let store = InMemoryEventStore::new();
    let products = Arc::new(ProductService::new(store.clone()));
    Shop {
        carts: CartService::new(store.clone(), products.clone()),
        orders: OrderService::new(store.clone()),
        products,
        store,
    }
}

fn address() -> Address {
    Address {
        street: "48 Greenhouse Way".into(),
        city: "Seattle".into(),
        state: "WA".into(),
        zip_code: "98101".into(),
        country: "US".into(),
    }
}

async fn list(shop: &Shop, name: &str, cents: i64, stock: u32) -> ProductId {
    shop.products
        .list_product(name, Money::from_cents(cents), stock, None)
        .await
        .unwrap()
        .id
}

async fn stock_of(shop: &Shop, id: ProductId) -> u32 {
    shop.products.get_product(id).await.unwrap().unwrap().stock
}

/// Places the user's cart as an order in one unit of work.
async fn place_from_cart(shop: &Shop, user_id: UserId) -> Result<Order, DomainError> {
    let owner = CartOwner::User(user_id);
    let view = shop.carts.get_cart(&owner).await?;

    let lines: Vec<OrderLine> = view
        .items
        .iter()
        .map(|line| OrderLine {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
        })
        .collect();
    let cmd = PlaceOrder::new(user_id, lines.clone(), address(), PaymentMethod::CashOnDelivery)
        .from_cart(view.cart_id)
        .with_coupon(view.applied_coupon.clone());
    let order_id = cmd.order_id;

    let mut uow = UnitOfWork::correlated(format!("checkout:{order_id}"));
    for line in &lines {
        uow.include(
            shop.products
                .stage_reservation(line.product_id, line.quantity, order_id)
                .await?,
        );
    }
    let placed = uow.include(shop.orders.stage_place(cmd).await?);
    uow.include(shop.carts.stage_clear_for_order(user_id, order_id).await?);
    uow.commit(&shop.store).await?;

    Ok(placed.aggregate)
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn cart_becomes_order_in_one_commit() {
        let shop = shop();
        let user_id = UserId::new();
        let owner = CartOwner::User(user_id);
        let fern = list(&shop, "Boston Fern", 2500, 10).await;
        let pothos = list(&shop, "Golden Pothos", 1250, 4).await;

        shop.carts.add_item(&owner, fern, 2).await.unwrap();
        shop.carts.add_item(&owner, pothos, 1).await.unwrap();
        shop.carts.apply_coupon(&owner, "save10").await.unwrap();

        let order = place_from_cart(&shop, user_id).await.unwrap();

        // 6250 subtotal, 500 tax, free shipping, 625 off
        assert_eq!(order.totals().subtotal.cents(), 6250);
        assert_eq!(order.totals().discount_amount.cents(), 625);
        assert_eq!(order.totals().total.cents(), 6125);
        assert_eq!(order.coupon().map(|c| c.code.as_str()), Some("SAVE10"));

        assert_eq!(stock_of(&shop, fern).await, 8);
        assert_eq!(stock_of(&shop, pothos).await, 3);
        assert!(shop.carts.get_cart(&owner).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn every_stream_shares_the_correlation_id() {
        let shop = shop();
        let user_id = UserId::new();
        let fern = list(&shop, "Boston Fern", 2500, 10).await;
        shop.carts
            .add_item(&CartOwner::User(user_id), fern, 1)
            .await
            .unwrap();

        let order = place_from_cart(&shop, user_id).await.unwrap();
        let order_id = order.id().unwrap();
        let expected = format!("checkout:{order_id}");

        let order_events = shop.store.get_events_for_aggregate(order_id).await.unwrap();
        let stock_events = shop
            .store
            .get_events_for_aggregate(fern.stream_id())
            .await
            .unwrap();

        assert_eq!(order_events[0].correlation_id(), Some(expected.as_str()));
        assert_eq!(
            stock_events.last().unwrap().correlation_id(),
            Some(expected.as_str())
        );
        assert!(order_events[0].metadata.contains_key(CORRELATION_KEY));
    }

    #[tokio::test]
    async fn short_stock_leaves_every_stream_untouched() {
        let shop = shop();
        let user_id = UserId::new();
        let owner = CartOwner::User(user_id);
        let fern = list(&shop, "Boston Fern", 2500, 10).await;
        let cactus = list(&shop, "Barrel Cactus", 900, 3).await;

        shop.carts.add_item(&owner, fern, 2).await.unwrap();
        shop.carts.add_item(&owner, cactus, 3).await.unwrap();
        shop.products
            .adjust_stock(cactus, -2, StockReason::Correction)
            .await
            .unwrap();

        let before = shop.store.event_count().await;
        let result = place_from_cart(&shop, user_id).await;

        assert!(matches!(
            result,
            Err(DomainError::Catalog(CatalogError::InsufficientStock { available: 1, .. }))
        ));
        assert_eq!(shop.store.event_count().await, before);
        assert_eq!(stock_of(&shop, fern).await, 10);
        assert_eq!(shop.carts.get_cart(&owner).await.unwrap().items.len(), 2);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn stale_reservation_fails_the_whole_unit() {
        let shop = shop();
        let fern = list(&shop, "Boston Fern", 2500, 5).await;

        let first = shop
            .products
            .stage_reservation(fern, 3, AggregateId::new())
            .await
            .unwrap();
        let second = shop
            .products
            .stage_reservation(fern, 3, AggregateId::new())
            .await
            .unwrap();

        let mut winner = UnitOfWork::new();
        winner.include(first);
        winner.commit(&shop.store).await.unwrap();

        let mut loser = UnitOfWork::new();
        loser.include(second);
        let err = loser.commit(&shop.store).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(stock_of(&shop, fern).await, 2);
    }

    #[tokio::test]
    async fn retry_after_conflict_sees_fresh_stock() {
        let shop = shop();
        let fern = list(&shop, "Boston Fern", 2500, 5).await;

        let stale = shop
            .products
            .stage_reservation(fern, 3, AggregateId::new())
            .await
            .unwrap();
        let fresh = shop
            .products
            .stage_reservation(fern, 3, AggregateId::new())
            .await
            .unwrap();
        shop.products.handler().commit(fresh).await.unwrap();
        assert!(shop.products.handler().commit(stale).await.is_err());

        let retry = shop
            .products
            .stage_reservation(fern, 3, AggregateId::new())
            .await;
        assert!(matches!(
            retry,
            Err(DomainError::Catalog(CatalogError::InsufficientStock { available: 2, .. }))
        ));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn order_is_rebuilt_from_its_stream() {
        let shop = shop();
        let user_id = UserId::new();
        let fern = list(&shop, "Boston Fern", 2500, 10).await;
        shop.carts
            .add_item(&CartOwner::User(user_id), fern, 1)
            .await
            .unwrap();
        let placed = place_from_cart(&shop, user_id).await.unwrap();
        let order_id = placed.id().unwrap();

        for to in [OrderStatus::Confirmed, OrderStatus::Processing] {
            let staged = shop
                .orders
                .stage_transition(order_id, StatusUpdate::to(to))
                .await
                .unwrap();
            shop.orders.handler().commit(staged).await.unwrap();
        }

        let order = shop.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.version(), Version::new(3));
        assert_eq!(order.totals(), placed.totals());
        assert_eq!(order.order_number(), placed.order_number());
    }

    #[tokio::test]
    async fn cancellation_returns_stock() {
        let shop = shop();
        let user_id = UserId::new();
        let fern = list(&shop, "Boston Fern", 2500, 10).await;
        shop.carts
            .add_item(&CartOwner::User(user_id), fern, 4)
            .await
            .unwrap();
        let order = place_from_cart(&shop, user_id).await.unwrap();
        let order_id = order.id().unwrap();
        assert_eq!(stock_of(&shop, fern).await, 6);

        let mut uow = UnitOfWork::correlated(format!("cancel:{order_id}"));
        let cancelled = uow.include(
            shop.orders
                .stage_customer_cancel(user_id, order_id, Some("gift fell through".into()))
                .await
                .unwrap(),
        );
        for line in cancelled.aggregate.lines() {
            uow.include(
                shop.products
                    .stage_release(line.product_id, line.quantity, order_id)
                    .await
                    .unwrap(),
            );
        }
        uow.commit(&shop.store).await.unwrap();

        assert_eq!(stock_of(&shop, fern).await, 10);
        let order = shop.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let again = shop
            .orders
            .stage_customer_cancel(user_id, order_id, None)
            .await;
        assert!(again.is_err());
    }
}
