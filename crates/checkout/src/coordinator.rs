//! Checkout coordinator: order placement, cancellation and payment setup.

use std::sync::Arc;
use std::time::Instant;

use common::{AggregateId, UserId};
use domain::{
    Aggregate, CartOwner, CartPolicy, CartService, Catalog, CouponResolver, Order, OrderLine,
    OrderService, OrderStatus, PaymentStatus, PlaceOrder, PricingPolicy, Product, ProductService,
    Staged, StatusUpdate, StockStatus, UnitOfWork, compute_totals,
};
use event_store::EventStore;

use crate::error::{CheckoutError, Result};
use crate::request::{CheckoutRequest, RequestedLine};
use crate::services::{Notifier, OrderConfirmation, PaymentProcessor, PaymentRequest};

/// Pricing, cart and payment settings shared by every checkout.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub pricing: PricingPolicy,
    pub cart_policy: CartPolicy,
    pub coupons: CouponResolver,
    /// ISO currency code sent to the payment processor.
    pub currency: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            cart_policy: CartPolicy::default(),
            coupons: CouponResolver::default(),
            currency: "usd".to_string(),
        }
    }
}

/// Orchestrates checkout and the order lifecycle steps that move stock.
///
/// Every operation that touches more than one stream stages its changes and
/// commits them as one unit, so a stale product version or a concurrent
/// checkout of the same cart fails the whole operation with
/// [`CheckoutError::Conflict`] and leaves nothing half-written.
pub struct CheckoutCoordinator<S, P, N>
where
    S: EventStore,
    P: PaymentProcessor,
    N: Notifier,
{
    store: S,
    products: Arc<ProductService<S>>,
    carts: CartService<S>,
    orders: OrderService<S>,
    config: CheckoutConfig,
    payment: P,
    notifier: Arc<N>,
}

impl<S, P, N> CheckoutCoordinator<S, P, N>
where
    S: EventStore + Clone + 'static,
    P: PaymentProcessor,
    N: Notifier + 'static,
{
    pub fn new(store: S, payment: P, notifier: N) -> Self {
        Self::with_config(store, payment, notifier, CheckoutConfig::default())
    }

    pub fn with_config(store: S, payment: P, notifier: N, config: CheckoutConfig) -> Self {
        let products = Arc::new(ProductService::new(store.clone()));
        let carts = CartService::new(store.clone(), products.clone())
            .with_coupons(config.coupons.clone())
            .with_pricing(config.pricing)
            .with_policy(config.cart_policy);
        let orders = OrderService::new(store.clone()).with_pricing(config.pricing);

        Self {
            store,
            products,
            carts,
            orders,
            config,
            payment,
            notifier: Arc::new(notifier),
        }
    }

    pub fn products(&self) -> &ProductService<S> {
        &self.products
    }

    pub fn carts(&self) -> &CartService<S> {
        &self.carts
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Places an order for `user_id`.
    ///
    /// Stock for every line, the new order and the emptied cart are written
    /// in one commit. A payment intent is created afterwards for methods that
    /// need one; if that fails the order stays pending and the error is
    /// [`CheckoutError::PaymentSetupFailed`].
    #[tracing::instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn place_order(&self, user_id: UserId, request: CheckoutRequest) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_place_order(user_id, request).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("checkout_orders_placed_total").increment(1);
                tracing::info!(
                    order_id = ?order.id(),
                    total = %order.totals().total,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_failures_total", "reason" => e.reason()).increment(1);
                tracing::warn!(%user_id, error = %e, "checkout failed");
            }
        }
        result
    }

    async fn try_place_order(&self, user_id: UserId, request: CheckoutRequest) -> Result<Order> {
        request.validate(&self.config.cart_policy)?;

        let owner = CartOwner::User(user_id);
        let cart = self
            .carts
            .find_cart(&owner)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Cart", user_id))?;

        let from_cart = request.lines.is_empty();
        let requested: Vec<RequestedLine> = if from_cart {
            cart.lines()
                .iter()
                .map(|line| RequestedLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect()
        } else {
            request.lines.clone()
        };
        if requested.is_empty() {
            return Err(CheckoutError::validation("there are no items to check out"));
        }

        let lines = self.price_lines(&requested).await?;
        // A cart checkout keeps the cart's coupon unless the request names one.
        let code = match request.coupon_code.as_deref() {
            Some(code) => Some(code),
            None if from_cart => cart.coupon().map(|applied| applied.code.as_str()),
            None => None,
        };
        let coupon = match code {
            Some(code) => {
                let subtotal = compute_totals(&lines, None, &self.config.pricing).subtotal;
                Some(self.config.coupons.resolve(code, subtotal)?)
            }
            None => None,
        };

        let cmd = PlaceOrder::new(
            user_id,
            lines,
            request.shipping_address,
            request.payment_method,
        )
        .from_cart(owner.cart_id())
        .with_coupon(coupon)
        .with_billing_address(request.billing_address)
        .with_notes(request.notes);
        let order_id = cmd.order_id;

        let mut uow = UnitOfWork::correlated(format!("checkout:{order_id}"));
        let mut reserved = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            let staged = self
                .products
                .stage_reservation(line.product_id, line.quantity, order_id)
                .await?;
            reserved.push(uow.include(staged));
        }
        let placed = uow.include(self.orders.stage_place(cmd).await?);
        uow.include(self.carts.stage_clear_for_order(user_id, order_id).await?);
        uow.commit(&self.store).await?;

        for product in reserved.iter().map(|r| &r.aggregate) {
            self.after_stock_change(product).await;
        }

        let order = placed.aggregate;
        self.notify(&order);

        if order.needs_payment_setup() {
            return self.setup_payment(order_id, user_id, &order).await;
        }
        Ok(order)
    }

    /// Prices each requested line from the live catalog. Fails on the first
    /// missing, inactive or short product, before anything is staged.
    async fn price_lines(&self, requested: &[RequestedLine]) -> Result<Vec<OrderLine>> {
        let mut lines = Vec::with_capacity(requested.len());

        for line in requested {
            let product = self
                .products
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::not_found("Product", line.product_id))?;

            if !product.active {
                return Err(CheckoutError::ProductUnavailable {
                    product_id: product.id,
                    name: product.name,
                });
            }
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                    requested: u64::from(line.quantity),
                    available: product.stock,
                });
            }

            lines.push(OrderLine {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
            });
        }

        Ok(lines)
    }

    /// Cancels an order on behalf of its owner and returns its stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: AggregateId,
        reason: Option<String>,
    ) -> Result<Order> {
        let staged = self
            .orders
            .stage_customer_cancel(user_id, order_id, reason)
            .await?;
        self.commit_status_change(order_id, staged).await
    }

    /// Administrative status change. Cancelling returns stock.
    #[tracing::instrument(skip(self))]
    pub async fn transition_order(
        &self,
        order_id: AggregateId,
        update: StatusUpdate,
    ) -> Result<Order> {
        let staged = self.orders.stage_transition(order_id, update).await?;
        self.commit_status_change(order_id, staged).await
    }

    /// Tries again to create the payment intent for a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn retry_payment_setup(
        &self,
        user_id: UserId,
        order_id: AggregateId,
    ) -> Result<Order> {
        let order = self.orders.get_order_for_user(user_id, order_id).await?;
        if !order.needs_payment_setup() {
            return Err(CheckoutError::InvalidState(format!(
                "order {order_id} does not need payment setup"
            )));
        }
        self.setup_payment(order_id, user_id, &order).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_payment_status(
        &self,
        order_id: AggregateId,
        status: PaymentStatus,
    ) -> Result<Order> {
        let result = self.orders.record_payment_status(order_id, status).await?;
        Ok(result.aggregate)
    }

    async fn commit_status_change(
        &self,
        order_id: AggregateId,
        staged: Staged<Order>,
    ) -> Result<Order> {
        let restock = !staged.is_empty() && staged.aggregate.status() == OrderStatus::Cancelled;
        let lines = if restock {
            staged.aggregate.lines().to_vec()
        } else {
            Vec::new()
        };

        let mut uow = UnitOfWork::correlated(format!("order-status:{order_id}"));
        let result = uow.include(staged);
        let mut released = Vec::with_capacity(lines.len());
        for line in &lines {
            let staged = self
                .products
                .stage_release(line.product_id, line.quantity, order_id)
                .await?;
            released.push(uow.include(staged));
        }
        uow.commit(&self.store).await?;

        if restock {
            let units: u64 = lines.iter().map(|line| u64::from(line.quantity)).sum();
            metrics::counter!("orders_cancelled_total").increment(1);
            metrics::counter!("stock_restored_units_total").increment(units);
            tracing::info!(%order_id, units, "order cancelled, stock restored");

            for product in released.iter().map(|r| &r.aggregate) {
                self.after_stock_change(product).await;
            }
        } else {
            tracing::info!(%order_id, status = %result.aggregate.status(), "order status changed");
        }

        Ok(result.aggregate)
    }

    async fn setup_payment(
        &self,
        order_id: AggregateId,
        user_id: UserId,
        order: &Order,
    ) -> Result<Order> {
        let order_number = order
            .order_number()
            .map(|n| n.to_string())
            .unwrap_or_default();
        let request = PaymentRequest::for_order(
            order_id,
            &order_number,
            user_id,
            order.totals().total.cents(),
            &self.config.currency,
        );

        match self.payment.create_payment_intent(request).await {
            Ok(intent) => {
                let result = self.orders.record_payment_intent(order_id, intent).await?;
                tracing::info!(%order_id, "payment intent created");
                Ok(result.aggregate)
            }
            Err(e) => {
                let reason = e.to_string();
                metrics::counter!("payment_setup_failures_total").increment(1);
                tracing::warn!(%order_id, error = %reason, "payment setup failed, order left pending");
                self.orders
                    .record_payment_setup_failure(order_id, &reason)
                    .await?;
                Err(CheckoutError::PaymentSetupFailed { order_id, reason })
            }
        }
    }

    /// Snapshots products that crossed their interval and flags low stock.
    /// Neither affects the already-committed outcome.
    async fn after_stock_change(&self, product: &Product) {
        let Some(stream_id) = product.id() else {
            return;
        };

        if let Err(e) = self
            .products
            .handler()
            .snapshot_if_due(stream_id, product)
            .await
        {
            tracing::warn!(%stream_id, error = %e, "product snapshot failed");
        }

        match product.stock_status() {
            StockStatus::OutOfStock => {
                tracing::warn!(product = %product.name(), "product out of stock")
            }
            StockStatus::LowStock => {
                tracing::info!(product = %product.name(), stock = product.stock(), "product stock low")
            }
            StockStatus::InStock => {}
        }
    }

    /// Sends the confirmation in the background. Failures are only logged.
    fn notify(&self, order: &Order) {
        let Some(confirmation) = OrderConfirmation::of(order) else {
            return;
        };
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            if let Err(e) = notifier.send_order_confirmation(&confirmation).await {
                tracing::warn!(
                    order_id = %confirmation.order_id,
                    error = %e,
                    "order confirmation not sent"
                );
            }
        });
    }
}
