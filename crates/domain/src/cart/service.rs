use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{AggregateId, ProductId, UserId};
use event_store::EventStore;
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::catalog::{Catalog, CatalogError};
use crate::command::{CommandHandler, Staged};
use crate::coupon::{AppliedCoupon, CouponResolver};
use crate::error::DomainError;
use crate::pricing::{PricingPolicy, Totals};
use crate::unit_of_work::UnitOfWork;

use super::{Cart, CartEvent, CartLine, CartOwner, CartPolicy};

/// A cart together with its derived totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub cart_id: AggregateId,
    pub owner: Option<CartOwner>,
    pub items: Vec<CartLine>,
    pub applied_coupon: Option<AppliedCoupon>,
    pub totals: Totals,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CartView {
    pub fn of(cart_id: AggregateId, cart: &Cart, pricing: &PricingPolicy) -> Self {
        Self {
            cart_id,
            owner: cart.owner().cloned(),
            items: cart.lines().to_vec(),
            applied_coupon: cart.coupon().cloned(),
            totals: cart.totals(pricing),
            expires_at: cart.expires_at(),
        }
    }
}

/// Cart operations for users and guest sessions.
///
/// Every mutating call opens the owner's cart first if it does not exist
/// yet, or has expired, or was deactivated.
pub struct CartService<S: EventStore> {
    handler: CommandHandler<S, Cart>,
    catalog: Arc<dyn Catalog>,
    coupons: CouponResolver,
    pricing: PricingPolicy,
    policy: CartPolicy,
}

impl<S: EventStore> CartService<S> {
    pub fn new(store: S, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            catalog,
            coupons: CouponResolver::default(),
            pricing: PricingPolicy::default(),
            policy: CartPolicy::default(),
        }
    }

    pub fn with_coupons(mut self, coupons: CouponResolver) -> Self {
        self.coupons = coupons;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_policy(mut self, policy: CartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Returns the owner's cart, opening it on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartView, DomainError> {
        self.mutate(owner, |_| Ok(vec![])).await
    }

    /// Loads the owner's cart without opening it.
    pub async fn find_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, DomainError> {
        self.handler.load_existing(owner.cart_id()).await
    }

    /// Adds `quantity` units of a product at its current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, DomainError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        if !product.active {
            return Err(CatalogError::ProductUnavailable {
                product_id,
                name: product.name,
            }
            .into());
        }
        if product.stock == 0 {
            return Err(CatalogError::InsufficientStock {
                product_id,
                name: product.name,
                requested: u64::from(quantity),
                available: 0,
            }
            .into());
        }

        let line = CartLine {
            product_id,
            name: product.name,
            unit_price: product.price,
            quantity,
            max_quantity: product.stock,
        };
        let policy = self.policy;
        self.mutate(owner, |cart| Ok(cart.add_item(line, &policy)?))
            .await
    }

    /// Sets a line's quantity; zero or less removes it.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, DomainError> {
        let policy = self.policy;
        self.mutate(owner, |cart| {
            Ok(cart.update_quantity(product_id, quantity, &policy)?)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
    ) -> Result<CartView, DomainError> {
        self.mutate(owner, |cart| Ok(cart.remove_item(product_id)?))
            .await
    }

    /// Resolves `code` against the cart's current subtotal and applies it.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, owner: &CartOwner, code: &str) -> Result<CartView, DomainError> {
        let coupons = &self.coupons;
        let pricing = &self.pricing;
        self.mutate(owner, |cart| {
            let subtotal = cart.totals(pricing).subtotal;
            let coupon = coupons.resolve(code, subtotal)?;
            Ok(cart.apply_coupon(coupon)?)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_coupon(&self, owner: &CartOwner) -> Result<CartView, DomainError> {
        self.mutate(owner, |cart| Ok(cart.remove_coupon()?)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, owner: &CartOwner) -> Result<CartView, DomainError> {
        self.mutate(owner, |cart| Ok(cart.clear(None)?)).await
    }

    /// Moves a guest session's cart into the user's cart.
    ///
    /// With no user cart yet, the guest lines and coupon are adopted as they
    /// are. Otherwise quantities add up per product. The guest cart is
    /// deactivated in the same commit.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_cart(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<CartView, DomainError> {
        let now = Utc::now();
        let guest_owner = CartOwner::Guest(session_id.to_string());
        let user_owner = CartOwner::User(user_id);
        let guest_id = guest_owner.cart_id();
        let user_cart_id = user_owner.cart_id();

        let guest = match self.handler.load_existing(guest_id).await? {
            Some(guest) if guest.is_usable(now) && !guest.is_empty() => guest,
            _ => return self.get_cart(&user_owner).await,
        };

        let user_cart = self.handler.load(user_cart_id).await?;
        let policy = self.policy;
        let user_events = user_cart.open_then(user_cart_id, &user_owner, &policy, now, |cart| {
            let mut events = cart.merge_lines(guest.lines(), &policy)?;
            if let (None, Some(coupon)) = (cart.coupon(), guest.coupon()) {
                events.extend(cart.apply_coupon(coupon.clone())?);
            }
            Ok::<_, DomainError>(events)
        })?;
        let guest_events = guest.deactivate(Some(user_cart_id))?;

        let mut uow = UnitOfWork::correlated(format!("cart-merge:{guest_id}"));
        let merged = uow.include(self.handler.decide(user_cart_id, user_cart, user_events)?);
        uow.include(self.handler.decide(guest_id, guest, guest_events)?);
        uow.commit(self.handler.store()).await?;

        tracing::info!(%user_id, %guest_id, items = merged.aggregate.lines().len(), "guest cart merged");
        Ok(CartView::of(user_cart_id, &merged.aggregate, &self.pricing))
    }

    /// Stages emptying a user's cart after `order_id` was placed from it.
    ///
    /// The cart must have been opened before.
    pub async fn stage_clear_for_order(
        &self,
        user_id: UserId,
        order_id: AggregateId,
    ) -> Result<Staged<Cart>, DomainError> {
        let cart_id = CartOwner::User(user_id).cart_id();
        let cart = self
            .handler
            .load_existing(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;
        let events = cart.clear(Some(order_id))?;
        self.handler.decide(cart_id, cart, events)
    }

    async fn mutate<F>(&self, owner: &CartOwner, command_fn: F) -> Result<CartView, DomainError>
    where
        F: FnOnce(&Cart) -> Result<Vec<CartEvent>, DomainError>,
    {
        let cart_id = owner.cart_id();
        let cart = self.handler.load(cart_id).await?;
        let events = cart.open_then(cart_id, owner, &self.policy, Utc::now(), command_fn)?;

        let result = self
            .handler
            .commit(self.handler.decide(cart_id, cart, events)?)
            .await?;
        if !result.events.is_empty() {
            tracing::debug!(%cart_id, version = %result.aggregate.version(), "cart updated");
        }
        Ok(CartView::of(cart_id, &result.aggregate, &self.pricing))
    }
}
