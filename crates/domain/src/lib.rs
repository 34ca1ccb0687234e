//! Domain layer for the nursery storefront.
//!
//! Three event-sourced aggregates live here:
//! - [`Product`]: price, stock and availability
//! - [`Cart`]: per-owner shopping cart with an optional coupon
//! - [`Order`]: an immutable set of priced lines with fulfilment and payment status
//!
//! plus the pure pricing engine and coupon resolver they share. Changes that
//! span aggregates are staged with [`CommandHandler::stage`] and written
//! together through a [`UnitOfWork`].

pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod command;
pub mod coupon;
pub mod error;
pub mod order;
pub mod pricing;
pub mod unit_of_work;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use cart::{Cart, CartError, CartEvent, CartLine, CartOwner, CartPolicy, CartService, CartView};
pub use catalog::{
    Catalog, CatalogError, Product, ProductEvent, ProductService, ProductSnapshot, StockReason,
    StockStatus,
};
pub use command::{CommandHandler, CommandResult, Staged};
pub use coupon::{AppliedCoupon, CouponBook, CouponError, CouponResolver, DiscountRule, StaticCouponBook};
pub use error::DomainError;
pub use order::{
    Address, Order, OrderError, OrderEvent, OrderLine, OrderNumber, OrderService, OrderStatus,
    PaymentIntentRef, PaymentMethod, PaymentStatus, PlaceOrder, StatusUpdate,
};
pub use pricing::{PricedLine, PricingPolicy, Totals, compute_totals};
pub use unit_of_work::UnitOfWork;
