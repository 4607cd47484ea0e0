//! Collaborator contracts consumed by the transition pipeline.
//!
//! Persistence, inventory, tax, shipping, the payment gateway and account
//! storage are external subsystems; checkout only depends on these traits.
//! A collaborator failure during a before-hook is treated as an ordinary
//! hook abort of the transition, never as a crash.

use storefront_core::{DomainResult, PaymentSourceId, UserId, VariantId};
use storefront_orders::{Address, Order};
use storefront_payments::CreditCard;

/// Order load/save by id. Audit records travel with the order, so a save is
/// expected to persist state, totals and appended state changes atomically.
pub trait OrderRepository {
    fn load(&self, id: storefront_core::OrderId) -> DomainResult<Order>;
    fn save(&self, order: &Order) -> DomainResult<()>;
}

pub trait InventoryService {
    fn all_inventory_units_returned(&self, order: &Order) -> bool;
    fn discontinued_variants(&self, order: &Order) -> Vec<VariantId>;
    fn stock_available(&self, order: &Order) -> bool;
}

pub trait TaxService {
    /// Recompute tax charges, mutating the order's totals.
    fn compute_tax(&self, order: &mut Order) -> DomainResult<()>;
}

pub trait ShippingService {
    fn propose_shipments(&self, order: &mut Order) -> DomainResult<()>;
    fn available_rates(&self, order: &Order) -> bool;
    fn price_shipments(&self, order: &mut Order) -> DomainResult<()>;
    fn apply_free_shipping_promotions(&self, order: &mut Order) -> DomainResult<()>;
}

pub trait PaymentGateway {
    /// Capture/process the order's pending payments. `Ok(false)` means the
    /// gateway declined; the transition aborts either way.
    fn capture_payments(&self, order: &mut Order) -> DomainResult<bool>;
}

/// Addresses saved on a shopper's account.
#[derive(Debug, Clone, Default)]
pub struct SavedAddresses {
    pub bill: Option<Address>,
    pub ship: Option<Address>,
}

pub trait AccountService {
    fn saved_addresses(&self, user: UserId) -> SavedAddresses;
    fn persist_order_address(&self, user: UserId, order: &Order) -> DomainResult<()>;
    fn default_payment_source(&self, user: UserId) -> Option<CreditCard>;
    fn set_default_payment_source(
        &self,
        user: UserId,
        source: PaymentSourceId,
    ) -> DomainResult<()>;
}

/// Lookup of stored payment sources referenced by client payloads, either
/// through a user-saved-source id or a raw card id.
pub trait PaymentSourceStore {
    fn find_saved_source(&self, id: PaymentSourceId) -> Option<CreditCard>;
    fn find_card(&self, id: PaymentSourceId) -> Option<CreditCard>;
}

/// Bundle of collaborator references handed to the pipeline per call.
pub struct Services<'a> {
    pub repository: &'a dyn OrderRepository,
    pub inventory: &'a dyn InventoryService,
    pub tax: &'a dyn TaxService,
    pub shipping: &'a dyn ShippingService,
    pub gateway: &'a dyn PaymentGateway,
    pub accounts: &'a dyn AccountService,
    pub sources: &'a dyn PaymentSourceStore,
}
