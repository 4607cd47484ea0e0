use std::sync::Arc;

use storefront_orders::Order;

/// Predicate over order state gating a step's presence or a transition's
/// legality.
///
/// Guards are evaluated at query time, not configuration time, because they
/// may depend on order state. The named kinds keep the common guards
/// inspectable (test tooling can enumerate them); [`Guard::Predicate`] is the
/// generic escape hatch for store-specific conditions.
#[derive(Clone)]
pub enum Guard {
    /// Order total is positive, so a payment step applies.
    PaymentRequired,
    /// Arbitrary predicate over an order snapshot.
    Predicate(Arc<dyn Fn(&Order) -> bool + Send + Sync>),
}

impl Guard {
    pub fn from_fn(f: impl Fn(&Order) -> bool + Send + Sync + 'static) -> Self {
        Guard::Predicate(Arc::new(f))
    }

    pub fn evaluate(&self, order: &Order) -> bool {
        match self {
            Guard::PaymentRequired => order.payment_required(),
            Guard::Predicate(f) => f(order),
        }
    }
}

impl core::fmt::Debug for Guard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Guard::PaymentRequired => f.write_str("PaymentRequired"),
            Guard::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
