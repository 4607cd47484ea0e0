use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{OrderId, PaymentMethodId, UserId, VariantId};
use storefront_payments::CreditCard;

use crate::address::Address;
use crate::state;
use crate::state_change::StateChangeRecord;

/// Order line: variant, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub variant_id: VariantId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub price: i64,
}

impl LineItem {
    pub fn amount(&self) -> i64 {
        self.quantity * self.price
    }
}

/// Proposed or committed shipment for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    /// Shipping cost in smallest currency unit; set by the shipping
    /// collaborator when rates are priced.
    pub cost: i64,
}

/// Payment lifecycle as far as checkout cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Checkout,
    Completed,
    Failed,
    Invalid,
}

/// A payment attempt against the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: i64,
    pub payment_method_id: Option<PaymentMethodId>,
    pub source: Option<CreditCard>,
    pub state: PaymentState,
    /// Request metadata captured when the shopper submitted the payment.
    pub client_ip: Option<String>,
}

impl Payment {
    pub fn is_valid(&self) -> bool {
        !matches!(self.state, PaymentState::Failed | PaymentState::Invalid)
    }
}

/// The order aggregate as seen by checkout: a mutable context object.
///
/// `state` is private on purpose; it is only one of the configured step names
/// or a terminal name, and only the transition pipeline moves it (via
/// [`Order::force_state`], which also backs test setup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    state: String,
    pub email: Option<String>,
    pub bill_address: Option<Address>,
    pub ship_address: Option<Address>,
    pub line_items: Vec<LineItem>,
    pub shipments: Vec<Shipment>,
    pub payments: Vec<Payment>,
    pub item_total: i64,
    pub shipment_total: i64,
    pub tax_total: i64,
    /// Promotion adjustments, stored as a negative amount.
    pub promo_total: i64,
    total: i64,
    /// Skip persisting the order's address back onto the account.
    pub temporary_address: bool,
    /// Skip saving the payment source as the account default on completion.
    pub temporary_payment_source: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    errors: Vec<String>,
    state_changes: Vec<StateChangeRecord>,
}

impl Order {
    /// Create a fresh order at cart initiation.
    pub fn new(id: OrderId) -> Self {
        Self {
            id,
            user_id: None,
            state: state::CART.to_string(),
            email: None,
            bill_address: None,
            ship_address: None,
            line_items: Vec::new(),
            shipments: Vec::new(),
            payments: Vec::new(),
            item_total: 0,
            shipment_total: 0,
            tax_total: 0,
            promo_total: 0,
            total: 0,
            temporary_address: false,
            temporary_payment_source: false,
            completed_at: None,
            canceled_at: None,
            errors: Vec::new(),
            state_changes: Vec::new(),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Assign the state directly, bypassing guards and hooks. Reserved for
    /// the transition pipeline and test setup.
    pub fn force_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    /// Recompute item/shipment totals and the grand total from current lines,
    /// shipments and charges.
    pub fn update_totals(&mut self) {
        self.item_total = self.line_items.iter().map(LineItem::amount).sum();
        self.shipment_total = self.shipments.iter().map(|s| s.cost).sum();
        self.total = self.item_total + self.shipment_total + self.tax_total + self.promo_total;
    }

    /// Whether a payment must exist before the order may complete.
    pub fn payment_required(&self) -> bool {
        self.total > 0
    }

    pub fn valid_payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.iter().filter(|p| p.is_valid())
    }

    pub fn has_valid_payment(&self) -> bool {
        self.valid_payments().next().is_some()
    }

    /// Payment sources attached through valid payments, reusable for later
    /// orders.
    pub fn valid_payment_sources(&self) -> Vec<&CreditCard> {
        self.valid_payments().filter_map(|p| p.source.as_ref()).collect()
    }

    pub fn is_canceled(&self) -> bool {
        self.state == state::CANCELED
    }

    /// Cancellation is allowed from any non-terminal state.
    pub fn allow_cancel(&self) -> bool {
        self.state != state::CANCELED && self.state != state::RETURNED
    }

    /// Clone a saved billing address onto the order unless one is already
    /// assigned or the saved one no longer validates.
    pub fn assign_default_bill_address(&mut self, saved: &Address) {
        if self.bill_address.is_none() && saved.is_valid() {
            self.bill_address = Some(saved.clone());
        }
    }

    pub fn assign_default_ship_address(&mut self, saved: &Address) {
        if self.ship_address.is_none() && saved.is_valid() {
            self.ship_address = Some(saved.clone());
        }
    }

    /// Whether the order's address should be written back to the account
    /// when leaving the address step.
    pub fn wants_address_persisted(&self) -> bool {
        !self.temporary_address && self.user_id.is_some() && self.bill_address.is_some()
    }

    /// Post-cancel bookkeeping.
    pub fn after_cancel(&mut self, at: DateTime<Utc>) {
        self.canceled_at = Some(at);
    }

    /// Post-resume bookkeeping.
    pub fn after_resume(&mut self) {
        self.canceled_at = None;
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn state_changes(&self) -> &[StateChangeRecord] {
        &self.state_changes
    }

    /// Append an audit entry. Records are never mutated after creation.
    pub fn record_state_change(&mut self, record: StateChangeRecord) {
        self.state_changes.push(record);
    }
}
