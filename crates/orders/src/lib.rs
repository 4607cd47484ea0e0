//! Order domain module.
//!
//! The order is the mutable context object the checkout state machine works
//! on: addresses, line items, shipments, payments and running totals. State
//! itself only ever changes through the checkout transition pipeline.

pub mod address;
pub mod order;
pub mod state;
pub mod state_change;

pub use address::Address;
pub use order::{LineItem, Order, Payment, PaymentState, Shipment};
pub use state_change::StateChangeRecord;
