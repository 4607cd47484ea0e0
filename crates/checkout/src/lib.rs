//! Checkout state machine and its transition pipeline.
//!
//! The flow of steps an order walks through is built once at configuration
//! time ([`flow::FlowBuilder`] → [`flow::CheckoutFlow`]) and is immutable
//! afterwards; [`machine::TransitionPipeline`] drives orders through it,
//! running guards and the before/after hook chain around every transition.
//! [`update::OrderUpdater`] maps a sanitized client payload onto exactly one
//! pending transition, and [`steps::StepRegistry`] answers per-order step
//! queries for presentation code.

pub mod flow;
pub mod guard;
pub mod machine;
pub mod services;
pub mod steps;
pub mod update;

#[cfg(test)]
pub(crate) mod test_support;

pub use flow::{CheckoutFlow, CheckoutStep, FlowBuilder, InsertPosition, TransitionRule};
pub use guard::Guard;
pub use machine::{CheckoutEvent, Outcome, TransitionPipeline};
pub use services::{
    AccountService, InventoryService, OrderRepository, PaymentGateway, PaymentSourceStore,
    SavedAddresses, Services, ShippingService, TaxService,
};
pub use steps::StepRegistry;
pub use update::{CardParams, CheckoutUpdate, OrderUpdater, PaymentAttributes, RequestContext};
