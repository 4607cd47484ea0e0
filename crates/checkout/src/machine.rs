use chrono::Utc;
use tracing::{debug, warn};

use storefront_core::{DomainError, DomainResult};
use storefront_orders::{state, Order, StateChangeRecord};

use crate::flow::CheckoutFlow;
use crate::services::Services;
use crate::steps::StepRegistry;

/// Events the checkout state machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Walk the derived transition table one step forward.
    Next,
    /// Any state to `canceled`, if cancellation is allowed.
    Cancel,
    /// `complete`/`awaiting_return`/`canceled` to `returned`, once all
    /// inventory units are back.
    Return,
    /// `canceled` to `resumed`.
    Resume,
    /// Any state to `awaiting_return`.
    AuthorizeReturn,
}

impl CheckoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::Next => "next",
            CheckoutEvent::Cancel => "cancel",
            CheckoutEvent::Return => "return",
            CheckoutEvent::Resume => "resume",
            CheckoutEvent::AuthorizeReturn => "authorize_return",
        }
    }
}

/// Result of a committed trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Transitioned { from: String, to: String },
    /// No rule matched (or an event guard vetoed). The order is untouched;
    /// this is a report, not a failure.
    NotAdvanceable,
}

/// The state-machine engine: one authoritative instance per flow version.
///
/// A trigger either commits fully (state assigned, audit record appended,
/// order saved) or leaves the order's persisted state untouched. Hook vetoes
/// surface both as a message on the order's error list and as the returned
/// `Err`; callers correct the order and retry.
pub struct TransitionPipeline {
    flow: CheckoutFlow,
}

impl TransitionPipeline {
    pub fn new(flow: CheckoutFlow) -> Self {
        Self { flow }
    }

    pub fn flow(&self) -> &CheckoutFlow {
        &self.flow
    }

    pub fn registry(&self) -> StepRegistry<'_> {
        StepRegistry::new(&self.flow)
    }

    /// Drive one event against the order.
    pub fn trigger(
        &self,
        event: CheckoutEvent,
        order: &mut Order,
        services: &Services<'_>,
    ) -> DomainResult<Outcome> {
        let Some(to) = self.target_for(event, order, services) else {
            debug!(order_id = %order.id, state = order.state(), event = event.name(),
                "no matching transition");
            return Ok(Outcome::NotAdvanceable);
        };
        let from = order.state().to_string();

        if let Err(err) = self.run_before_hooks(&from, &to, order, services) {
            warn!(order_id = %order.id, from = %from, to = %to, error = %err,
                "checkout transition aborted");
            return Err(err);
        }

        order.force_state(to.clone());
        let record = StateChangeRecord {
            previous_state: from.clone(),
            next_state: to.clone(),
            name: event.name().to_string(),
            user_id: order.user_id,
            created_at: Utc::now(),
        };
        order.record_state_change(record);
        self.run_after_hooks(&from, &to, order, services)?;

        debug!(order_id = %order.id, from = %from, to = %to, event = event.name(),
            "checkout transition committed");
        Ok(Outcome::Transitioned { from, to })
    }

    /// Resolve the target state for an event, or `None` when the event does
    /// not apply (no table match, event guard vetoed).
    fn target_for(
        &self,
        event: CheckoutEvent,
        order: &Order,
        services: &Services<'_>,
    ) -> Option<String> {
        match event {
            CheckoutEvent::Next => self
                .flow
                .transitions()
                .iter()
                // First rule in insertion order wins.
                .find(|rule| {
                    rule.from == order.state()
                        && rule.guard.as_ref().is_none_or(|g| g.evaluate(order))
                })
                .map(|rule| rule.to.clone()),
            CheckoutEvent::Cancel => order
                .allow_cancel()
                .then(|| state::CANCELED.to_string()),
            CheckoutEvent::Return => {
                let from_allowed = [state::COMPLETE, state::AWAITING_RETURN, state::CANCELED]
                    .contains(&order.state());
                (from_allowed && services.inventory.all_inventory_units_returned(order))
                    .then(|| state::RETURNED.to_string())
            }
            CheckoutEvent::Resume => order
                .is_canceled()
                .then(|| state::RESUMED.to_string()),
            CheckoutEvent::AuthorizeReturn => Some(state::AWAITING_RETURN.to_string()),
        }
    }

    /// The ordered before-hook chain. Any veto aborts the transition: no
    /// state change, no audit record, error surfaced on the order.
    fn run_before_hooks(
        &self,
        from: &str,
        to: &str,
        order: &mut Order,
        services: &Services<'_>,
    ) -> DomainResult<()> {
        let address_configured = self.flow.has_step(state::ADDRESS);
        let delivery_configured = self.flow.has_step(state::DELIVERY);
        let payment_configured = self.flow.has_step(state::PAYMENT);

        if from == state::CART && order.line_items.is_empty() {
            return Err(self.abort(order, "there are no items for this order"));
        }

        if address_configured && from == state::ADDRESS {
            order.update_totals();
            let res = services.tax.compute_tax(order);
            self.collab(order, res)?;
        }

        if address_configured && to == state::ADDRESS {
            if let Some(user) = order.user_id {
                let saved = services.accounts.saved_addresses(user);
                if let Some(bill) = &saved.bill {
                    order.assign_default_bill_address(bill);
                }
                // Skip the ship address when this order has no delivery step,
                // so an address that will never ship is never validated.
                if self.registry().has_step(order, state::DELIVERY) {
                    if let Some(ship) = &saved.ship {
                        order.assign_default_ship_address(ship);
                    }
                }
            }
        }

        if address_configured && from == state::ADDRESS && order.wants_address_persisted() {
            if let Some(user) = order.user_id {
                let res = services.accounts.persist_order_address(user, order);
                self.collab(order, res)?;
            }
        }

        if delivery_configured && to == state::DELIVERY {
            let res = services.shipping.propose_shipments(order);
            self.collab(order, res)?;
            if !services.shipping.available_rates(order) {
                return Err(self.abort(order, "cannot ship to the provided address"));
            }
            let res = services.shipping.price_shipments(order);
            self.collab(order, res)?;
        }

        if delivery_configured && from == state::DELIVERY {
            let res = services.shipping.apply_free_shipping_promotions(order);
            self.collab(order, res)?;
        }

        if payment_configured && to == state::PAYMENT {
            let res = services.shipping.price_shipments(order);
            self.collab(order, res)?;
            let res = services.tax.compute_tax(order);
            self.collab(order, res)?;
        }

        if payment_configured && to == state::COMPLETE {
            if order.payment_required() && !order.has_valid_payment() {
                return Err(self.abort(order, "no payment found"));
            } else if order.payment_required() {
                match services.gateway.capture_payments(order) {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(self.abort(order, "payment could not be processed"));
                    }
                    Err(err) => {
                        order.add_error(err.to_string());
                        return Err(err);
                    }
                }
            }
        }

        if to == state::RESUMED || to == state::COMPLETE {
            if !services.inventory.discontinued_variants(order).is_empty() {
                return Err(self.abort(order, "line items include a discontinued variant"));
            }
            if !services.inventory.stock_available(order) {
                return Err(self.abort(order, "insufficient stock for line items"));
            }
        }

        Ok(())
    }

    /// Bookkeeping after a committed transition, ending in the repository
    /// save. These never veto; the state change has already happened.
    fn run_after_hooks(
        &self,
        from: &str,
        to: &str,
        order: &mut Order,
        services: &Services<'_>,
    ) -> DomainResult<()> {
        let now = Utc::now();

        if to == state::COMPLETE {
            order.completed_at = Some(now);
            if self.flow.has_step(state::PAYMENT) {
                self.persist_user_payment_source(order, services);
            }
        }
        if to == state::RESUMED {
            order.after_resume();
        }
        if to == state::CANCELED {
            order.after_cancel(now);
        }
        if from != state::CART && to != state::CONFIRM && to != state::COMPLETE {
            order.update_totals();
        }

        services.repository.save(order)
    }

    /// Save the shopper's payment source as their account default, unless
    /// they flagged it as one-off or no source survived checkout.
    fn persist_user_payment_source(&self, order: &Order, services: &Services<'_>) {
        if order.temporary_payment_source {
            return;
        }
        let Some(user) = order.user_id else { return };
        let Some(source_id) = order.valid_payment_sources().first().map(|c| c.id) else {
            return;
        };
        if let Err(err) = services.accounts.set_default_payment_source(user, source_id) {
            warn!(order_id = %order.id, error = %err, "failed to save default payment source");
        }
    }

    fn abort(&self, order: &mut Order, message: &str) -> DomainError {
        order.add_error(message);
        DomainError::validation(message)
    }

    /// Collaborator failures abort the transition like any other hook veto.
    fn collab(&self, order: &mut Order, result: DomainResult<()>) -> DomainResult<()> {
        if let Err(err) = result {
            order.add_error(err.to_string());
            return Err(err);
        }
        Ok(())
    }
}
