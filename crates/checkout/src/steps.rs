use storefront_orders::{state, Order};

use crate::flow::CheckoutFlow;

/// Per-order step queries for presentation code and collaborators.
///
/// Guards are re-evaluated against the order on every query because they may
/// depend on order state (a zero-total order has no payment step today but
/// may gain one after a line is added).
pub struct StepRegistry<'a> {
    flow: &'a CheckoutFlow,
}

impl<'a> StepRegistry<'a> {
    pub fn new(flow: &'a CheckoutFlow) -> Self {
        Self { flow }
    }

    /// Ordered step names for this order, guard-filtered, with `complete`
    /// guaranteed present.
    pub fn steps_for(&self, order: &Order) -> Vec<String> {
        let mut steps: Vec<String> = self
            .flow
            .steps()
            .iter()
            .filter(|step| {
                step.guard
                    .as_ref()
                    .is_none_or(|guard| guard.evaluate(order))
            })
            .map(|step| step.name.clone())
            .collect();
        if !steps.iter().any(|s| s == state::COMPLETE) {
            steps.push(state::COMPLETE.to_string());
        }
        steps
    }

    pub fn has_step(&self, order: &Order, name: &str) -> bool {
        !name.is_empty() && self.steps_for(order).iter().any(|s| s == name)
    }

    /// Position of `name` within this order's steps; absent names index as 0.
    pub fn index_of(&self, order: &Order, name: &str) -> usize {
        self.steps_for(order)
            .iter()
            .position(|s| s == name)
            .unwrap_or(0)
    }

    /// True iff the step exists for this order and lies strictly before the
    /// order's current state.
    pub fn passed_step(&self, order: &Order, name: &str) -> bool {
        self.has_step(order, name)
            && self.index_of(order, name) < self.index_of(order, order.state())
    }

    /// True iff both the current state and the target are steps for this
    /// order and the target lies strictly ahead.
    pub fn can_advance_to(&self, order: &Order, name: &str) -> bool {
        if !self.has_step(order, order.state()) || !self.has_step(order, name) {
            return false;
        }
        self.index_of(order, name) > self.index_of(order, order.state())
    }
}
