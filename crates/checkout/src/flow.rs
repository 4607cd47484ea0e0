use storefront_orders::state;

use crate::guard::Guard;

/// A named stage in the checkout flow, with its optional presence guard.
#[derive(Debug, Clone)]
pub struct CheckoutStep {
    pub name: String,
    pub guard: Option<Guard>,
}

/// A legal `next`-event edge derived from the step sequence.
#[derive(Debug, Clone)]
pub struct TransitionRule {
    pub from: String,
    pub to: String,
    pub guard: Option<Guard>,
}

/// Anchor for [`FlowBuilder::insert_step`].
#[derive(Debug, Clone)]
pub enum InsertPosition {
    Before(String),
    After(String),
    /// After the last configured step (the default anchor).
    AtEnd,
}

/// Configuration-time builder for a checkout flow.
///
/// Steps are appended in order; each new step receives transitions from the
/// current predecessor set. A guarded step joins the predecessor set (later
/// steps stay reachable from the unguarded path around it), while an
/// unguarded step replaces the set outright. Explicitly removed transitions
/// persist across `insert_step`/`remove_step` rebuilds.
///
/// The builder is pure: every call consumes and returns a value, and
/// [`FlowBuilder::build`] produces an immutable [`CheckoutFlow`].
#[derive(Debug, Clone)]
pub struct FlowBuilder {
    steps: Vec<CheckoutStep>,
    transitions: Vec<TransitionRule>,
    previous_states: Vec<String>,
    removed: Vec<(String, String)>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            transitions: Vec::new(),
            previous_states: vec![state::CART.to_string()],
            removed: Vec::new(),
        }
    }

    /// The stock flow: address, delivery, guarded payment, confirm.
    pub fn default_flow() -> Self {
        Self::new()
            .add_step(state::ADDRESS, None)
            .add_step(state::DELIVERY, None)
            .add_step(state::PAYMENT, Some(Guard::PaymentRequired))
            .add_step(state::CONFIRM, None)
    }

    /// Clear everything, including the removed-transition exclusions.
    pub fn reset(self) -> Self {
        Self::new()
    }

    /// Append a step and derive its incoming transitions from the current
    /// predecessor set.
    pub fn add_step(mut self, name: &str, guard: Option<Guard>) -> Self {
        for previous in &self.previous_states {
            self.transitions.push(TransitionRule {
                from: previous.clone(),
                to: name.to_string(),
                guard: guard.clone(),
            });
        }
        if guard.is_some() {
            // A guarded step is an additional reachable predecessor; it does
            // not foreclose the unguarded path.
            self.previous_states.push(name.to_string());
        } else {
            self.previous_states = vec![name.to_string()];
        }
        self.steps.push(CheckoutStep {
            name: name.to_string(),
            guard,
        });
        self
    }

    /// Splice a step next to an anchor by replaying the whole flow, then
    /// re-applying the removed-transition exclusions.
    ///
    /// Inserting into an empty flow adds the step as the first one instead
    /// of dropping it, whatever the requested position.
    pub fn insert_step(self, name: &str, guard: Option<Guard>, position: InsertPosition) -> Self {
        let (before, after) = match position {
            InsertPosition::Before(anchor) => (Some(anchor), None),
            InsertPosition::After(anchor) => (None, Some(anchor)),
            InsertPosition::AtEnd => (None, self.steps.last().map(|s| s.name.clone())),
        };

        let mut rebuilt = Self::new();
        if self.steps.is_empty() {
            rebuilt = rebuilt.add_step(name, guard.clone());
        }
        for step in &self.steps {
            if before.as_deref() == Some(step.name.as_str()) {
                rebuilt = rebuilt.add_step(name, guard.clone());
            }
            rebuilt = rebuilt.add_step(&step.name, step.guard.clone());
            if after.as_deref() == Some(step.name.as_str()) {
                rebuilt = rebuilt.add_step(name, guard.clone());
            }
        }
        for (from, to) in self.removed {
            rebuilt = rebuilt.remove_transition(&from, &to);
        }
        rebuilt
    }

    /// Drop a step by replaying the flow without it, then re-applying the
    /// removed-transition exclusions.
    pub fn remove_step(self, name: &str) -> Self {
        let mut rebuilt = Self::new();
        for step in &self.steps {
            if step.name != name {
                rebuilt = rebuilt.add_step(&step.name, step.guard.clone());
            }
        }
        for (from, to) in self.removed {
            rebuilt = rebuilt.remove_transition(&from, &to);
        }
        rebuilt
    }

    /// Permanently exclude a transition. The exclusion outlives rebuilds.
    pub fn remove_transition(mut self, from: &str, to: &str) -> Self {
        self.removed.push((from.to_string(), to.to_string()));
        self.transitions.retain(|r| !(r.from == from && r.to == to));
        self
    }

    /// Finalize into an immutable flow. An implicit unguarded `complete` step
    /// is appended if the configuration did not name one, so every flow ends
    /// somewhere reachable.
    pub fn build(self) -> CheckoutFlow {
        let mut builder = if self.steps.iter().any(|s| s.name == state::COMPLETE) {
            self
        } else {
            self.add_step(state::COMPLETE, None)
        };
        let removed = std::mem::take(&mut builder.removed);
        builder
            .transitions
            .retain(|r| !removed.iter().any(|(f, t)| r.from == *f && r.to == *t));
        CheckoutFlow {
            steps: builder.steps,
            transitions: builder.transitions,
        }
    }
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable-after-build flow definition: the ordered steps and the derived,
/// exclusion-filtered transition table the `next` event walks.
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    steps: Vec<CheckoutStep>,
    transitions: Vec<TransitionRule>,
}

impl CheckoutFlow {
    pub fn steps(&self) -> &[CheckoutStep] {
        &self.steps
    }

    /// All configured step names, `complete` included.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.steps.iter().any(|s| s.name == name)
    }

    /// The live transition table, in insertion order (first match wins).
    pub fn transitions(&self) -> &[TransitionRule] {
        &self.transitions
    }
}
