//! End-to-end walk of the default checkout flow against in-memory
//! collaborators.

use std::cell::RefCell;

use storefront_checkout::{
    AccountService, CheckoutEvent, CheckoutUpdate, FlowBuilder, InventoryService, OrderRepository,
    OrderUpdater, Outcome, PaymentAttributes, PaymentGateway, PaymentSourceStore, RequestContext,
    SavedAddresses, Services, ShippingService, StepRegistry, TaxService, TransitionPipeline,
};
use storefront_core::{DomainResult, OrderId, PaymentMethodId, PaymentSourceId, UserId, VariantId};
use storefront_orders::{Address, LineItem, Order, PaymentState, Shipment};
use storefront_payments::CreditCard;

struct World {
    user_id: UserId,
    card_id: PaymentSourceId,
    payment_method_id: PaymentMethodId,
    saved_orders: RefCell<Vec<(OrderId, String)>>,
    captured: RefCell<i64>,
}

impl World {
    fn new() -> Self {
        Self {
            user_id: UserId::new(),
            card_id: PaymentSourceId::new(),
            payment_method_id: PaymentMethodId::new(),
            saved_orders: RefCell::new(Vec::new()),
            captured: RefCell::new(0),
        }
    }

    fn services(&self) -> Services<'_> {
        Services {
            repository: self,
            inventory: self,
            tax: self,
            shipping: self,
            gateway: self,
            accounts: self,
            sources: self,
        }
    }

    fn wallet_card(&self) -> CreditCard {
        let mut card = CreditCard::new(self.card_id);
        card.user_id = Some(self.user_id);
        card.payment_method_id = Some(self.payment_method_id);
        card.gateway_payment_profile_id = Some("prof_42".to_string());
        card.last_digits = Some("4242".to_string());
        card
    }

    fn address(&self) -> Address {
        Address {
            name: "Jane Doe".to_string(),
            address1: "10 Lombard St".to_string(),
            city: "San Francisco".to_string(),
            zipcode: "94111".to_string(),
            country: "US".to_string(),
        }
    }
}

impl OrderRepository for World {
    fn load(&self, _id: OrderId) -> DomainResult<Order> {
        Err(storefront_core::DomainError::not_found())
    }

    fn save(&self, order: &Order) -> DomainResult<()> {
        self.saved_orders
            .borrow_mut()
            .push((order.id, order.state().to_string()));
        Ok(())
    }
}

impl InventoryService for World {
    fn all_inventory_units_returned(&self, _order: &Order) -> bool {
        false
    }

    fn discontinued_variants(&self, _order: &Order) -> Vec<VariantId> {
        Vec::new()
    }

    fn stock_available(&self, _order: &Order) -> bool {
        true
    }
}

impl TaxService for World {
    fn compute_tax(&self, order: &mut Order) -> DomainResult<()> {
        // Flat 10% on the item total.
        order.tax_total = order.item_total / 10;
        Ok(())
    }
}

impl ShippingService for World {
    fn propose_shipments(&self, order: &mut Order) -> DomainResult<()> {
        if order.shipments.is_empty() {
            order.shipments.push(Shipment { cost: 0 });
        }
        Ok(())
    }

    fn available_rates(&self, _order: &Order) -> bool {
        true
    }

    fn price_shipments(&self, order: &mut Order) -> DomainResult<()> {
        for shipment in &mut order.shipments {
            shipment.cost = 500;
        }
        Ok(())
    }

    fn apply_free_shipping_promotions(&self, _order: &mut Order) -> DomainResult<()> {
        Ok(())
    }
}

impl PaymentGateway for World {
    fn capture_payments(&self, order: &mut Order) -> DomainResult<bool> {
        for payment in &mut order.payments {
            payment.state = PaymentState::Completed;
            *self.captured.borrow_mut() += payment.amount;
        }
        Ok(true)
    }
}

impl AccountService for World {
    fn saved_addresses(&self, _user: UserId) -> SavedAddresses {
        SavedAddresses {
            bill: Some(self.address()),
            ship: Some(self.address()),
        }
    }

    fn persist_order_address(&self, _user: UserId, _order: &Order) -> DomainResult<()> {
        Ok(())
    }

    fn default_payment_source(&self, _user: UserId) -> Option<CreditCard> {
        None
    }

    fn set_default_payment_source(
        &self,
        _user: UserId,
        _source: PaymentSourceId,
    ) -> DomainResult<()> {
        Ok(())
    }
}

impl PaymentSourceStore for World {
    fn find_saved_source(&self, id: PaymentSourceId) -> Option<CreditCard> {
        (id == self.card_id).then(|| self.wallet_card())
    }

    fn find_card(&self, _id: PaymentSourceId) -> Option<CreditCard> {
        None
    }
}

fn cart_order(world: &World) -> Order {
    let mut order = Order::new(OrderId::new());
    order.user_id = Some(world.user_id);
    order.line_items.push(LineItem {
        variant_id: VariantId::new(),
        quantity: 2,
        price: 1500,
    });
    order.update_totals();
    order
}

#[test]
fn default_flow_walks_cart_to_complete() {
    storefront_observability::init();
    let world = World::new();
    let pipeline = TransitionPipeline::new(FlowBuilder::default_flow().build());
    let updater = OrderUpdater::new(&pipeline);
    let mut order = cart_order(&world);

    // cart -> address: saved account addresses get assigned on entry.
    pipeline
        .trigger(CheckoutEvent::Next, &mut order, &world.services())
        .unwrap();
    assert_eq!(order.state(), "address");
    assert!(order.bill_address.is_some());
    assert!(order.ship_address.is_some());

    // address -> delivery: shipments proposed and priced, tax recomputed.
    pipeline
        .trigger(CheckoutEvent::Next, &mut order, &world.services())
        .unwrap();
    assert_eq!(order.state(), "delivery");
    assert_eq!(order.shipment_total, 500);
    assert_eq!(order.tax_total, 300);
    assert_eq!(order.total(), 3000 + 500 + 300);

    // delivery -> payment (guard passes: the order costs money).
    pipeline
        .trigger(CheckoutEvent::Next, &mut order, &world.services())
        .unwrap();
    assert_eq!(order.state(), "payment");

    // payment -> confirm via a client payload referencing a wallet card.
    let update = CheckoutUpdate {
        existing_payment_source: Some(world.card_id),
        ..Default::default()
    };
    let ctx = RequestContext {
        client_ip: Some("203.0.113.7".to_string()),
    };
    let advanced = updater
        .apply(&mut order, update, &world.services(), &ctx)
        .unwrap();
    assert!(advanced);
    assert_eq!(order.state(), "confirm");
    assert_eq!(order.payments[0].amount, order.total());
    assert_eq!(order.payments[0].client_ip.as_deref(), Some("203.0.113.7"));

    // confirm -> complete: the gateway captures the full total.
    let outcome = pipeline
        .trigger(CheckoutEvent::Next, &mut order, &world.services())
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Transitioned {
            from: "confirm".to_string(),
            to: "complete".to_string()
        }
    );
    assert_eq!(*world.captured.borrow(), 3800);
    assert!(order.completed_at.is_some());

    // One audit record per transition, in order.
    let names: Vec<&str> = order
        .state_changes()
        .iter()
        .map(|r| r.next_state.as_str())
        .collect();
    assert_eq!(names, ["address", "delivery", "payment", "confirm", "complete"]);
    assert!(order
        .state_changes()
        .iter()
        .all(|r| r.user_id == Some(world.user_id)));

    // Every committed transition hit the repository.
    assert_eq!(world.saved_orders.borrow().len(), 5);

    // A completed flow has passed every earlier step.
    let flow = FlowBuilder::default_flow().build();
    let registry = StepRegistry::new(&flow);
    assert!(registry.passed_step(&order, "address"));
    assert!(registry.passed_step(&order, "confirm"));
}

#[test]
fn free_order_skips_payment_entirely() {
    let world = World::new();
    let pipeline = TransitionPipeline::new(FlowBuilder::default_flow().build());
    let mut order = Order::new(OrderId::new());
    order.user_id = Some(world.user_id);
    order.line_items.push(LineItem {
        variant_id: VariantId::new(),
        quantity: 1,
        price: 0,
    });
    order.update_totals();

    let services = world.services();
    pipeline.trigger(CheckoutEvent::Next, &mut order, &services).unwrap();
    pipeline.trigger(CheckoutEvent::Next, &mut order, &services).unwrap();
    assert_eq!(order.state(), "delivery");

    // Shipping still accrues cost, so the payment guard can flip back on.
    pipeline.trigger(CheckoutEvent::Next, &mut order, &services).unwrap();
    assert_eq!(order.state(), "payment");

    let mut update = CheckoutUpdate::default();
    update.payments_attributes.push(PaymentAttributes {
        payment_method_id: Some(world.payment_method_id),
        source: Some(world.wallet_card()),
        ..Default::default()
    });
    let advanced = OrderUpdater::new(&pipeline)
        .apply(&mut order, update, &services, &RequestContext::default())
        .unwrap();
    assert!(advanced);
    assert_eq!(order.state(), "confirm");
}

#[test]
fn canceled_order_can_resume_and_complete_later() {
    let world = World::new();
    let pipeline = TransitionPipeline::new(FlowBuilder::default_flow().build());
    let mut order = cart_order(&world);
    let services = world.services();

    pipeline.trigger(CheckoutEvent::Next, &mut order, &services).unwrap();
    pipeline.trigger(CheckoutEvent::Cancel, &mut order, &services).unwrap();
    assert_eq!(order.state(), "canceled");
    assert!(order.canceled_at.is_some());

    pipeline.trigger(CheckoutEvent::Resume, &mut order, &services).unwrap();
    assert_eq!(order.state(), "resumed");
    assert_eq!(order.canceled_at, None);

    let names: Vec<&str> = order
        .state_changes()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, ["next", "cancel", "resume"]);
}
