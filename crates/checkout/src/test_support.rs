//! In-memory collaborator stubs shared by the unit tests.

use std::cell::RefCell;

use storefront_core::{DomainResult, OrderId, PaymentMethodId, PaymentSourceId, UserId, VariantId};
use storefront_orders::{Address, LineItem, Order, Payment, PaymentState, Shipment};
use storefront_payments::CreditCard;

use crate::services::{
    AccountService, InventoryService, OrderRepository, PaymentGateway, PaymentSourceStore,
    SavedAddresses, Services, ShippingService, TaxService,
};

pub fn order_with_items(price: i64) -> Order {
    let mut order = Order::new(OrderId::new());
    order.line_items.push(LineItem {
        variant_id: VariantId::new(),
        quantity: 1,
        price,
    });
    order.update_totals();
    order
}

pub fn payment(amount: i64) -> Payment {
    Payment {
        amount,
        payment_method_id: None,
        source: None,
        state: PaymentState::Checkout,
        client_ip: None,
    }
}

pub fn valid_address(name: &str) -> Address {
    Address {
        name: name.to_string(),
        address1: "10 Lombard St".to_string(),
        city: "San Francisco".to_string(),
        zipcode: "94111".to_string(),
        country: "US".to_string(),
    }
}

/// One struct standing in for every collaborator, with recording cells for
/// the interactions tests assert on.
pub struct StubServices {
    pub user_id: UserId,
    pub card_id: PaymentSourceId,
    pub payment_method_id: PaymentMethodId,
    pub available_rates: bool,
    pub stock_available: bool,
    pub all_returned: bool,
    pub capture_ok: bool,
    pub discontinued: Vec<VariantId>,
    pub shipment_cost: i64,
    pub tax_amount: i64,
    pub tax_error: Option<storefront_core::DomainError>,
    pub saved_addresses: SavedAddresses,
    pub default_source: Option<CreditCard>,
    pub wallet: Vec<CreditCard>,
    pub cards: Vec<CreditCard>,
    pub saved_orders: RefCell<Vec<OrderId>>,
    pub addresses_persisted: RefCell<u32>,
    pub default_sources_set: RefCell<Vec<(UserId, PaymentSourceId)>>,
    pub captures: RefCell<u32>,
}

impl StubServices {
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            card_id: PaymentSourceId::new(),
            payment_method_id: PaymentMethodId::new(),
            available_rates: true,
            stock_available: true,
            all_returned: false,
            capture_ok: true,
            discontinued: Vec::new(),
            shipment_cost: 0,
            tax_amount: 0,
            tax_error: None,
            saved_addresses: SavedAddresses::default(),
            default_source: None,
            wallet: Vec::new(),
            cards: Vec::new(),
            saved_orders: RefCell::new(Vec::new()),
            addresses_persisted: RefCell::new(0),
            default_sources_set: RefCell::new(Vec::new()),
            captures: RefCell::new(0),
        }
    }

    pub fn with_saved_addresses() -> Self {
        let mut stub = Self::new();
        stub.saved_addresses = SavedAddresses {
            bill: Some(valid_address("Jane Doe")),
            ship: Some(valid_address("Jane Doe")),
        };
        stub
    }

    /// A profile-backed card owned by this stub's user.
    pub fn stored_card(&self) -> CreditCard {
        let mut card = CreditCard::new(self.card_id);
        card.user_id = Some(self.user_id);
        card.payment_method_id = Some(self.payment_method_id);
        card.gateway_payment_profile_id = Some("prof_1".to_string());
        card.last_digits = Some("1111".to_string());
        card
    }

    pub fn services(&self) -> Services<'_> {
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
}

impl OrderRepository for StubServices {
    fn load(&self, _id: OrderId) -> DomainResult<Order> {
        Err(storefront_core::DomainError::not_found())
    }

    fn save(&self, order: &Order) -> DomainResult<()> {
        self.saved_orders.borrow_mut().push(order.id);
        Ok(())
    }
}

impl InventoryService for StubServices {
    fn all_inventory_units_returned(&self, _order: &Order) -> bool {
        self.all_returned
    }

    fn discontinued_variants(&self, _order: &Order) -> Vec<VariantId> {
        self.discontinued.clone()
    }

    fn stock_available(&self, _order: &Order) -> bool {
        self.stock_available
    }
}

impl TaxService for StubServices {
    fn compute_tax(&self, order: &mut Order) -> DomainResult<()> {
        if let Some(err) = &self.tax_error {
            return Err(err.clone());
        }
        order.tax_total = self.tax_amount;
        Ok(())
    }
}

impl ShippingService for StubServices {
    fn propose_shipments(&self, order: &mut Order) -> DomainResult<()> {
        if order.shipments.is_empty() {
            order.shipments.push(Shipment { cost: 0 });
        }
        Ok(())
    }

    fn available_rates(&self, _order: &Order) -> bool {
        self.available_rates
    }

    fn price_shipments(&self, order: &mut Order) -> DomainResult<()> {
        for shipment in &mut order.shipments {
            shipment.cost = self.shipment_cost;
        }
        Ok(())
    }

    fn apply_free_shipping_promotions(&self, _order: &mut Order) -> DomainResult<()> {
        Ok(())
    }
}

impl PaymentGateway for StubServices {
    fn capture_payments(&self, order: &mut Order) -> DomainResult<bool> {
        *self.captures.borrow_mut() += 1;
        if self.capture_ok {
            for payment in &mut order.payments {
                payment.state = PaymentState::Completed;
            }
        }
        Ok(self.capture_ok)
    }
}

impl AccountService for StubServices {
    fn saved_addresses(&self, _user: UserId) -> SavedAddresses {
        self.saved_addresses.clone()
    }

    fn persist_order_address(&self, _user: UserId, _order: &Order) -> DomainResult<()> {
        *self.addresses_persisted.borrow_mut() += 1;
        Ok(())
    }

    fn default_payment_source(&self, _user: UserId) -> Option<CreditCard> {
        self.default_source.clone()
    }

    fn set_default_payment_source(
        &self,
        user: UserId,
        source: PaymentSourceId,
    ) -> DomainResult<()> {
        self.default_sources_set.borrow_mut().push((user, source));
        Ok(())
    }
}

impl PaymentSourceStore for StubServices {
    fn find_saved_source(&self, id: PaymentSourceId) -> Option<CreditCard> {
        self.wallet.iter().find(|c| c.id == id).cloned()
    }

    fn find_card(&self, id: PaymentSourceId) -> Option<CreditCard> {
        self.cards.iter().find(|c| c.id == id).cloned()
    }
}
