use std::collections::HashMap;

use tracing::debug;

use storefront_core::{DomainError, DomainResult, PaymentMethodId, PaymentSourceId};
use storefront_orders::{Address, Order, Payment, PaymentState};
use storefront_payments::CreditCard;

use crate::machine::{CheckoutEvent, TransitionPipeline};
use crate::services::Services;

/// Request metadata forwarded to the payment gateway with the payment.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_ip: Option<String>,
}

/// Raw card fields as submitted by the shopper for a new source.
#[derive(Debug, Clone, Default)]
pub struct CardParams {
    pub number: Option<String>,
    pub expiry: Option<String>,
    pub verification_value: Option<String>,
    pub name: Option<String>,
    pub brand_token: Option<String>,
}

/// Nested attributes for a single payment.
#[derive(Debug, Clone, Default)]
pub struct PaymentAttributes {
    pub payment_method_id: Option<PaymentMethodId>,
    pub source_attributes: Option<CardParams>,
    /// A resolved existing source; set by the updater, never by the client.
    pub source: Option<CreditCard>,
    pub amount: Option<i64>,
    pub client_ip: Option<String>,
}

/// Already-whitelisted attribute payload for the current checkout step.
///
/// Payload sanitation (permitted-field filtering) happens in the request
/// layer before this type is built.
#[derive(Debug, Clone, Default)]
pub struct CheckoutUpdate {
    pub email: Option<String>,
    pub bill_address: Option<Address>,
    pub ship_address: Option<Address>,
    pub payments_attributes: Vec<PaymentAttributes>,
    /// Raw card sub-payloads keyed by payment method, folded into the first
    /// payments-attributes entry before source resolution.
    pub payment_source: HashMap<PaymentMethodId, CardParams>,
    pub existing_payment_source: Option<PaymentSourceId>,
    pub existing_card: Option<PaymentSourceId>,
    pub cvc_confirm: Option<String>,
}

/// Maps one client payload onto exactly one state advance.
///
/// Validation aborts come back as `Ok(false)` with messages on the order;
/// only trust-violating conditions (a payment source owned by a different
/// account) escape as `Err`, and those leave the order untouched.
pub struct OrderUpdater<'a> {
    pipeline: &'a TransitionPipeline,
}

impl<'a> OrderUpdater<'a> {
    pub fn new(pipeline: &'a TransitionPipeline) -> Self {
        Self { pipeline }
    }

    pub fn apply(
        &self,
        order: &mut Order,
        mut update: CheckoutUpdate,
        services: &Services<'_>,
        ctx: &RequestContext,
    ) -> DomainResult<bool> {
        order.clear_errors();

        // Pre-update hook chain; nothing below touches the order until the
        // payload is fully prepared and the ownership check has passed.
        self.merge_raw_source_params(&mut update);

        let referenced_existing =
            update.existing_payment_source.is_some() || update.existing_card.is_some();
        if let Some(mut source) = self.resolve_existing_source(&mut update, services) {
            if source.user_id.is_none() || source.user_id != order.user_id {
                return Err(DomainError::gateway("invalid credit card"));
            }
            if let Some(cvc) = update.cvc_confirm.take() {
                source.set_verification_value(&cvc);
            }
            if update.payments_attributes.is_empty() {
                update.payments_attributes.push(PaymentAttributes::default());
            }
            let first = &mut update.payments_attributes[0];
            first.payment_method_id = source.payment_method_id;
            // The attached source wins over any nested raw-card payload.
            first.source_attributes = None;
            first.source = Some(source);
        }

        if !update.payments_attributes.is_empty() || referenced_existing {
            if update.payments_attributes.is_empty() {
                update.payments_attributes.push(PaymentAttributes::default());
            }
            update.payments_attributes[0].amount = Some(order.total());
        }
        if let Some(first) = update.payments_attributes.first_mut() {
            first.client_ip = ctx.client_ip.clone();
        }

        if let Err(err) = self.assign_attributes(order, update) {
            order.add_error(err.to_string());
            return Ok(false);
        }

        // Only the fatal tier escapes; every other failure (hook vetoes,
        // collaborator errors) has already left its message on the order.
        let advanced = match self.pipeline.trigger(CheckoutEvent::Next, order, services) {
            Ok(_) => true,
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => false,
        };

        if !order.shipments.is_empty() {
            let res = services.shipping.price_shipments(order);
            if let Err(err) = res {
                order.add_error(err.to_string());
                return Ok(false);
            }
        }

        debug!(order_id = %order.id, state = order.state(), advanced, "checkout update applied");
        Ok(advanced)
    }

    /// Build a payment from the account's default source when payment is due
    /// and no submitted payment carries a source yet.
    pub fn assign_default_payment_source(&self, order: &mut Order, services: &Services<'_>) {
        if !order.payment_required() {
            return;
        }
        if order.payments.iter().any(|p| p.source.is_some()) {
            return;
        }
        let Some(user) = order.user_id else { return };
        let Some(source) = services.accounts.default_payment_source(user) else {
            return;
        };
        order.payments.push(Payment {
            amount: order.total(),
            payment_method_id: source.payment_method_id,
            source: Some(source),
            state: PaymentState::Checkout,
            client_ip: None,
        });
    }

    /// Fold the raw `payment_source` sub-payload for the selected payment
    /// method into the first payments-attributes entry, discarding payloads
    /// for the methods that were not selected.
    fn merge_raw_source_params(&self, update: &mut CheckoutUpdate) {
        if update.payment_source.is_empty() {
            return;
        }
        let Some(first) = update.payments_attributes.first_mut() else {
            return;
        };
        let Some(method_id) = first.payment_method_id else {
            return;
        };
        if let Some(params) = update.payment_source.remove(&method_id) {
            first.source_attributes = Some(params);
        }
        update.payment_source.clear();
    }

    /// An existing source may be referenced by a user-saved-source id or by a
    /// raw card id; both references are consumed either way.
    fn resolve_existing_source(
        &self,
        update: &mut CheckoutUpdate,
        services: &Services<'_>,
    ) -> Option<CreditCard> {
        let saved = update.existing_payment_source.take();
        let card = update.existing_card.take();
        saved
            .and_then(|id| services.sources.find_saved_source(id))
            .or_else(|| card.and_then(|id| services.sources.find_card(id)))
    }

    fn assign_attributes(&self, order: &mut Order, update: CheckoutUpdate) -> DomainResult<()> {
        if let Some(email) = update.email {
            order.email = Some(email);
        }
        if let Some(bill) = update.bill_address {
            order.bill_address = Some(bill);
        }
        if let Some(ship) = update.ship_address {
            order.ship_address = Some(ship);
        }

        for attrs in update.payments_attributes {
            let source = match (attrs.source, attrs.source_attributes) {
                (Some(source), _) => Some(source),
                (None, Some(params)) => Some(self.build_card(order, params)?),
                (None, None) => None,
            };
            let payment_method_id = attrs
                .payment_method_id
                .or_else(|| source.as_ref().and_then(|s| s.payment_method_id));
            order.payments.push(Payment {
                amount: attrs.amount.unwrap_or_else(|| order.total()),
                payment_method_id,
                source,
                state: PaymentState::Checkout,
                client_ip: attrs.client_ip,
            });
        }
        Ok(())
    }

    fn build_card(&self, order: &Order, params: CardParams) -> DomainResult<CreditCard> {
        let mut card = CreditCard::new(PaymentSourceId::new());
        card.user_id = order.user_id;
        if let Some(number) = &params.number {
            card.set_number(number);
        }
        if let Some(expiry) = &params.expiry {
            card.set_expiry(expiry);
        }
        if let Some(cvc) = &params.verification_value {
            card.set_verification_value(cvc);
        }
        if let Some(token) = &params.brand_token {
            card.set_brand_token(token);
        }
        card.name = params.name;
        card.validate_for_create()?;
        card.set_last_digits();
        Ok(card)
    }
}
