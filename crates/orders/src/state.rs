//! Well-known checkout state names.
//!
//! Steps are configured dynamically, so states are names rather than an enum;
//! these constants cover the default flow and the terminal states every flow
//! carries.

pub const CART: &str = "cart";
pub const ADDRESS: &str = "address";
pub const DELIVERY: &str = "delivery";
pub const PAYMENT: &str = "payment";
pub const CONFIRM: &str = "confirm";
pub const COMPLETE: &str = "complete";

pub const CANCELED: &str = "canceled";
pub const RETURNED: &str = "returned";
pub const RESUMED: &str = "resumed";
pub const AWAITING_RETURN: &str = "awaiting_return";
