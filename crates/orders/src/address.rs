use serde::{Deserialize, Serialize};

/// Postal address attached to an order or saved on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub address1: String,
    pub city: String,
    pub zipcode: String,
    pub country: String,
}

impl Address {
    /// A saved address is only cloned onto an order when it still validates.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !self.address1.is_empty()
            && !self.city.is_empty()
            && !self.zipcode.is_empty()
            && !self.country.is_empty()
    }
}
