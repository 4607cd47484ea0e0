use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, PaymentMethodId, PaymentSourceId, UserId};

/// Recognized card brands, in detection order (first match wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Master,
    DinersClub,
    AmericanExpress,
    Discover,
    Jcb,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Master => "master",
            CardBrand::DinersClub => "diners_club",
            CardBrand::AmericanExpress => "american_express",
            CardBrand::Discover => "discover",
            CardBrand::Jcb => "jcb",
        }
    }
}

impl core::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// The master pattern also covers the proprietary 6759-prefixed ranges.
static CARD_PATTERNS: Lazy<Vec<(CardBrand, Regex)>> = Lazy::new(|| {
    [
        (CardBrand::Visa, r"^4[0-9]{12}(?:[0-9]{3})?$"),
        (
            CardBrand::Master,
            r"(^5[1-5][0-9]{14}$)|(^6759[0-9]{2}([0-9]{10})$)|(^6759[0-9]{2}([0-9]{12})$)|(^6759[0-9]{2}([0-9]{13})$)",
        ),
        (CardBrand::DinersClub, r"^3(?:0[0-5]|[68][0-9])[0-9]{11}$"),
        (CardBrand::AmericanExpress, r"^3[47][0-9]{13}$"),
        (CardBrand::Discover, r"^6(?:011|5[0-9]{2})[0-9]{12}$"),
        (CardBrand::Jcb, r"^(?:2131|1800|35\d{3})\d{11}$"),
    ]
    .into_iter()
    .map(|(brand, pattern)| (brand, Regex::new(pattern).expect("card pattern")))
    .collect()
});

/// Infer a card brand from an already-scrubbed digit string.
pub fn infer_brand(digits: &str) -> Option<CardBrand> {
    let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
    CARD_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&digits))
        .map(|(brand, _)| *brand)
}

/// Parse a card expiry string into `(month, year)`.
///
/// Accepts `mm/yy`, `mm/yyyy` (whitespace around the separator tolerated) and
/// the separator-less `mmyy` / `mmyyyy` forms. Two-digit years are normalized
/// into the 2000s. Unparseable input yields `None`; range validation happens
/// later at creation time, not here.
pub fn parse_expiry(raw: &str) -> Option<(u32, u32)> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let (month_part, year_part) = if let Some((m, y)) = cleaned.split_once('/') {
        (m, y)
    } else if cleaned.len() == 4 || cleaned.len() == 6 {
        cleaned.split_at(2)
    } else {
        return None;
    };

    let month: u32 = month_part.parse().ok()?;
    let mut year: u32 = year_part.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    Some((month, year))
}

/// A stored, reusable tokenized card.
///
/// `number` and `verification_value` are transient: they are accepted from the
/// shopper, used for gateway calls, and never serialized back out. Cards that
/// carry encrypted data or a gateway profile reference skip numeric validation
/// entirely (the gateway vault holds the real card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: PaymentSourceId,
    pub user_id: Option<UserId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub name: Option<String>,
    pub month: Option<u32>,
    pub year: Option<u32>,
    #[serde(default, skip_serializing)]
    number: Option<String>,
    #[serde(default, skip_serializing)]
    verification_value: Option<String>,
    pub last_digits: Option<String>,
    pub brand: Option<String>,
    #[serde(default, skip_serializing)]
    pub encrypted_data: Option<String>,
    pub gateway_customer_profile_id: Option<String>,
    pub gateway_payment_profile_id: Option<String>,
    pub imported: bool,
    pub default: bool,
}

impl CreditCard {
    pub fn new(id: PaymentSourceId) -> Self {
        Self {
            id,
            user_id: None,
            payment_method_id: None,
            name: None,
            month: None,
            year: None,
            number: None,
            verification_value: None,
            last_digits: None,
            brand: None,
            encrypted_data: None,
            gateway_customer_profile_id: None,
            gateway_payment_profile_id: None,
            imported: false,
            default: false,
        }
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn verification_value(&self) -> Option<&str> {
        self.verification_value.as_deref()
    }

    pub fn has_verification_value(&self) -> bool {
        self.verification_value
            .as_deref()
            .is_some_and(|v| !v.is_empty())
    }

    /// Assign the card number, stripping every non-digit character.
    /// Normalization never fails the caller; malformed input just scrubs to
    /// fewer (or zero) digits.
    pub fn set_number(&mut self, raw: &str) {
        self.number = Some(raw.chars().filter(|c| c.is_ascii_digit()).collect());
    }

    pub fn set_verification_value(&mut self, raw: &str) {
        self.verification_value = Some(raw.trim().to_string());
    }

    /// Assign month/year from a combined expiry string. Unparseable input
    /// leaves both unset; presence validation catches that later.
    pub fn set_expiry(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        if let Some((month, year)) = parse_expiry(raw) {
            self.month = Some(month);
            self.year = Some(year);
        }
    }

    /// Assign the brand from a third-party token vocabulary, converting it to
    /// the canonical naming. An empty token falls back to inference from the
    /// card number; unknown tokens pass through unchanged.
    pub fn set_brand_token(&mut self, token: &str) {
        self.brand = match token {
            "mastercard" | "maestro" => Some(CardBrand::Master.as_str().to_string()),
            "amex" => Some(CardBrand::AmericanExpress.as_str().to_string()),
            "dinersclub" => Some(CardBrand::DinersClub.as_str().to_string()),
            "" => self.brand_from_number().map(|b| b.as_str().to_string()),
            other => Some(other.to_string()),
        };
    }

    pub fn brand_from_number(&self) -> Option<CardBrand> {
        self.number.as_deref().and_then(infer_brand)
    }

    /// Derive `last_digits` from the number at save time. Set at most once:
    /// an already-populated value is never recomputed. Numbers of four digits
    /// or fewer are kept whole.
    pub fn set_last_digits(&mut self) {
        if let Some(number) = &mut self.number {
            number.retain(|c| !c.is_whitespace());
        }
        if let Some(verification_value) = &mut self.verification_value {
            verification_value.retain(|c| !c.is_whitespace());
        }
        if self.last_digits.is_none() {
            let number = self.number.as_deref().unwrap_or_default();
            self.last_digits = Some(if number.len() <= 4 {
                number.to_string()
            } else {
                number[number.len() - 4..].to_string()
            });
        }
    }

    /// Masked display form, e.g. `XXXX-XXXX-XXXX-4338`.
    pub fn display_number(&self) -> String {
        format!("XXXX-XXXX-XXXX-{}", self.last_digits.as_deref().unwrap_or_default())
    }

    pub fn has_payment_profile(&self) -> bool {
        self.gateway_customer_profile_id.is_some() || self.gateway_payment_profile_id.is_some()
    }

    /// Whether number/expiry/name validation applies at all. Imported and
    /// profile-backed records carry no raw card data to validate.
    pub fn requires_card_numbers(&self) -> bool {
        self.encrypted_data.is_none() && !self.has_payment_profile()
    }

    /// Creation-time validation. Skipped entirely for cards that do not
    /// require raw numbers (encrypted or profile-backed).
    pub fn validate_for_create(&self) -> DomainResult<()> {
        if !self.requires_card_numbers() {
            return Ok(());
        }

        let month = self
            .month
            .ok_or_else(|| DomainError::validation("month is not a number"))?;
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation("month is not in 1..12"));
        }
        if self.year.is_none() {
            return Err(DomainError::validation("year is not a number"));
        }
        if !self.imported {
            if self.number.as_deref().unwrap_or_default().is_empty() {
                return Err(DomainError::validation("number can't be blank"));
            }
            if !self.has_verification_value() {
                return Err(DomainError::validation("verification value can't be blank"));
            }
        }
        if self.name.as_deref().unwrap_or_default().is_empty() {
            return Err(DomainError::validation("name can't be blank"));
        }
        Ok(())
    }
}
