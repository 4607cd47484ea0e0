//! Stored payment sources domain module.
//!
//! This crate contains the tokenized-card model and its normalization rules
//! (digit scrubbing, expiry parsing, brand inference), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod card;

pub use card::{infer_brand, parse_expiry, CardBrand, CreditCard};
