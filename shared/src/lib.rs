//! # Shared Data Transfer Objects Library
//!
//! Defines the contract between the price cache engine and its callers
//! (the HTTP layer, account/history transformers, and other surrounding
//! service code).
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects for API communication
//!   - **[`dto::price`]**: Token price DTOs returned by `getPrice`
//!
//! ## Wire Format
//!
//! All DTOs serialize to JSON using `serde`. Price fields are
//! `rust_decimal::Decimal`, which serializes as a string, never a binary
//! float — precision survives the wire intact.

pub mod dto;

pub use dto::*;
