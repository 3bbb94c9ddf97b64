//! Data Transfer Objects for the token price cache engine.

pub mod price;

pub use price::*;
