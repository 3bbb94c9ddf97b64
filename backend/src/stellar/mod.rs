pub mod horizon;
pub mod types;

pub use horizon::{ChainClient, HorizonClient};
