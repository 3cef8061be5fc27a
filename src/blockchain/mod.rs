pub mod alloy_contracts;
pub mod contracts;

pub use alloy_contracts::{connect, AlloyContracts, ConnectError};
pub use contracts::*;
