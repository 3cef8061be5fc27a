// Equity-per-share helpers shared by the filter and the action
use alloy::primitives::Address;
use tracing::{debug, error};

use crate::blockchain::StrategyContract;
use crate::error::{Check, CheckError};
use crate::models::{Fixed, Wad};
use crate::store::KeyValueStore;

/// Store key for an address. Strategies and oracles share the key space.
pub fn store_key(address: Address) -> String {
    address.to_checksum(None)
}

/// `equity * 1e18 / totalSupply`, integer division.
pub async fn equity_per_share(strategy: &dyn StrategyContract) -> Result<Fixed<Wad>, CheckError> {
    let address = strategy.address();

    let result = async {
        let (equity, total_supply) = tokio::try_join!(strategy.equity(), strategy.total_supply())
            .map_err(|source| CheckError::ContractRead {
                check: Check::EquityPerShare,
                address,
                source,
            })?;

        Fixed::<Wad>::ratio(equity, total_supply).map_err(|source| CheckError::Arithmetic {
            check: Check::EquityPerShare,
            address,
            source,
        })
    }
    .await;

    if let Err(e) = &result {
        error!("An error has occurred during {}: {}", Check::EquityPerShare, e);
    }
    result
}

/// Persist the latest equity per share of `strategy`.
pub async fn update_eps(
    store: &dyn KeyValueStore,
    strategy: Address,
    current_eps: Fixed<Wad>,
) -> Result<(), CheckError> {
    debug!("UpdateEPS: {} {}", strategy, current_eps);

    store
        .put(&store_key(strategy), current_eps.to_string())
        .await
        .map_err(|source| {
            let e = CheckError::Store {
                check: Check::EquityPerShare,
                address: strategy,
                source,
            };
            error!("An error has occurred during {}: {}", Check::EquityPerShare, e);
            e
        })
}
