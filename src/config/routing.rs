// Which strategies depend on which price feeds and debt tokens

use alloy::primitives::Address;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::models::{Base8, Fixed, FixedPointError, Ray};

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Failed to load routing: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid {field}: {source}")]
    InvalidThreshold {
        field: String,
        #[source]
        source: FixedPointError,
    },

    #[error("Strategy {0} is routed to a debt token but has no interest threshold")]
    MissingInterestThreshold(Address),

    #[error("{kind} {address} has no strategies")]
    EmptyRoute { kind: &'static str, address: Address },

    #[error("Duplicate {kind} entry: {address}")]
    Duplicate { kind: &'static str, address: Address },
}

#[derive(Debug, Deserialize)]
struct RoutingFile {
    health_factor_threshold: String,
    #[serde(default)]
    oracles: Vec<Route>,
    #[serde(default)]
    debt_tokens: Vec<Route>,
    #[serde(default)]
    strategies: Vec<StrategyEntry>,
}

#[derive(Debug, Deserialize)]
struct Route {
    address: Address,
    #[serde(default)]
    #[allow(dead_code)]
    label: Option<String>,
    strategies: Vec<Address>,
}

#[derive(Debug, Deserialize)]
struct StrategyEntry {
    address: Address,
    #[serde(default)]
    #[allow(dead_code)]
    label: Option<String>,
    interest_threshold: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub health_factor_threshold: Fixed<Base8>,
    pub oracle_strategies: HashMap<Address, Vec<Address>>,
    pub debt_token_strategies: HashMap<Address, Vec<Address>>,
    pub interest_thresholds: HashMap<Address, Fixed<Ray>>,
}

impl Routing {
    pub fn new(health_factor_threshold: Fixed<Base8>) -> Self {
        Self {
            health_factor_threshold,
            oracle_strategies: HashMap::new(),
            debt_token_strategies: HashMap::new(),
            interest_thresholds: HashMap::new(),
        }
    }

    pub fn with_oracle(mut self, oracle: Address, strategies: Vec<Address>) -> Self {
        self.oracle_strategies.insert(oracle, strategies);
        self
    }

    pub fn with_debt_token(mut self, token: Address, strategies: Vec<Address>) -> Self {
        self.debt_token_strategies.insert(token, strategies);
        self
    }

    pub fn with_interest_threshold(mut self, strategy: Address, threshold: Fixed<Ray>) -> Self {
        self.interest_thresholds.insert(strategy, threshold);
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RoutingError> {
        let file: RoutingFile = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        Self::from_routing_file(file)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, RoutingError> {
        let file: RoutingFile = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::from_routing_file(file)
    }

    fn from_routing_file(file: RoutingFile) -> Result<Self, RoutingError> {
        let health_factor_threshold = Fixed::parse_units(&file.health_factor_threshold)
            .map_err(|source| RoutingError::InvalidThreshold {
                field: "health_factor_threshold".to_string(),
                source,
            })?;

        let mut routing = Routing::new(health_factor_threshold);

        for route in file.oracles {
            if routing.oracle_strategies.contains_key(&route.address) {
                return Err(RoutingError::Duplicate { kind: "oracle", address: route.address });
            }
            routing.oracle_strategies.insert(route.address, route.strategies);
        }

        for route in file.debt_tokens {
            if routing.debt_token_strategies.contains_key(&route.address) {
                return Err(RoutingError::Duplicate { kind: "debt token", address: route.address });
            }
            routing.debt_token_strategies.insert(route.address, route.strategies);
        }

        for entry in file.strategies {
            if routing.interest_thresholds.contains_key(&entry.address) {
                return Err(RoutingError::Duplicate { kind: "strategy", address: entry.address });
            }
            let threshold = Fixed::parse_units(&entry.interest_threshold).map_err(|source| {
                RoutingError::InvalidThreshold {
                    field: format!("interest_threshold of {}", entry.address),
                    source,
                }
            })?;
            routing.interest_thresholds.insert(entry.address, threshold);
        }

        routing.validate()?;
        Ok(routing)
    }

    /// Every route lists at least one strategy, without repeats, and every
    /// strategy routed to a debt token has an interest threshold.
    pub fn validate(&self) -> Result<(), RoutingError> {
        for (kind, routes) in [
            ("oracle", &self.oracle_strategies),
            ("debt token", &self.debt_token_strategies),
        ] {
            for (address, strategies) in routes {
                if strategies.is_empty() {
                    return Err(RoutingError::EmptyRoute { kind, address: *address });
                }
                let mut seen = HashSet::new();
                if let Some(duplicate) = strategies.iter().find(|s| !seen.insert(**s)) {
                    return Err(RoutingError::Duplicate {
                        kind: "strategy",
                        address: *duplicate,
                    });
                }
            }
        }

        for strategy in self.debt_token_strategies.values().flatten() {
            if !self.interest_thresholds.contains_key(strategy) {
                return Err(RoutingError::MissingInterestThreshold(*strategy));
            }
        }

        Ok(())
    }

    /// Strategies whose EPS and rebalance need depend on `oracle`.
    pub fn strategies_for_oracle(&self, oracle: &Address) -> &[Address] {
        self.oracle_strategies
            .get(oracle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Strategies borrowing `token`, `None` when the token is not tracked.
    pub fn strategies_for_debt_token(&self, token: &Address) -> Option<&[Address]> {
        self.debt_token_strategies.get(token).map(Vec::as_slice)
    }

    pub fn interest_threshold(&self, strategy: &Address) -> Option<Fixed<Ray>> {
        self.interest_thresholds.get(strategy).copied()
    }
}
