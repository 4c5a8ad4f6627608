use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::address::Address;
use crate::config::{ConfigError, DeployConfig};
use crate::ledger::{Amount, Ledger, TokenMetadata};
use crate::units::{format_units, serde_amount};

const DEPLOY_DOMAIN: &[u8] = b"token-ledger/deploy";

/// A freshly constructed ledger together with its instance address.
#[derive(Debug)]
pub struct Deployment {
    pub address: Address,
    pub creator: Address,
    pub ledger: Ledger,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub address: Address,
    pub creator: Address,
    pub meta: TokenMetadata,
    #[serde(with = "serde_amount")]
    pub creator_balance: Amount,
    /// `creator_balance` in whole tokens.
    pub creator_balance_display: String,
}

/// Deterministic instance address for the `nonce`-th deployment by `creator`.
pub fn instance_address(creator: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(DEPLOY_DOMAIN);
    hasher.update(creator.as_bytes());
    hasher.update(nonce.to_be_bytes());
    Address::from_digest(hasher.finalize().into())
}

pub fn deploy(config: &DeployConfig) -> Result<Deployment, ConfigError> {
    config.validate()?;
    let ledger = Ledger::new(
        config.creator,
        config.name.clone(),
        config.symbol.clone(),
        config.initial_supply,
    );
    let address = instance_address(&config.creator, config.nonce);
    info!(
        %address,
        creator = %config.creator,
        symbol = %config.symbol,
        "token deployed"
    );
    Ok(Deployment {
        address,
        creator: config.creator,
        ledger,
    })
}

impl Deployment {
    pub fn summary(&self) -> DeploymentSummary {
        let meta = self.ledger.metadata().clone();
        let creator_balance = self.ledger.balance_of(&self.creator);
        DeploymentSummary {
            address: self.address,
            creator: self.creator,
            creator_balance_display: format_units(creator_balance, meta.decimals),
            meta,
            creator_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::units::tokens;

    fn config() -> DeployConfig {
        DeployConfig {
            creator: Address::from_low_u8(1),
            ..DeployConfig::default()
        }
    }

    #[test]
    fn deploy_builds_ledger_from_config() {
        let cfg = config();
        let deployment = deploy(&cfg).unwrap();
        let summary = deployment.summary();
        assert_eq!(summary.creator, cfg.creator);
        assert_eq!(summary.meta.name, "Dog Slobber");
        assert_eq!(summary.meta.total_supply, tokens(1_000_000));
        assert_eq!(summary.creator_balance, tokens(1_000_000));
        assert_eq!(summary.address, instance_address(&cfg.creator, 0));
        assert_eq!(summary.creator_balance_display, "1000000");
    }

    #[test]
    fn summary_reports_stored_creator_after_transfers() {
        let cfg = DeployConfig {
            initial_supply: 10,
            ..config()
        };
        let mut deployment = deploy(&cfg).unwrap();
        let receiver = Address::from_low_u8(2);
        deployment
            .ledger
            .transfer(cfg.creator, receiver, tokens(3) / 2)
            .unwrap();

        let summary = deployment.summary();
        assert_eq!(summary.creator, cfg.creator);
        assert_eq!(summary.creator_balance, tokens(10) - tokens(3) / 2);
        assert_eq!(summary.creator_balance_display, "8.5");
    }

    #[test]
    fn instance_address_varies_with_creator_and_nonce() {
        let a = Address::from_low_u8(1);
        let b = Address::from_low_u8(2);
        assert_eq!(instance_address(&a, 0), instance_address(&a, 0));
        assert_ne!(instance_address(&a, 0), instance_address(&a, 1));
        assert_ne!(instance_address(&a, 0), instance_address(&b, 0));
        assert!(!instance_address(&a, 0).is_zero());
    }

    #[test]
    fn deploy_rejects_invalid_config() {
        let cfg = DeployConfig::default();
        assert!(matches!(deploy(&cfg), Err(ConfigError::NullCreator)));
    }
}
