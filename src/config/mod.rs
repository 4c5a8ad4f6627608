use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::address::Address;

pub const DEFAULT_NAME: &str = "Dog Slobber";
pub const DEFAULT_SYMBOL: &str = "DSLB";
pub const DEFAULT_INITIAL_SUPPLY: u128 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("token name must not be empty")]
    EmptyName,
    #[error("token symbol must not be empty")]
    EmptySymbol,
    #[error("initial supply must be positive")]
    ZeroSupply,
    #[error("creator must not be the null address")]
    NullCreator,
}

/// Parameters for creating a ledger instance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    pub name: String,
    pub symbol: String,
    /// Whole tokens; scaled by 10^18 at construction.
    pub initial_supply: u128,
    pub creator: Address,
    /// Distinguishes several deployments by the same creator.
    pub nonce: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            initial_supply: DEFAULT_INITIAL_SUPPLY,
            creator: Address::ZERO,
            nonce: 0,
        }
    }
}

impl DeployConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.initial_supply == 0 {
            return Err(ConfigError::ZeroSupply);
        }
        if self.creator.is_zero() {
            return Err(ConfigError::NullCreator);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let creator = Address::from_low_u8(1);
        let cfg = DeployConfig::from_json(&format!(r#"{{"creator":"{creator}"}}"#)).unwrap();
        assert_eq!(cfg.name, "Dog Slobber");
        assert_eq!(cfg.symbol, "DSLB");
        assert_eq!(cfg.initial_supply, 1_000_000);
        assert_eq!(cfg.creator, creator);
        assert_eq!(cfg.nonce, 0);
        cfg.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        let good = DeployConfig {
            creator: Address::from_low_u8(1),
            ..DeployConfig::default()
        };
        assert!(matches!(
            DeployConfig { name: " ".into(), ..good.clone() }.validate(),
            Err(ConfigError::EmptyName)
        ));
        assert!(matches!(
            DeployConfig { symbol: String::new(), ..good.clone() }.validate(),
            Err(ConfigError::EmptySymbol)
        ));
        assert!(matches!(
            DeployConfig { initial_supply: 0, ..good.clone() }.validate(),
            Err(ConfigError::ZeroSupply)
        ));
        assert!(matches!(
            DeployConfig::default().validate(),
            Err(ConfigError::NullCreator)
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            DeployConfig::from_json(r#"{"decimals": 8}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name":"Test","symbol":"TST","initial_supply":5,"creator":"{}","nonce":3}}"#,
            Address::from_low_u8(4)
        )
        .unwrap();
        let cfg = DeployConfig::load(file.path()).unwrap();
        assert_eq!(cfg.symbol, "TST");
        assert_eq!(cfg.nonce, 3);

        let missing = DeployConfig::load(Path::new("/nonexistent/token.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
