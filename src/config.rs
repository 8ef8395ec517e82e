//! Engine configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! owner = "0x00000000000000000000000000000000000000a1"
//! custody = "0x00000000000000000000000000000000000000cc"
//! search_ceiling = 1000000000000
//! ```

use std::fs;
use std::path::Path;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::solver::{search_ceiling, DEFAULT_SEARCH_CEILING_TOKENS};

fn default_search_ceiling() -> u64 {
    DEFAULT_SEARCH_CEILING_TOKENS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Administrator allowed to initialize curves and withdraw
    pub owner: Address,

    /// Account holding the reserve asset on the engine's behalf
    pub custody: Address,

    /// Width of the buy search range, in whole tokens
    #[serde(default = "default_search_ceiling")]
    pub search_ceiling: u64,
}

impl EngineConfig {
    pub fn new(owner: Address, custody: Address) -> Self {
        Self {
            owner,
            custody,
            search_ceiling: DEFAULT_SEARCH_CEILING_TOKENS,
        }
    }

    pub fn with_search_ceiling(mut self, tokens: u64) -> Self {
        self.search_ceiling = tokens;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            bail!("owner cannot be the zero address");
        }
        if self.custody.is_zero() {
            bail!("custody cannot be the zero address");
        }
        if self.search_ceiling == 0 {
            bail!("search_ceiling must be at least one token");
        }
        Ok(())
    }

    /// Search ceiling in scaled supply units.
    pub fn search_ceiling_units(&self) -> U256 {
        search_ceiling(self.search_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SCALE;
    use std::fs;
    use tempfile::tempdir;

    const OWNER: Address = Address::repeat_byte(0xa1);
    const CUSTODY: Address = Address::repeat_byte(0xcc);

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new(OWNER, CUSTODY);
        assert!(config.validate().is_ok());
        assert_eq!(config.search_ceiling, DEFAULT_SEARCH_CEILING_TOKENS);
        assert_eq!(
            config.search_ceiling_units(),
            U256::from(DEFAULT_SEARCH_CEILING_TOKENS) * SCALE
        );
    }

    #[test]
    fn test_parse_with_default_ceiling() {
        let config = EngineConfig::from_toml_str(
            r#"
owner = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
custody = "0xcccccccccccccccccccccccccccccccccccccccc"
"#,
        )
        .unwrap();

        assert_eq!(config, EngineConfig::new(OWNER, CUSTODY));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_owner = r#"
owner = "0x0000000000000000000000000000000000000000"
custody = "0xcccccccccccccccccccccccccccccccccccccccc"
"#;
        assert!(EngineConfig::from_toml_str(zero_owner).is_err());

        let zero_ceiling = r#"
owner = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
custody = "0xcccccccccccccccccccccccccccccccccccccccc"
search_ceiling = 0
"#;
        assert!(EngineConfig::from_toml_str(zero_ceiling).is_err());

        assert!(EngineConfig::from_toml_str("owner = 42").is_err());
        assert!(EngineConfig::new(OWNER, Address::ZERO).validate().is_err());
        assert!(EngineConfig::new(OWNER, CUSTODY)
            .with_search_ceiling(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("engine.toml");
        fs::write(
            &config_path,
            r#"
owner = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
custody = "0xcccccccccccccccccccccccccccccccccccccccc"
search_ceiling = 5000
"#,
        )
        .unwrap();

        let config = EngineConfig::load(&config_path).unwrap();
        assert_eq!(config.search_ceiling, 5_000);
        assert_eq!(config.search_ceiling_units(), U256::from(5_000u64) * SCALE);

        let missing = EngineConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(format!("{missing:#}").contains("missing.toml"));
    }
}
