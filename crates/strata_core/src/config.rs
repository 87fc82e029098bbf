//! # Index Configuration
//!
//! Tunables for registry growth and parallel dispatch. Loaded once at
//! startup, either from code or from a TOML document.

use serde::Deserialize;

use crate::error::{StrataError, StrataResult};

/// Smallest accepted registry growth factor.
pub const MIN_GROWTH_FACTOR: f64 = 1.5;

/// Configuration for an index instance.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    /// Number of identifier slots the registry reserves up front.
    pub initial_entities: u32,
    /// Additive floor applied every time the registry grows.
    pub growth_base: u32,
    /// Multiplicative growth applied to the current slot count.
    pub growth_factor: f64,
    /// Non-empty leaf words below which the parallel strategy stays on the
    /// calling thread. Zero always fans out.
    pub parallel_min_blocks: usize,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            initial_entities: 10,
            growth_base: 50,
            growth_factor: MIN_GROWTH_FACTOR,
            parallel_min_blocks: 0,
        }
    }
}

impl StrataConfig {
    /// Small worlds: minimal reservation, inline traversal for small views.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            initial_entities: 10,
            growth_base: 50,
            growth_factor: MIN_GROWTH_FACTOR,
            parallel_min_blocks: 64,
        }
    }

    /// Bulk spawning: large reservation and doubling growth.
    #[must_use]
    pub const fn bulk() -> Self {
        Self {
            initial_entities: 1 << 16,
            growth_base: 4096,
            growth_factor: 2.0,
            parallel_min_blocks: 16,
        }
    }

    /// Parses and validates a TOML document. Missing keys take their
    /// default value.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::InvalidConfig`] on malformed TOML, unknown
    /// keys or out-of-range values.
    pub fn from_toml_str(source: &str) -> StrataResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StrataError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::InvalidConfig`] when a field is out of range.
    pub fn validate(&self) -> StrataResult<()> {
        if self.growth_factor.is_nan() || self.growth_factor < MIN_GROWTH_FACTOR {
            return Err(StrataError::InvalidConfig(format!(
                "growth_factor must be at least {MIN_GROWTH_FACTOR}, got {}",
                self.growth_factor
            )));
        }
        if self.growth_base == 0 {
            return Err(StrataError::InvalidConfig("growth_base must be at least 1".to_owned()));
        }
        if self.initial_entities > crate::bits::MAX_BITS {
            return Err(StrataError::InvalidConfig(format!(
                "initial_entities must not exceed {}, got {}",
                crate::bits::MAX_BITS,
                self.initial_entities
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StrataConfig::default().validate().is_ok());
        assert!(StrataConfig::compact().validate().is_ok());
        assert!(StrataConfig::bulk().validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = StrataConfig::from_toml_str("growth_base = 128\n").unwrap();
        assert_eq!(config.growth_base, 128);
        assert_eq!(config.initial_entities, 10);
    }

    #[test]
    fn test_rejects_slow_growth() {
        let err = StrataConfig::from_toml_str("growth_factor = 1.1\n").unwrap_err();
        assert!(matches!(err, StrataError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_growth_base() {
        let err = StrataConfig::from_toml_str("growth_base = 0\n").unwrap_err();
        assert!(matches!(err, StrataError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert!(StrataConfig::from_toml_str("threads = 4\n").is_err());
    }
}
