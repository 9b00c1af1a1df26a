//! Chat engine configuration with sensible defaults.
//!
//! All operational parameters of the cache and gossip engine are
//! centralized here. Every value has a documented default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OlnError, Result};

/// Upper bound on proof-of-work difficulty the node will mine or
/// auto-apply. 24 bits is already ~16M hash attempts on average;
/// higher values risk unbounded CPU usage.
pub const MAX_POW_BITS: u32 = 24;

/// Configuration of a chat session's cache and gossip behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of cached messages. The lowest-priority entry
    /// is evicted whenever an insert pushes the cache over this bound.
    pub max_cache_size: usize,

    /// Seconds between rebroadcast scans.
    pub rebroadcast_secs: u64,

    /// Proof-of-work bits applied to outbound messages when the
    /// operator does not request explicit PoW. 0 disables auto-PoW.
    pub auto_pow_bits: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 100,
            rebroadcast_secs: 300,
            auto_pow_bits: 0,
        }
    }
}

impl ChatConfig {
    /// The rebroadcast interval as a [`Duration`].
    pub fn rebroadcast_interval(&self) -> Duration {
        Duration::from_secs(self.rebroadcast_secs)
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Config`] if any value is outside its
    /// acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 {
            return Err(OlnError::Config {
                reason: "max_cache_size must be greater than 0".into(),
            });
        }

        if self.rebroadcast_secs == 0 {
            return Err(OlnError::Config {
                reason: "rebroadcast interval must be greater than 0".into(),
            });
        }

        if self.auto_pow_bits > MAX_POW_BITS {
            return Err(OlnError::Config {
                reason: format!(
                    "auto_pow_bits {} exceeds maximum {}",
                    self.auto_pow_bits, MAX_POW_BITS,
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ChatConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_values() {
        let config = ChatConfig::default();
        assert_eq!(config.max_cache_size, 100);
        assert_eq!(config.rebroadcast_secs, 300);
        assert_eq!(config.auto_pow_bits, 0);
    }

    #[test]
    fn zero_cache_size_rejected() {
        let config = ChatConfig {
            max_cache_size: 0,
            ..ChatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rebroadcast_rejected() {
        let config = ChatConfig {
            rebroadcast_secs: 0,
            ..ChatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn excessive_auto_pow_rejected() {
        let config = ChatConfig {
            auto_pow_bits: MAX_POW_BITS + 1,
            ..ChatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rebroadcast_interval_conversion() {
        let config = ChatConfig {
            rebroadcast_secs: 90,
            ..ChatConfig::default()
        };
        assert_eq!(config.rebroadcast_interval(), Duration::from_secs(90));
    }
}
