//! Controller configuration

use serde::{Deserialize, Serialize};

/// Controller configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Game variant tag resolved through the registry
    pub variant: String,
    /// Current game phase (data id in the phase schedule)
    pub phase: String,
    /// Advisory computation settings
    pub advisory: AdvisoryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            variant: "base".to_string(),
            phase: "2".to_string(),
            advisory: AdvisoryConfig::default(),
        }
    }
}

/// Background advisory computation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Run the advisory route search at all
    pub enabled: bool,
    /// Bound of the worker-to-controller note channel
    pub channel_capacity: usize,
    /// Randomized restarts the bundled greedy search performs
    pub restarts: u8,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 16,
            restarts: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ControllerConfig::default();
        assert_eq!(config.variant, "base");
        assert!(config.advisory.enabled);
        assert!(config.advisory.channel_capacity > 0);
    }
}
