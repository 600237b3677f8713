//! Configuration for an engine instance.

/// Configuration for an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// RNG seed for reproducible dice. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// How often `dispatch_with_retry` re-runs a request after a conflict.
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_retries: 3,
        }
    }
}

impl EngineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the retry budget (at most 10).
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.min(10);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn builder_methods() {
        let cfg = EngineConfig::default().with_seed(123).with_max_retries(5);
        assert_eq!(cfg.seed, Some(123));
        assert_eq!(cfg.max_retries, 5);
    }

    #[test]
    fn retries_clamped() {
        let cfg = EngineConfig::default().with_max_retries(99);
        assert_eq!(cfg.max_retries, 10);
    }
}
