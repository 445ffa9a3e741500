use pt_base::Result;
use serde::{Deserialize, Serialize};

/// The run-configuration surface: everything a `pt-driver::run` call or
/// the `pt` demo binary needs, loadable from a TOML file so a run is
/// reproducible from a single artifact alongside its `seed`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seed: u64,
    pub n_rounds: u64,
    pub n_chains: u32,
    pub n_chains_variational: u32,
    pub checkpoint: bool,
    pub checked_round: u64,
    pub multithreaded: bool,
    /// Re-run `adapt_tempering` at every round boundary rather than only
    /// after round 1.
    pub continuous_adaptation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: 1,
            n_rounds: 10,
            n_chains: 10,
            n_chains_variational: 0,
            checkpoint: false,
            checked_round: 0,
            multithreaded: false,
            continuous_adaptation: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn is_variational(&self) -> bool {
        self.n_chains_variational > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_default_config_matches_stated_defaults() {
        let config = Config::default();
        assert_eq!(config.seed, 1);
        assert_eq!(config.n_rounds, 10);
        assert_eq!(config.n_chains, 10);
        assert_eq!(config.n_chains_variational, 0);
        assert!(!config.checkpoint);
        assert_eq!(config.checked_round, 0);
        assert!(!config.multithreaded);
        assert!(!config.continuous_adaptation);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = Config::default();
        config.seed = 42;
        config.n_chains = 8;
        let text = config.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str("seed = 99\n").unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.n_rounds, 10);
    }
}
