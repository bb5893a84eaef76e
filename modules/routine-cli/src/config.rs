use anyhow::{Context, Result};

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Default `tracing` directive, added on top of `RUST_LOG`.
    pub log_directive: String,
    /// Multiplier applied to every `DELAY` control's `ms`.
    pub delay_scale: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_directive: "routine=info".to_string(),
            delay_scale: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_directive: lookup("ROUTINE_LOG").unwrap_or(defaults.log_directive),
            delay_scale: match lookup("ROUTINE_DELAY_SCALE") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("ROUTINE_DELAY_SCALE must be a number, got {raw:?}"))?,
                None => defaults.delay_scale,
            },
        })
    }

    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  ROUTINE_LOG: {}", self.log_directive);
        tracing::info!("  ROUTINE_DELAY_SCALE: {}", self.delay_scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_vars_use_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn vars_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("ROUTINE_LOG", "routine=debug"),
            ("ROUTINE_DELAY_SCALE", " 0 "),
        ]))
        .unwrap();
        assert_eq!(config.log_directive, "routine=debug");
        assert_eq!(config.delay_scale, 0);
    }

    #[test]
    fn bad_delay_scale_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("ROUTINE_DELAY_SCALE", "fast")])).unwrap_err();
        assert!(err.to_string().contains("ROUTINE_DELAY_SCALE"));
    }
}
