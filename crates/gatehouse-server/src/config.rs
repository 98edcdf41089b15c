use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::warn;

use gatehouse_lifecycle::LifecyclePolicy;
use gatehouse_lifecycle::policy::DEFAULT_WINDOW_SECS;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
const SHORT_WINDOW_SECS: u64 = 3600;
/// One hundred years.
const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub approval_window_secs: u64,
    pub reapproval_window_secs: u64,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their
    /// defaults; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_window = DEFAULT_WINDOW_SECS as u64;

        let config = Self {
            db_path: lookup("GATEHOUSE_DB_PATH")
                .unwrap_or_else(|| "gatehouse.db".into())
                .into(),
            host: lookup("GATEHOUSE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&lookup, "GATEHOUSE_PORT", DEFAULT_PORT)?,
            approval_window_secs: parsed(
                &lookup,
                "GATEHOUSE_APPROVAL_WINDOW_SECS",
                default_window,
            )?,
            reapproval_window_secs: parsed(
                &lookup,
                "GATEHOUSE_REAPPROVAL_WINDOW_SECS",
                default_window,
            )?,
            sweep_interval: Duration::from_secs(parsed(
                &lookup,
                "GATEHOUSE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
        };

        if config.approval_window_secs == 0 || config.reapproval_window_secs == 0 {
            bail!("approval windows must be at least one second");
        }
        if config.approval_window_secs > MAX_WINDOW_SECS
            || config.reapproval_window_secs > MAX_WINDOW_SECS
        {
            bail!("approval windows must not exceed {} seconds", MAX_WINDOW_SECS);
        }
        if config.sweep_interval.is_zero() {
            bail!("GATEHOUSE_SWEEP_INTERVAL_SECS must be at least 1");
        }

        Ok(config)
    }

    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            approval_window: chrono::Duration::seconds(self.approval_window_secs as i64),
            reapproval_window: chrono::Duration::seconds(self.reapproval_window_secs as i64),
        }
    }

    /// Logs a warning for windows short enough to look like test settings.
    pub fn warn_if_short(&self) {
        if self.approval_window_secs < SHORT_WINDOW_SECS {
            warn!(
                "Approval window is only {} seconds, devices will expire quickly",
                self.approval_window_secs
            );
        }
        if self.reapproval_window_secs < SHORT_WINDOW_SECS {
            warn!(
                "Re-approval window is only {} seconds, devices will expire quickly",
                self.reapproval_window_secs
            );
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("gatehouse.db"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.approval_window_secs, 259_200);
        assert_eq!(config.reapproval_window_secs, 259_200);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.policy(), LifecyclePolicy::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("GATEHOUSE_PORT", "8080"),
            ("GATEHOUSE_APPROVAL_WINDOW_SECS", "180"),
            ("GATEHOUSE_SWEEP_INTERVAL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.policy().approval_window,
            chrono::Duration::minutes(3)
        );
        assert_eq!(config.policy().reapproval_window, chrono::Duration::days(3));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn bad_values_fail() {
        assert!(config(&[("GATEHOUSE_PORT", "http")]).is_err());
        assert!(config(&[("GATEHOUSE_APPROVAL_WINDOW_SECS", "-5")]).is_err());
        assert!(config(&[("GATEHOUSE_APPROVAL_WINDOW_SECS", "0")]).is_err());
        assert!(config(&[("GATEHOUSE_SWEEP_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn oversized_windows_fail() {
        assert!(config(&[("GATEHOUSE_APPROVAL_WINDOW_SECS", "3153600000")]).is_ok());
        assert!(config(&[("GATEHOUSE_APPROVAL_WINDOW_SECS", "3153600001")]).is_err());
        let huge = i64::MAX.to_string();
        assert!(config(&[("GATEHOUSE_REAPPROVAL_WINDOW_SECS", huge.as_str())]).is_err());
    }
}
