use std::env;
use std::path::PathBuf;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const STATE_PATH: &str = "REPLYBOT_STATE_PATH";
    pub const CONFIG_DIR: &str = "REPLYBOT_CONFIG_DIR";
    pub const LOG_FILE: &str = "REPLYBOT_LOG_FILE";
    pub const API_BASE: &str = "REPLYBOT_API_BASE";
}

/// Default values
pub mod defaults {
    pub const STATE_PATH: &str = "./.state/replybot.json";
    pub const CONFIG_DIR: &str = "./config";
    pub const API_BASE: &str = "https://api.twitter.com/2";
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file holding the bot's memory between runs
    pub state_path: PathBuf,
    /// Directory containing `campaign.ron`
    pub config_dir: PathBuf,
    /// When set, the log is written here (truncated each run) instead of stderr
    pub log_file: Option<PathBuf>,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Self {
            state_path: PathBuf::from(
                get(env_vars::STATE_PATH).unwrap_or_else(|| defaults::STATE_PATH.to_string()),
            ),
            config_dir: PathBuf::from(
                get(env_vars::CONFIG_DIR).unwrap_or_else(|| defaults::CONFIG_DIR.to_string()),
            ),
            log_file: get(env_vars::LOG_FILE).map(PathBuf::from),
            api_base: get(env_vars::API_BASE).unwrap_or_else(|| defaults::API_BASE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.state_path, PathBuf::from(defaults::STATE_PATH));
        assert_eq!(config.config_dir, PathBuf::from(defaults::CONFIG_DIR));
        assert_eq!(config.log_file, None);
        assert_eq!(config.api_base, defaults::API_BASE);
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = Config::from_lookup(|var| match var {
            env_vars::STATE_PATH => Some("/var/lib/replybot/state.json".to_string()),
            env_vars::LOG_FILE => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.state_path, PathBuf::from("/var/lib/replybot/state.json"));
        assert_eq!(config.log_file, None);
    }
}
