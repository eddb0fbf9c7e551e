use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).unwrap_or(default)
}

/// Parse `key` from the environment. Empty values count as unset.
pub fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.trim().parse().ok())
}
