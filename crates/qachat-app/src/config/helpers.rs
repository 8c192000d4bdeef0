use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Non-empty value of an environment variable
pub fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `QACHAT_<key>`
pub fn qachat_env(key: &str) -> Option<String> {
    env_var(&format!("QACHAT_{}", key))
}

/// Parse `QACHAT_<key>` when set
pub fn parse_qachat_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match qachat_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for QACHAT_{}: {:?}", key, raw)),
        None => Ok(None),
    }
}

/// First non-empty variable among `names`
pub fn first_env_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| env_var(name))
}
