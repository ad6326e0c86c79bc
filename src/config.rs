//! Runtime settings read from the environment.
//!
//! | variable                          | default        |
//! |-----------------------------------|----------------|
//! | `BATTLE_MITRA_ADMIN_EMAILS`       | none           |
//! | `BATTLE_MITRA_CHANNEL_CAPACITY`   | `16`           |
//! | `BATTLE_MITRA_DEPOSIT_METHOD`     | `Google Pay`   |

use tracing::warn;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;
pub const DEFAULT_DEPOSIT_METHOD: &str = "Google Pay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Lowercase emails that receive the admin role when their profile is created.
    pub admin_emails: Vec<String>,
    /// Capacity of the command channel in front of the platform.
    pub channel_capacity: usize,
    /// Payment method recorded on player deposit requests.
    pub deposit_method: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            deposit_method: DEFAULT_DEPOSIT_METHOD.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unusable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let admin_emails = lookup("BATTLE_MITRA_ADMIN_EMAILS")
            .map(|value| {
                value
                    .split(',')
                    .map(|email| email.trim().to_lowercase())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let channel_capacity = match lookup("BATTLE_MITRA_CHANNEL_CAPACITY") {
            None => DEFAULT_CHANNEL_CAPACITY,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    warn!(value, "invalid BATTLE_MITRA_CHANNEL_CAPACITY, using default");
                    DEFAULT_CHANNEL_CAPACITY
                }
            },
        };

        let deposit_method = lookup("BATTLE_MITRA_DEPOSIT_METHOD")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DEPOSIT_METHOD.to_string());

        Self {
            admin_emails,
            channel_capacity,
            deposit_method,
        }
    }

    pub fn with_admin(mut self, email: &str) -> Self {
        self.admin_emails.push(email.trim().to_lowercase());
        self
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn admin_emails_are_split_and_lowercased() {
        let config = config(&[("BATTLE_MITRA_ADMIN_EMAILS", " Ops@Example.com, ,root@example.com")]);
        assert_eq!(config.admin_emails, vec!["ops@example.com", "root@example.com"]);
        assert!(config.is_admin_email("OPS@example.com"));
        assert!(!config.is_admin_email("player@example.com"));
    }

    #[test]
    fn invalid_capacity_falls_back() {
        assert_eq!(
            config(&[("BATTLE_MITRA_CHANNEL_CAPACITY", "zero")]).channel_capacity,
            DEFAULT_CHANNEL_CAPACITY
        );
        assert_eq!(
            config(&[("BATTLE_MITRA_CHANNEL_CAPACITY", "0")]).channel_capacity,
            DEFAULT_CHANNEL_CAPACITY
        );
        assert_eq!(
            config(&[("BATTLE_MITRA_CHANNEL_CAPACITY", "64")]).channel_capacity,
            64
        );
    }

    #[test]
    fn blank_deposit_method_uses_default() {
        assert_eq!(
            config(&[("BATTLE_MITRA_DEPOSIT_METHOD", "  ")]).deposit_method,
            DEFAULT_DEPOSIT_METHOD
        );
        assert_eq!(
            config(&[("BATTLE_MITRA_DEPOSIT_METHOD", "PhonePe")]).deposit_method,
            "PhonePe"
        );
    }
}
