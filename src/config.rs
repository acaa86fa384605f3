//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Local part of the support address that replies are routed through.
pub const DEFAULT_SUPPORT_MAILBOX: &str = "support";

/// Substrings that mark an automated sender.
pub const DEFAULT_SENDER_DENYLIST: &[&str] =
    &["noreply", "no-reply", "mailer-daemon", "postmaster", "bounce"];

const DEFAULT_DB_PATH: &str = "./data/tikm.db";

/// Pipeline configuration, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Mailbox local part, e.g. `support` in `support+<uuid>@host`.
    pub support_mailbox: String,
    /// Case-insensitive substrings; any hit rejects the sender.
    pub sender_denylist: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            support_mailbox: DEFAULT_SUPPORT_MAILBOX.to_string(),
            sender_denylist: DEFAULT_SENDER_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `TIKM_SUPPORT_MAILBOX` — local part (no `@`)
    /// - `TIKM_SENDER_DENYLIST` — comma-separated substrings
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("TIKM_SUPPORT_MAILBOX").ok(),
            std::env::var("TIKM_SENDER_DENYLIST").ok(),
        )
    }

    fn from_vars(mailbox: Option<String>, denylist: Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(mailbox) = mailbox {
            let mailbox = mailbox.trim();
            if mailbox.is_empty() || mailbox.contains('@') {
                return Err(ConfigError::InvalidValue {
                    key: "TIKM_SUPPORT_MAILBOX".into(),
                    message: format!("expected a bare local part, got {mailbox:?}"),
                });
            }
            config.support_mailbox = mailbox.to_string();
        }

        if let Some(denylist) = denylist {
            config.sender_denylist = denylist
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }
}

/// Configuration for the mail-pipe binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    /// libSQL database file (`TIKM_DB_PATH`).
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("TIKM_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

        Ok(Self {
            pipeline: PipelineConfig::from_env()?,
            db_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_automated_senders() {
        let config = PipelineConfig::default();
        assert_eq!(config.support_mailbox, "support");
        assert_eq!(config.sender_denylist.len(), 5);
        assert!(config.sender_denylist.iter().any(|s| s == "mailer-daemon"));
    }

    #[test]
    fn vars_override_defaults() {
        let config = PipelineConfig::from_vars(
            Some(" helpdesk ".into()),
            Some("NoReply, daemon,,".into()),
        )
        .unwrap();
        assert_eq!(config.support_mailbox, "helpdesk");
        assert_eq!(config.sender_denylist, vec!["noreply", "daemon"]);
    }

    #[test]
    fn mailbox_with_domain_is_rejected() {
        let err = PipelineConfig::from_vars(Some("support@tikm.test".into()), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn empty_mailbox_is_rejected() {
        assert!(PipelineConfig::from_vars(Some("  ".into()), None).is_err());
    }
}
