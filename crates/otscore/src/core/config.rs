use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::registration::fee::FeeSchedule;
use crate::registration::validation::FieldRules;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| env_first(&["BOT_TOKEN", "TELOXIDE_TOKEN"]).unwrap_or_default());

/// Externally reachable base URL of the webhook server
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env_first(&["WEBHOOK_URL"]));

/// Webhook server port
/// Read from PORT environment variable
/// Default: 3000
pub static PORT: Lazy<u16> = Lazy::new(|| env_parse("PORT").unwrap_or(3000));

/// Administrator and review channel
pub mod admin {
    use once_cell::sync::Lazy;

    /// The single administrator allowed to approve or reject
    /// Read from ADMIN_ID environment variable
    pub static ADMIN_ID: Lazy<Option<i64>> = Lazy::new(|| super::env_parse("ADMIN_ID"));

    /// Channel receiving submissions for review
    /// Read from REVIEW_CHANNEL_ID, DB_CHANNEL_ID or CHANNEL_ID
    pub static REVIEW_CHANNEL_ID: Lazy<Option<i64>> = Lazy::new(|| {
        super::env_first(&["REVIEW_CHANNEL_ID", "DB_CHANNEL_ID", "CHANNEL_ID"]).and_then(|v| v.trim().parse().ok())
    });
}

/// Chapa payment gateway
pub mod chapa {
    use once_cell::sync::Lazy;
    use std::env;

    pub const DEFAULT_API_URL: &str = "https://api.chapa.co/v1";

    /// Read from CHAPA_SECRET_KEY environment variable
    pub static SECRET_KEY: Lazy<String> = Lazy::new(|| env::var("CHAPA_SECRET_KEY").unwrap_or_default());

    /// HMAC secret for webhook signatures
    /// Read from CHAPA_WEBHOOK_SECRET, falls back to the secret key
    pub static WEBHOOK_SECRET: Lazy<String> = Lazy::new(|| {
        super::env_first(&["CHAPA_WEBHOOK_SECRET"]).unwrap_or_else(|| SECRET_KEY.clone())
    });

    /// Read from CHAPA_API_URL environment variable
    pub static API_URL: Lazy<String> =
        Lazy::new(|| super::env_first(&["CHAPA_API_URL"]).unwrap_or_else(|| DEFAULT_API_URL.to_string()));

    /// Gateway request timeout
    /// Read from GATEWAY_TIMEOUT_SECS environment variable
    /// Default: 30 seconds
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| super::env_parse("GATEWAY_TIMEOUT_SECS").unwrap_or(30));

    /// Email sent to the gateway when the applicant skipped it
    pub static PLACEHOLDER_EMAIL: Lazy<String> = Lazy::new(|| {
        super::env_first(&["PLACEHOLDER_EMAIL"]).unwrap_or_else(|| "customer@example.com".to_string())
    });
}

/// Registration fee and commission
pub mod pricing {
    use once_cell::sync::Lazy;

    /// Read from STANDARD_FEE environment variable
    /// Default: 99
    pub static STANDARD_FEE: Lazy<f64> = Lazy::new(|| super::env_parse("STANDARD_FEE").unwrap_or(99.0));

    /// Read from PENALTY_FEE environment variable
    /// Default: 149
    pub static PENALTY_FEE: Lazy<f64> = Lazy::new(|| super::env_parse("PENALTY_FEE").unwrap_or(149.0));

    /// Read from CURRENCY environment variable
    /// Default: ETB
    pub static CURRENCY: Lazy<String> =
        Lazy::new(|| super::env_first(&["CURRENCY"]).unwrap_or_else(|| "ETB".to_string()));

    /// Share of a verified payment credited to the applicant
    /// Read from TEACHER_SHARE environment variable
    /// Default: 0.55
    pub static TEACHER_SHARE: Lazy<f64> = Lazy::new(|| super::env_parse("TEACHER_SHARE").unwrap_or(0.55));

    /// Hours after registration start before the penalty fee applies
    /// Read from PENALTY_AFTER_HOURS environment variable
    /// Default: 24
    pub static PENALTY_AFTER_HOURS: Lazy<i64> = Lazy::new(|| super::env_parse("PENALTY_AFTER_HOURS").unwrap_or(24));
}

/// Wizard and approval behaviour
pub mod registration {
    use once_cell::sync::Lazy;

    /// Read from CHANNEL_URL_REQUIRED environment variable
    /// Default: true
    pub static CHANNEL_URL_REQUIRED: Lazy<bool> =
        Lazy::new(|| super::env_parse("CHANNEL_URL_REQUIRED").unwrap_or(true));

    /// Read from EMAIL_REQUIRED environment variable
    /// Default: false
    pub static EMAIL_REQUIRED: Lazy<bool> = Lazy::new(|| super::env_parse("EMAIL_REQUIRED").unwrap_or(false));

    /// Start checkout right after approval instead of waiting for "Pay Now"
    /// Read from AUTO_INITIATE_PAYMENT environment variable
    /// Default: false
    pub static AUTO_INITIATE_PAYMENT: Lazy<bool> =
        Lazy::new(|| super::env_parse("AUTO_INITIATE_PAYMENT").unwrap_or(false));
}

/// Session expiry
pub mod session {
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// Read from SESSION_TIMEOUT_MINUTES environment variable
    /// Default: 30 minutes
    pub static TIMEOUT_MINUTES: Lazy<u64> = Lazy::new(|| super::env_parse("SESSION_TIMEOUT_MINUTES").unwrap_or(30));

    /// Read from SWEEP_INTERVAL_MINUTES environment variable
    /// Default: 15 minutes
    pub static SWEEP_INTERVAL_MINUTES: Lazy<u64> =
        Lazy::new(|| super::env_parse("SWEEP_INTERVAL_MINUTES").unwrap_or(15));

    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_MINUTES * 60)
    }

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(*SWEEP_INTERVAL_MINUTES * 60)
    }
}

/// Rate limiting configuration
pub mod rate_limit {
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// Events allowed per window
    /// Read from RATE_LIMIT_MAX environment variable
    /// Default: 30
    pub static MAX_EVENTS: Lazy<u32> = Lazy::new(|| super::env_parse("RATE_LIMIT_MAX").unwrap_or(30));

    /// Read from RATE_LIMIT_WINDOW_SECS environment variable
    /// Default: 60 seconds
    pub static WINDOW_SECS: Lazy<u64> = Lazy::new(|| super::env_parse("RATE_LIMIT_WINDOW_SECS").unwrap_or(60));

    pub fn window() -> Duration {
        Duration::from_secs(*WINDOW_SECS)
    }
}

/// Snapshot of the configuration, injected into the components.
#[derive(Debug)]
pub struct Settings {
    pub bot_token: SecretString,
    pub admin_id: Option<i64>,
    pub review_channel_id: Option<i64>,
    pub chapa_secret_key: SecretString,
    pub webhook_secret: SecretString,
    pub chapa_api_url: String,
    pub webhook_url: Option<String>,
    pub port: u16,
    pub fees: FeeSchedule,
    pub teacher_share: f64,
    pub field_rules: FieldRules,
    pub auto_initiate_payment: bool,
    pub placeholder_email: String,
    pub session_timeout: Duration,
    pub sweep_interval: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub gateway_timeout: Duration,
    pub log_file_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: SecretString::from(String::new()),
            admin_id: None,
            review_channel_id: None,
            chapa_secret_key: SecretString::from(String::new()),
            webhook_secret: SecretString::from(String::new()),
            chapa_api_url: chapa::DEFAULT_API_URL.to_string(),
            webhook_url: None,
            port: 3000,
            fees: FeeSchedule::default(),
            teacher_share: 0.55,
            field_rules: FieldRules::default(),
            auto_initiate_payment: false,
            placeholder_email: "customer@example.com".to_string(),
            session_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(15 * 60),
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(60),
            gateway_timeout: Duration::from_secs(30),
            log_file_path: "app.log".to_string(),
        }
    }
}

impl Settings {
    /// Reads every variable once through the statics above.
    pub fn from_env() -> Self {
        Self {
            bot_token: SecretString::from(BOT_TOKEN.clone()),
            admin_id: *admin::ADMIN_ID,
            review_channel_id: *admin::REVIEW_CHANNEL_ID,
            chapa_secret_key: SecretString::from(chapa::SECRET_KEY.clone()),
            webhook_secret: SecretString::from(chapa::WEBHOOK_SECRET.clone()),
            chapa_api_url: chapa::API_URL.trim_end_matches('/').to_string(),
            webhook_url: WEBHOOK_URL.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            port: *PORT,
            fees: FeeSchedule {
                standard: *pricing::STANDARD_FEE,
                penalty: *pricing::PENALTY_FEE,
                currency: pricing::CURRENCY.clone(),
                penalty_after: chrono::Duration::hours(*pricing::PENALTY_AFTER_HOURS),
            },
            teacher_share: *pricing::TEACHER_SHARE,
            field_rules: FieldRules {
                channel_url_required: *registration::CHANNEL_URL_REQUIRED,
                email_required: *registration::EMAIL_REQUIRED,
            },
            auto_initiate_payment: *registration::AUTO_INITIATE_PAYMENT,
            placeholder_email: chapa::PLACEHOLDER_EMAIL.clone(),
            session_timeout: session::timeout(),
            sweep_interval: session::sweep_interval(),
            rate_limit_max: *rate_limit::MAX_EVENTS,
            rate_limit_window: rate_limit::window(),
            gateway_timeout: Duration::from_secs(*chapa::TIMEOUT_SECS),
            log_file_path: LOG_FILE_PATH.clone(),
        }
    }

    /// Names of required variables that are missing or unparsable.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bot_token.expose_secret().is_empty() {
            missing.push("BOT_TOKEN");
        }
        if self.admin_id.is_none() {
            missing.push("ADMIN_ID");
        }
        if self.review_channel_id.is_none() {
            missing.push("REVIEW_CHANNEL_ID");
        }
        if self.chapa_secret_key.expose_secret().is_empty() {
            missing.push("CHAPA_SECRET_KEY");
        }
        if self.webhook_url.is_none() {
            missing.push("WEBHOOK_URL");
        }
        missing
    }

    /// Fails with every missing variable listed at once.
    pub fn validate(&self) -> AppResult<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }
        if !(0.0..=1.0).contains(&self.teacher_share) {
            return Err(AppError::Config(format!(
                "TEACHER_SHARE must be between 0 and 1, got {}",
                self.teacher_share
            )));
        }
        if let Some(url) = &self.webhook_url {
            url::Url::parse(url)?;
        }
        url::Url::parse(&self.chapa_api_url)?;
        Ok(())
    }

    /// Gateway callback for payment notifications.
    pub fn callback_url(&self) -> String {
        format!("{}/verify", self.webhook_url.as_deref().unwrap_or_default())
    }

    /// Where the gateway sends the applicant after checkout.
    pub fn return_url(&self) -> String {
        format!("{}/success", self.webhook_url.as_deref().unwrap_or_default())
    }

    /// Human-readable dump with secrets masked.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        fn mask(secret: &SecretString) -> String {
            let s = secret.expose_secret();
            if s.is_empty() {
                "<unset>".to_string()
            } else {
                format!("<set, {} chars>", s.chars().count())
            }
        }
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "<unset>".to_string())
        }

        vec![
            ("BOT_TOKEN", mask(&self.bot_token)),
            ("ADMIN_ID", opt(&self.admin_id)),
            ("REVIEW_CHANNEL_ID", opt(&self.review_channel_id)),
            ("CHAPA_SECRET_KEY", mask(&self.chapa_secret_key)),
            ("CHAPA_WEBHOOK_SECRET", mask(&self.webhook_secret)),
            ("CHAPA_API_URL", self.chapa_api_url.clone()),
            ("WEBHOOK_URL", opt(&self.webhook_url)),
            ("PORT", self.port.to_string()),
            ("STANDARD_FEE", self.fees.standard.to_string()),
            ("PENALTY_FEE", self.fees.penalty.to_string()),
            ("CURRENCY", self.fees.currency.clone()),
            ("TEACHER_SHARE", self.teacher_share.to_string()),
            ("PENALTY_AFTER_HOURS", self.fees.penalty_after.num_hours().to_string()),
            ("CHANNEL_URL_REQUIRED", self.field_rules.channel_url_required.to_string()),
            ("EMAIL_REQUIRED", self.field_rules.email_required.to_string()),
            ("AUTO_INITIATE_PAYMENT", self.auto_initiate_payment.to_string()),
            ("PLACEHOLDER_EMAIL", self.placeholder_email.clone()),
            ("SESSION_TIMEOUT_MINUTES", (self.session_timeout.as_secs() / 60).to_string()),
            ("SWEEP_INTERVAL_MINUTES", (self.sweep_interval.as_secs() / 60).to_string()),
            ("RATE_LIMIT_MAX", self.rate_limit_max.to_string()),
            ("RATE_LIMIT_WINDOW_SECS", self.rate_limit_window.as_secs().to_string()),
            ("GATEWAY_TIMEOUT_SECS", self.gateway_timeout.as_secs().to_string()),
            ("LOG_FILE_PATH", self.log_file_path.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Settings {
        Settings {
            bot_token: SecretString::from("123:abc".to_string()),
            admin_id: Some(1),
            review_channel_id: Some(-100),
            chapa_secret_key: SecretString::from("CHASECK_TEST".to_string()),
            webhook_url: Some("https://bot.example.com".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_settings_report_every_missing_variable() {
        let settings = Settings::default();
        assert_eq!(
            settings.missing(),
            vec![
                "BOT_TOKEN",
                "ADMIN_ID",
                "REVIEW_CHANNEL_ID",
                "CHAPA_SECRET_KEY",
                "WEBHOOK_URL"
            ]
        );
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("ADMIN_ID"));
        assert!(err.contains("WEBHOOK_URL"));
    }

    #[test]
    fn test_complete_settings_validate() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_share_out_of_range_is_rejected() {
        let settings = Settings {
            teacher_share: 1.5,
            ..complete()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_gateway_urls_derive_from_webhook_base() {
        let settings = complete();
        assert_eq!(settings.callback_url(), "https://bot.example.com/verify");
        assert_eq!(settings.return_url(), "https://bot.example.com/success");
    }

    #[test]
    fn test_describe_masks_secrets() {
        let described = complete().describe();
        let token = described.iter().find(|(k, _)| *k == "BOT_TOKEN").map(|(_, v)| v.clone());
        assert_eq!(token.as_deref(), Some("<set, 7 chars>"));
        assert!(!described.iter().any(|(_, v)| v.contains("CHASECK_TEST")));
    }
}
