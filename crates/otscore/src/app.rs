//! Wiring of the registration components

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Settings;
use crate::core::error::{AppError, AppResult};
use crate::core::rate_limiter::RateLimiter;
use crate::payment::chapa::ChapaClient;
use crate::payment::gateway::PaymentGateway;
use crate::payment::ledger::Ledger;
use crate::payment::orchestrator::{PaymentConfig, PaymentOrchestrator};
use crate::registration::approval::ApprovalGate;
use crate::registration::correlation::{CorrelationMap, ReplyTargets};
use crate::registration::events::{ChannelDirectory, EventBus, EventReceiver};
use crate::registration::registry::Registry;
use crate::registration::wizard::Wizard;

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret())
}

/// Every component, sharing one registry and one event bus.
pub struct Core {
    pub registry: Arc<Registry>,
    pub wizard: Wizard,
    pub approvals: ApprovalGate,
    pub payments: Arc<PaymentOrchestrator>,
    pub correlation: CorrelationMap,
    pub reply_targets: ReplyTargets,
    pub rate_limiter: RateLimiter,
    pub review_channel_id: i64,
}

impl Core {
    pub fn new(
        settings: &Settings,
        gateway: Arc<dyn PaymentGateway>,
        directory: Arc<dyn ChannelDirectory>,
    ) -> AppResult<(Self, EventReceiver)> {
        let admin_id = settings
            .admin_id
            .ok_or_else(|| AppError::Config("ADMIN_ID is not set".to_string()))?;
        let review_channel_id = settings
            .review_channel_id
            .ok_or_else(|| AppError::Config("REVIEW_CHANNEL_ID is not set".to_string()))?;

        let (events, rx) = EventBus::channel();
        let registry = Arc::new(Registry::in_memory());
        let ledger = Arc::new(Ledger::new());

        let wizard = Wizard::new(Arc::clone(&registry), settings.field_rules, directory, events.clone());
        let approvals = ApprovalGate::new(
            Arc::clone(&registry),
            admin_id,
            settings.fees.clone(),
            settings.auto_initiate_payment,
            events.clone(),
        );
        let payments = Arc::new(PaymentOrchestrator::new(
            Arc::clone(&registry),
            ledger,
            gateway,
            PaymentConfig {
                fees: settings.fees.clone(),
                teacher_share: settings.teacher_share,
                webhook_secret: copy_secret(&settings.webhook_secret),
                callback_url: settings.callback_url(),
                return_url: settings.return_url(),
                placeholder_email: settings.placeholder_email.clone(),
            },
            events,
        ));

        let core = Self {
            registry,
            wizard,
            approvals,
            payments,
            correlation: CorrelationMap::new(),
            reply_targets: ReplyTargets::new(),
            rate_limiter: RateLimiter::new(settings.rate_limit_max, settings.rate_limit_window),
            review_channel_id,
        };
        Ok((core, rx))
    }

    /// Builds the core with the Chapa client from `settings`.
    pub fn with_chapa(settings: &Settings, directory: Arc<dyn ChannelDirectory>) -> AppResult<(Self, EventReceiver)> {
        let chapa = ChapaClient::new(
            settings.chapa_api_url.clone(),
            copy_secret(&settings.chapa_secret_key),
            settings.gateway_timeout,
        )
        .map_err(|e| AppError::Config(format!("cannot build gateway client: {}", e)))?;
        Self::new(settings, Arc::new(chapa), directory)
    }

    /// Expires inactive sessions every `interval` until the task is dropped.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, timeout: Duration) {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::minutes(30));
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = self.registry.expire_inactive(Utc::now(), timeout);
            if !expired.is_empty() {
                log::info!("Expired {} inactive session(s)", expired.len());
            }
            self.rate_limiter.cleanup().await;
        }
    }
}
