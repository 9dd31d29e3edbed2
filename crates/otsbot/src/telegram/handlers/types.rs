//! Handler types and dependencies

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::User;

use otscore::registration::types::ApplicantId;
use otscore::Core;

use crate::telegram::messages::Pricing;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub core: Arc<Core>,
    pub pricing: Arc<Pricing>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(core: Arc<Core>, pricing: Arc<Pricing>) -> Self {
        Self { core, pricing }
    }

    pub fn review_chat(&self) -> ChatId {
        ChatId(self.core.review_channel_id)
    }

    pub fn is_admin(&self, user: &User) -> bool {
        actor_id(user).is_some_and(|id| self.core.approvals.is_admin(id))
    }
}

/// Telegram user id as the signed id used throughout the core.
pub fn actor_id(user: &User) -> Option<i64> {
    i64::try_from(user.id.0).ok()
}

/// Applicants are identified by their user id, which is also their private chat id.
pub fn applicant_id(user: &User) -> Option<ApplicantId> {
    actor_id(user).map(ApplicantId)
}
