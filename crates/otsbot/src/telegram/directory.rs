//! Review channel metadata through the Bot API

use async_trait::async_trait;
use teloxide::prelude::*;

use otscore::registration::events::{ChannelDirectory, ChannelInfo};

/// Looks up the review channel with `getChat` and `getChatMemberCount`.
pub struct TelegramDirectory {
    bot: Bot,
    channel: ChatId,
}

impl TelegramDirectory {
    pub fn new(bot: Bot, channel: ChatId) -> Self {
        Self { bot, channel }
    }
}

#[async_trait]
impl ChannelDirectory for TelegramDirectory {
    async fn review_channel(&self) -> Option<ChannelInfo> {
        let chat = match self.bot.get_chat(self.channel).await {
            Ok(chat) => chat,
            Err(e) => {
                log::warn!("Failed to fetch review channel {}: {}", self.channel, e);
                return None;
            }
        };

        let member_count = match self.bot.get_chat_member_count(self.channel).await {
            Ok(count) => Some(count),
            Err(e) => {
                log::debug!("Member count unavailable for {}: {}", self.channel, e);
                None
            }
        };

        Some(ChannelInfo {
            title: chat.title().map(str::to_string),
            invite_link: chat.invite_link().map(str::to_string),
            member_count,
        })
    }
}
