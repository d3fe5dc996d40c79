// Raffle Sweeper - Chat platform boundary
use async_trait::async_trait;

use crate::config::CLAIM_BUTTON_PREFIX;
use crate::error::ChatError;
use crate::state::{ChannelId, CommunityId, MessageId, RaffleId, UserId};

/// Interactive element attached to a channel message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Component {
    /// Button routed back to the claim interaction by its custom ID
    ClaimButton { custom_id: String, label: String },
}

impl Component {
    /// Claim button scoped to one raffle
    pub fn claim_button(raffle_id: &RaffleId) -> Self {
        Component::ClaimButton {
            custom_id: claim_custom_id(raffle_id),
            label: "Claim Prize".to_owned(),
        }
    }
}

pub fn claim_custom_id(raffle_id: &RaffleId) -> String {
    format!("{}{}", CLAIM_BUTTON_PREFIX, raffle_id)
}

/// Who opted in to a raffle
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    /// Identity of the bot itself, never a participant
    fn bot_user_id(&self) -> &UserId;

    /// Users who reacted to the announcement with `emoji`.
    /// Fails with `ChatError::NotFound` if the message no longer exists.
    async fn fetch_participants(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<Vec<UserId>, ChatError>;

    /// Current display name of a community member
    async fn display_name(&self, community_id: &CommunityId, user_id: &UserId) -> Option<String>;
}

/// Outbound messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        components: &[Component],
    ) -> Result<MessageId, ChatError>;

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ChatError>;

    async fn send_direct_message(&self, user_id: &UserId, content: &str) -> Result<(), ChatError>;

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ChatError>;
}
