// Raffle Sweeper - Utility Functions
use chrono::Utc;
use std::collections::HashSet;

use crate::state::{ChannelId, UserId};

/// Current wall-clock time in epoch millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Oldest end timestamp a raffle may have and still survive retention
pub fn retention_cutoff(now: i64, retention_millis: i64) -> i64 {
    now.saturating_sub(retention_millis)
}

/// Mention markup for a user
pub fn mention_user(user: &UserId) -> String {
    format!("<@{}>", user)
}

/// Mention markup for a channel
pub fn mention_channel(channel: &ChannelId) -> String {
    format!("<#{}>", channel)
}

/// Comma separated mentions in draw order
pub fn mention_all(users: &[UserId]) -> String {
    users.iter().map(mention_user).collect::<Vec<_>>().join(", ")
}

/// Relative timestamp markup rendered by the client, from epoch millis
pub fn timestamp_markup(epoch_millis: i64) -> String {
    format!("<t:{}>", epoch_millis.div_euclid(1000))
}

/// Drop repeated identifiers and the bot's own, keeping first-seen order
pub fn distinct_participants(users: Vec<UserId>, bot_user_id: &UserId) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(users.len());
    users
        .into_iter()
        .filter(|user| user != bot_user_id && seen.insert(user.clone()))
        .collect()
}
