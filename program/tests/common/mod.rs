// Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use raffle_sweeper::chat::{Component, Notifier, ParticipantSource};
use raffle_sweeper::{
    ChannelId, ChatError, CommunityId, Config, LifecycleSweep, MemoryStore, MessageId, Raffle,
    RaffleFilter, RaffleId, RaffleStore, StoreError, UserId, Winner,
};

pub const NOW: i64 = 1_700_000_000_000;
pub const MINUTE: i64 = 60 * 1000;
pub const DAY: i64 = 24 * 60 * MINUTE;
pub const BOT: &str = "bot";
pub const ORGANIZER: &str = "organizer";
pub const COMMUNITY: &str = "guild-1";
pub const CHANNEL: &str = "channel-1";

#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub channel_id: ChannelId,
    pub content: String,
    pub components: Vec<Component>,
}

/// Records every outbound call and serves canned participants
pub struct FakeChat {
    bot: UserId,
    participants: Mutex<HashMap<MessageId, Result<Vec<UserId>, ChatError>>>,
    names: Mutex<HashMap<UserId, String>>,
    failing_dms: Mutex<HashSet<UserId>>,
    post_error: Mutex<Option<ChatError>>,
    next_message: AtomicU64,
    pub posts: Mutex<Vec<Post>>,
    pub edits: Mutex<Vec<(MessageId, String)>>,
    pub dms: Mutex<Vec<(UserId, String)>>,
    pub reactions: Mutex<Vec<(MessageId, String)>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self {
            bot: UserId::from(BOT),
            participants: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            failing_dms: Mutex::new(HashSet::new()),
            post_error: Mutex::new(None),
            next_message: AtomicU64::new(1),
            posts: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            dms: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
        }
    }

    pub fn set_participants(&self, message_id: &str, users: &[&str]) {
        self.participants.lock().unwrap().insert(
            MessageId::from(message_id),
            Ok(users.iter().map(|u| UserId::from(*u)).collect()),
        );
    }

    pub fn set_participants_error(&self, message_id: &str, error: ChatError) {
        self.participants
            .lock()
            .unwrap()
            .insert(MessageId::from(message_id), Err(error));
    }

    pub fn set_name(&self, user: &str, name: &str) {
        self.names
            .lock()
            .unwrap()
            .insert(UserId::from(user), name.to_owned());
    }

    pub fn fail_dms_to(&self, user: &str) {
        self.failing_dms.lock().unwrap().insert(UserId::from(user));
    }

    pub fn fail_posts_with(&self, error: Option<ChatError>) {
        *self.post_error.lock().unwrap() = error;
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn dms(&self) -> Vec<(UserId, String)> {
        self.dms.lock().unwrap().clone()
    }

    pub fn dms_to(&self, user: &str) -> Vec<String> {
        self.dms()
            .into_iter()
            .filter(|(to, _)| to.as_str() == user)
            .map(|(_, content)| content)
            .collect()
    }
}

#[async_trait]
impl ParticipantSource for FakeChat {
    fn bot_user_id(&self) -> &UserId {
        &self.bot
    }

    async fn fetch_participants(
        &self,
        _channel_id: &ChannelId,
        message_id: &MessageId,
        _emoji: &str,
    ) -> Result<Vec<UserId>, ChatError> {
        self.participants
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .unwrap_or_else(|| Err(ChatError::NotFound(message_id.to_string())))
    }

    async fn display_name(&self, _community_id: &CommunityId, user_id: &UserId) -> Option<String> {
        self.names.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl Notifier for FakeChat {
    async fn post_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        components: &[Component],
    ) -> Result<MessageId, ChatError> {
        if let Some(error) = self.post_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.posts.lock().unwrap().push(Post {
            channel_id: channel_id.clone(),
            content: content.to_owned(),
            components: components.to_vec(),
        });
        let id = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MessageId::new(format!("posted-{}", id)))
    }

    async fn edit_message(
        &self,
        _channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ChatError> {
        self.edits
            .lock()
            .unwrap()
            .push((message_id.clone(), content.to_owned()));
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &UserId, content: &str) -> Result<(), ChatError> {
        if self.failing_dms.lock().unwrap().contains(user_id) {
            return Err(ChatError::Forbidden(format!("DMs closed for {}", user_id)));
        }
        self.dms
            .lock()
            .unwrap()
            .push((user_id.clone(), content.to_owned()));
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ChatError> {
        self.reactions
            .lock()
            .unwrap()
            .push((message_id.clone(), emoji.to_owned()));
        Ok(())
    }
}

/// MemoryStore that can be told to fail specific writes
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_mark_drawn: Mutex<HashSet<RaffleId>>,
    fail_insert_winner: Mutex<HashSet<RaffleId>>,
    delete_before_mark_drawn: Mutex<HashSet<RaffleId>>,
    inserts: AtomicUsize,
    fail_insert_at: Mutex<Option<usize>>,
}

impl FlakyStore {
    pub fn fail_mark_drawn(&self, raffle_id: &str, fail: bool) {
        toggle(&self.fail_mark_drawn, raffle_id, fail);
    }

    pub fn fail_insert_winner(&self, raffle_id: &str, fail: bool) {
        toggle(&self.fail_insert_winner, raffle_id, fail);
    }

    /// Reject only the `nth` (1-based) winner insert from now on, once
    pub fn fail_nth_insert_once(&self, nth: usize) {
        self.inserts.store(0, Ordering::SeqCst);
        *self.fail_insert_at.lock().unwrap() = Some(nth);
    }

    /// Delete the raffle right before the sweep marks it drawn, as an organizer ending it would
    pub fn delete_before_mark_drawn(&self, raffle_id: &str) {
        toggle(&self.delete_before_mark_drawn, raffle_id, true);
    }
}

fn toggle(set: &Mutex<HashSet<RaffleId>>, raffle_id: &str, on: bool) {
    let mut set = set.lock().unwrap();
    if on {
        set.insert(RaffleId::from(raffle_id));
    } else {
        set.remove(&RaffleId::from(raffle_id));
    }
}

#[async_trait]
impl RaffleStore for FlakyStore {
    async fn find_raffles(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>, StoreError> {
        self.inner.find_raffles(filter).await
    }

    async fn get_raffle(&self, raffle_id: &RaffleId) -> Result<Option<Raffle>, StoreError> {
        self.inner.get_raffle(raffle_id).await
    }

    async fn create_raffle(&self, raffle: Raffle) -> Result<(), StoreError> {
        self.inner.create_raffle(raffle).await
    }

    async fn delete_raffles(&self, filter: &RaffleFilter) -> Result<usize, StoreError> {
        self.inner.delete_raffles(filter).await
    }

    async fn mark_drawn(
        &self,
        raffle_id: &RaffleId,
        unused_codes: Vec<String>,
    ) -> Result<bool, StoreError> {
        if self.fail_mark_drawn.lock().unwrap().contains(raffle_id) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        let delete_first = self.delete_before_mark_drawn.lock().unwrap().remove(raffle_id);
        if delete_first {
            let filter = RaffleFilter {
                raffle_id: Some(raffle_id.clone()),
                ..RaffleFilter::default()
            };
            self.inner.delete_raffles(&filter).await?;
        }
        self.inner.mark_drawn(raffle_id, unused_codes).await
    }

    async fn insert_winner(&self, winner: Winner) -> Result<bool, StoreError> {
        if self.fail_insert_winner.lock().unwrap().contains(&winner.raffle_id) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        let nth = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut fail_at = self.fail_insert_at.lock().unwrap();
            if *fail_at == Some(nth) {
                *fail_at = None;
                return Err(StoreError::Backend("write rejected".into()));
            }
        }
        self.inner.insert_winner(winner).await
    }

    async fn winners_for(&self, raffle_id: &RaffleId) -> Result<Vec<Winner>, StoreError> {
        self.inner.winners_for(raffle_id).await
    }

    async fn find_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError> {
        self.inner.find_winner(raffle_id, user_id).await
    }

    async fn claim_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError> {
        self.inner.claim_winner(raffle_id, user_id).await
    }
}

/// A due raffle in the default channel
pub fn raffle(id: &str, end_timestamp: i64, number_of_winners: u32, codes: &[&str]) -> Raffle {
    Raffle {
        raffle_id: RaffleId::from(id),
        community_id: CommunityId::from(COMMUNITY),
        channel_id: ChannelId::from(CHANNEL),
        message_id: Some(MessageId::new(format!("msg-{}", id))),
        organizer_id: UserId::from(ORGANIZER),
        name: format!("Raffle {}", id),
        description: "Test raffle".to_owned(),
        end_timestamp,
        number_of_winners,
        instructions: None,
        codes: codes.iter().map(|c| c.to_string()).collect(),
        unused_codes: None,
        drawn: false,
    }
}

pub fn sweep_with(store: Arc<dyn RaffleStore>, chat: &Arc<FakeChat>) -> LifecycleSweep {
    LifecycleSweep::new(store, chat.clone(), chat.clone(), &Config::default())
}

// Setup a store, a fake chat platform and a sweep wired to both
pub fn setup() -> (Arc<FlakyStore>, Arc<FakeChat>, LifecycleSweep) {
    let store = Arc::new(FlakyStore::default());
    let chat = Arc::new(FakeChat::new());
    let sweep = sweep_with(store.clone(), &chat);
    (store, chat, sweep)
}
