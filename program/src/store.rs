// Raffle Sweeper - Record store
use async_trait::async_trait;
use log::info;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::snapshot::{self, StoreSnapshot};
use crate::state::{ChannelId, CommunityId, Raffle, RaffleId, UserId, Winner};

/// Predicate over raffle records. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaffleFilter {
    pub raffle_id: Option<RaffleId>,
    pub community_id: Option<CommunityId>,
    pub channel_id: Option<ChannelId>,
    pub drawn: Option<bool>,
    /// End timestamp <= value
    pub ended_at_or_before: Option<i64>,
    /// End timestamp < value
    pub ended_before: Option<i64>,
}

impl RaffleFilter {
    /// Non-drawn raffles whose end time has passed
    pub fn due(now: i64) -> Self {
        Self {
            drawn: Some(false),
            ended_at_or_before: Some(now),
            ..Self::default()
        }
    }

    /// Raffles of any state that ended before `cutoff`
    pub fn ended_before(cutoff: i64) -> Self {
        Self {
            ended_before: Some(cutoff),
            ..Self::default()
        }
    }

    /// Non-drawn raffles announced in a channel
    pub fn open_in(community_id: &CommunityId, channel_id: &ChannelId) -> Self {
        Self {
            community_id: Some(community_id.clone()),
            channel_id: Some(channel_id.clone()),
            drawn: Some(false),
            ..Self::default()
        }
    }

    /// A single raffle, scoped to the channel it was announced in
    pub fn by_id_in(raffle_id: &RaffleId, community_id: &CommunityId, channel_id: &ChannelId) -> Self {
        Self {
            raffle_id: Some(raffle_id.clone()),
            community_id: Some(community_id.clone()),
            channel_id: Some(channel_id.clone()),
            ..Self::default()
        }
    }

    pub fn matches(&self, raffle: &Raffle) -> bool {
        self.raffle_id.as_ref().map_or(true, |id| *id == raffle.raffle_id)
            && self.community_id.as_ref().map_or(true, |id| *id == raffle.community_id)
            && self.channel_id.as_ref().map_or(true, |id| *id == raffle.channel_id)
            && self.drawn.map_or(true, |drawn| drawn == raffle.drawn)
            && self.ended_at_or_before.map_or(true, |t| raffle.end_timestamp <= t)
            && self.ended_before.map_or(true, |t| raffle.end_timestamp < t)
    }
}

/// Durable raffle and winner collections.
///
/// Winner inserts are idempotent per (raffle, user) and `claim_winner` is an atomic
/// compare-and-set, so concurrent sweeps and claims cannot double-assign or double-reveal.
#[async_trait]
pub trait RaffleStore: Send + Sync {
    async fn find_raffles(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>, StoreError>;

    async fn get_raffle(&self, raffle_id: &RaffleId) -> Result<Option<Raffle>, StoreError>;

    /// Fails with `DuplicateKey` if the raffle ID is taken
    async fn create_raffle(&self, raffle: Raffle) -> Result<(), StoreError>;

    /// Returns the number of raffles removed
    async fn delete_raffles(&self, filter: &RaffleFilter) -> Result<usize, StoreError>;

    /// Set `drawn` and record unused codes. Returns false if the raffle is missing or
    /// already drawn, leaving it untouched.
    async fn mark_drawn(
        &self,
        raffle_id: &RaffleId,
        unused_codes: Vec<String>,
    ) -> Result<bool, StoreError>;

    /// Returns false and keeps the existing record if the (raffle, user) key exists
    async fn insert_winner(&self, winner: Winner) -> Result<bool, StoreError>;

    /// Winners of a raffle in insertion order
    async fn winners_for(&self, raffle_id: &RaffleId) -> Result<Vec<Winner>, StoreError>;

    async fn find_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError>;

    /// Flip `claimed` if the winner holds an unclaimed code. Returns the updated record
    /// only when this call made the transition.
    async fn claim_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError>;
}

#[derive(Clone, Debug, Default)]
struct Records {
    raffles: BTreeMap<RaffleId, Raffle>,
    /// Insertion sequence alongside each winner
    winners: BTreeMap<(RaffleId, UserId), (u64, Winner)>,
    next_seq: u64,
}

impl Records {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut records = Records::default();
        for raffle in snapshot.raffles {
            records.raffles.insert(raffle.raffle_id.clone(), raffle);
        }
        for winner in snapshot.winners {
            records.push_winner(winner);
        }
        records
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        let mut winners: Vec<&(u64, Winner)> = self.winners.values().collect();
        winners.sort_by_key(|(seq, _)| *seq);
        StoreSnapshot::new(
            self.raffles.values().cloned().collect(),
            winners.into_iter().map(|(_, w)| w.clone()).collect(),
        )
    }

    fn push_winner(&mut self, winner: Winner) -> bool {
        let key = winner.key();
        if self.winners.contains_key(&key) {
            return false;
        }
        self.winners.insert(key, (self.next_seq, winner));
        self.next_seq += 1;
        true
    }
}

/// In-process store, optionally mirrored to a borsh snapshot file after every write
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by the snapshot at `path`, loading what is already there
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = snapshot::load(&path).await?;
        info!(
            "[STORE] loaded snapshot path:{} raffles:{} winners:{}",
            path.display(),
            snapshot.raffles.len(),
            snapshot.winners.len()
        );
        Ok(Self {
            records: RwLock::new(Records::from_snapshot(snapshot)),
            snapshot_path: Some(path),
        })
    }

    /// Apply `mutate` and, when file-backed, commit the result to disk before it
    /// becomes visible. A failed commit leaves the in-memory state unchanged.
    async fn write<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Records) -> Result<T, StoreError>,
    {
        let mut records = self.records.write().await;
        match &self.snapshot_path {
            None => mutate(&mut *records),
            Some(path) => {
                let mut next = (*records).clone();
                let out = mutate(&mut next)?;
                snapshot::save(path, &next.to_snapshot()).await?;
                *records = next;
                Ok(out)
            }
        }
    }
}

#[async_trait]
impl RaffleStore for MemoryStore {
    async fn find_raffles(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .raffles
            .values()
            .filter(|raffle| filter.matches(raffle))
            .cloned()
            .collect())
    }

    async fn get_raffle(&self, raffle_id: &RaffleId) -> Result<Option<Raffle>, StoreError> {
        Ok(self.records.read().await.raffles.get(raffle_id).cloned())
    }

    async fn create_raffle(&self, raffle: Raffle) -> Result<(), StoreError> {
        self.write(|records| {
            if records.raffles.contains_key(&raffle.raffle_id) {
                return Err(StoreError::DuplicateKey(raffle.raffle_id.to_string()));
            }
            records.raffles.insert(raffle.raffle_id.clone(), raffle);
            Ok(())
        })
        .await
    }

    async fn delete_raffles(&self, filter: &RaffleFilter) -> Result<usize, StoreError> {
        self.write(|records| {
            let before = records.raffles.len();
            records.raffles.retain(|_, raffle| !filter.matches(raffle));
            Ok(before - records.raffles.len())
        })
        .await
    }

    async fn mark_drawn(
        &self,
        raffle_id: &RaffleId,
        unused_codes: Vec<String>,
    ) -> Result<bool, StoreError> {
        self.write(|records| {
            Ok(records
                .raffles
                .get_mut(raffle_id)
                .map_or(false, |raffle| raffle.mark_drawn(unused_codes)))
        })
        .await
    }

    async fn insert_winner(&self, winner: Winner) -> Result<bool, StoreError> {
        self.write(|records| Ok(records.push_winner(winner))).await
    }

    async fn winners_for(&self, raffle_id: &RaffleId) -> Result<Vec<Winner>, StoreError> {
        let records = self.records.read().await;
        let mut winners: Vec<&(u64, Winner)> = records
            .winners
            .values()
            .filter(|(_, winner)| winner.raffle_id == *raffle_id)
            .collect();
        winners.sort_by_key(|(seq, _)| *seq);
        Ok(winners.into_iter().map(|(_, w)| w.clone()).collect())
    }

    async fn find_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .winners
            .get(&(raffle_id.clone(), user_id.clone()))
            .map(|(_, winner)| winner.clone()))
    }

    async fn claim_winner(
        &self,
        raffle_id: &RaffleId,
        user_id: &UserId,
    ) -> Result<Option<Winner>, StoreError> {
        let key = (raffle_id.clone(), user_id.clone());
        self.write(|records| {
            Ok(records.winners.get_mut(&key).and_then(|(_, winner)| {
                winner.claim().ok().map(|_| winner.clone())
            }))
        })
        .await
    }
}
