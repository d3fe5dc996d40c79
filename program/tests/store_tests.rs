mod common;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use common::*;
use raffle_sweeper::snapshot::{self, StoreSnapshot};
use raffle_sweeper::{
    ChannelId, CommunityId, Config, MemoryStore, RaffleError, RaffleFilter, RaffleId, RaffleStore, StoreError,
    UserId, Winner,
};

fn snapshot_path() -> PathBuf {
    std::env::temp_dir().join(format!("raffle-store-{}.bin", uuid::Uuid::new_v4()))
}

fn winner(raffle_id: &str, user: &str, code: Option<&str>) -> Winner {
    Winner::new(
        RaffleId::from(raffle_id),
        UserId::from(user),
        user.to_owned(),
        code.map(str::to_owned),
    )
}

// Test raffle IDs are unique
#[tokio::test]
async fn test_duplicate_raffle_rejected() {
    let store = MemoryStore::new();
    store.create_raffle(raffle("R1", NOW, 1, &[])).await.unwrap();

    let result = store.create_raffle(raffle("R1", NOW + DAY, 3, &[])).await;
    assert!(matches!(result, Err(StoreError::DuplicateKey(id)) if id == "R1"));
    assert_eq!(
        store
            .get_raffle(&RaffleId::from("R1"))
            .await
            .unwrap()
            .unwrap()
            .number_of_winners,
        1
    );
}

// Test a second insert for the same (raffle, user) keeps the first record
#[tokio::test]
async fn test_insert_winner_idempotent() {
    let store = MemoryStore::new();
    assert!(store.insert_winner(winner("R1", "u1", Some("A1"))).await.unwrap());
    assert!(!store.insert_winner(winner("R1", "u1", Some("A2"))).await.unwrap());
    assert!(store.insert_winner(winner("R1", "u2", None)).await.unwrap());
    assert!(store.insert_winner(winner("R2", "u1", None)).await.unwrap());

    let winners = store.winners_for(&RaffleId::from("R1")).await.unwrap();
    assert_eq!(winners.len(), 2);
    assert_eq!(winners[0].code.as_deref(), Some("A1"));
    assert_eq!(winners[1].user_id, UserId::from("u2"));
}

// Test winners come back in insertion order, not key order
#[tokio::test]
async fn test_winners_in_insertion_order() {
    let store = MemoryStore::new();
    for user in ["u9", "u1", "u5"] {
        store.insert_winner(winner("R1", user, None)).await.unwrap();
    }
    let users: Vec<String> = store
        .winners_for(&RaffleId::from("R1"))
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.user_id.to_string())
        .collect();
    assert_eq!(users, vec!["u9", "u1", "u5"]);
}

// Test mark_drawn flips once and records leftovers
#[tokio::test]
async fn test_mark_drawn_once() {
    let store = MemoryStore::new();
    let id = RaffleId::from("R1");
    store
        .create_raffle(raffle("R1", NOW, 1, &["A1", "A2"]))
        .await
        .unwrap();

    assert!(store.mark_drawn(&id, vec!["A2".into()]).await.unwrap());
    assert!(!store.mark_drawn(&id, Vec::new()).await.unwrap());
    assert!(!store.mark_drawn(&RaffleId::from("R9"), Vec::new()).await.unwrap());

    let stored = store.get_raffle(&id).await.unwrap().unwrap();
    assert!(stored.drawn);
    assert_eq!(stored.unused_codes, Some(vec!["A2".to_owned()]));
}

// Test the claim transition happens once and only for coded winners
#[tokio::test]
async fn test_claim_winner_compare_and_set() {
    let store = MemoryStore::new();
    store.insert_winner(winner("R1", "u1", Some("A1"))).await.unwrap();
    store.insert_winner(winner("R1", "u2", None)).await.unwrap();
    let id = RaffleId::from("R1");

    let claimed = store.claim_winner(&id, &UserId::from("u1")).await.unwrap();
    assert!(claimed.map_or(false, |w| w.claimed));
    assert!(store.claim_winner(&id, &UserId::from("u1")).await.unwrap().is_none());
    assert!(store.claim_winner(&id, &UserId::from("u2")).await.unwrap().is_none());
    assert!(store.claim_winner(&id, &UserId::from("u3")).await.unwrap().is_none());
}

// Test the filters used by the sweeps and commands
#[tokio::test]
async fn test_filters() {
    let store = MemoryStore::new();
    store.create_raffle(raffle("PAST", NOW - DAY, 1, &[])).await.unwrap();
    store.create_raffle(raffle("EDGE", NOW, 1, &[])).await.unwrap();
    store.create_raffle(raffle("FUTURE", NOW + DAY, 1, &[])).await.unwrap();
    let mut elsewhere = raffle("ELSEWHERE", NOW - DAY, 1, &[]);
    elsewhere.channel_id = ChannelId::from("channel-2");
    store.create_raffle(elsewhere).await.unwrap();
    let mut drawn = raffle("DRAWN", NOW - DAY, 1, &[]);
    drawn.drawn = true;
    store.create_raffle(drawn).await.unwrap();

    let ids = |raffles: Vec<raffle_sweeper::Raffle>| -> Vec<String> {
        let mut ids: Vec<String> = raffles.into_iter().map(|r| r.raffle_id.to_string()).collect();
        ids.sort();
        ids
    };

    let due = store.find_raffles(&RaffleFilter::due(NOW)).await.unwrap();
    assert_eq!(ids(due), vec!["EDGE", "ELSEWHERE", "PAST"]);

    let open = store
        .find_raffles(&RaffleFilter::open_in(
            &CommunityId::from(COMMUNITY),
            &ChannelId::from(CHANNEL),
        ))
        .await
        .unwrap();
    assert_eq!(ids(open), vec!["EDGE", "FUTURE", "PAST"]);

    // Strictly before the cutoff, drawn or not
    let removed = store
        .delete_raffles(&RaffleFilter::ended_before(NOW))
        .await
        .unwrap();
    assert_eq!(removed, 3);
    let left = store.find_raffles(&RaffleFilter::default()).await.unwrap();
    assert_eq!(ids(left), vec!["EDGE", "FUTURE"]);
}

// Test a file-backed store survives a restart
#[tokio::test]
async fn test_snapshot_reopen() {
    let path = snapshot_path();
    {
        let store = MemoryStore::open(&path).await.unwrap();
        store
            .create_raffle(raffle("R1", NOW, 2, &["A1", "A2"]))
            .await
            .unwrap();
        store.insert_winner(winner("R1", "u2", Some("A1"))).await.unwrap();
        store.insert_winner(winner("R1", "u1", Some("A2"))).await.unwrap();
        store
            .mark_drawn(&RaffleId::from("R1"), Vec::new())
            .await
            .unwrap();
        store
            .claim_winner(&RaffleId::from("R1"), &UserId::from("u1"))
            .await
            .unwrap();
    }

    let store = MemoryStore::open(&path).await.unwrap();
    let stored = store.get_raffle(&RaffleId::from("R1")).await.unwrap().unwrap();
    assert!(stored.drawn);
    assert_eq!(stored.unused_codes, Some(Vec::new()));

    let winners = store.winners_for(&RaffleId::from("R1")).await.unwrap();
    let users: Vec<&str> = winners.iter().map(|w| w.user_id.as_str()).collect();
    assert_eq!(users, vec!["u2", "u1"]);
    assert!(!winners[0].claimed);
    assert!(winners[1].claimed);

    // Sequence numbers continue after a reload
    store.insert_winner(winner("R1", "u0", None)).await.unwrap();
    let last = store.winners_for(&RaffleId::from("R1")).await.unwrap().pop().unwrap();
    assert_eq!(last.user_id, UserId::from("u0"));

    tokio::fs::remove_file(&path).await.unwrap();
}

// Test a missing snapshot opens empty and a damaged one is refused
#[tokio::test]
async fn test_snapshot_missing_and_corrupt() {
    let path = snapshot_path();
    let store = MemoryStore::open(&path).await.unwrap();
    assert!(store.find_raffles(&RaffleFilter::default()).await.unwrap().is_empty());

    tokio::fs::write(&path, b"not a snapshot").await.unwrap();
    assert!(matches!(
        MemoryStore::open(&path).await,
        Err(StoreError::Corrupt(_))
    ));

    let mut future = StoreSnapshot::new(vec![raffle("R1", NOW, 1, &[])], Vec::new());
    future.version = 99;
    tokio::fs::write(&path, future.encode().unwrap()).await.unwrap();
    assert!(matches!(snapshot::load(&path).await, Err(StoreError::Corrupt(_))));

    tokio::fs::remove_file(&path).await.unwrap();
}

// Test the environment overrides and their validation
#[test]
fn test_config_from_lookup() {
    let lookup = |pairs: &[(&str, &str)]| {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    };

    let config = lookup(&[]).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.tick_period, Duration::from_secs(60));
    assert_eq!(config.retention_millis(), 30 * DAY);
    assert!(config.snapshot_path.is_none());

    let config = lookup(&[
        ("RAFFLE_TICK_SECS", "15"),
        ("RAFFLE_RETENTION_DAYS", "7"),
        ("RAFFLE_TICKET_EMOJI", " 🎉 "),
        ("RAFFLE_SNAPSHOT_PATH", "/var/lib/raffles.bin"),
    ])
    .unwrap();
    assert_eq!(config.tick_period, Duration::from_secs(15));
    assert_eq!(config.retention_millis(), 7 * DAY);
    assert_eq!(config.ticket_emoji, "🎉");
    assert_eq!(config.snapshot_path, Some(PathBuf::from("/var/lib/raffles.bin")));

    for bad in [
        ("RAFFLE_TICK_SECS", "0"),
        ("RAFFLE_TICK_SECS", "soon"),
        ("RAFFLE_RETENTION_DAYS", "-1"),
        ("RAFFLE_TICKET_EMOJI", "  "),
    ] {
        assert!(matches!(lookup(&[bad]), Err(RaffleError::Config(_))));
    }
}

// Test the lifecycle position derived from end time and drawn flag
#[test]
fn test_raffle_status() {
    use raffle_sweeper::state::RaffleStatus;

    let mut record = raffle("R1", NOW, 1, &[]);
    assert_eq!(record.status(NOW - 1), RaffleStatus::Open);
    assert_eq!(record.status(NOW), RaffleStatus::Due);

    assert!(record.mark_drawn(Vec::new()));
    assert_eq!(record.status(NOW), RaffleStatus::Drawn);
    assert!(!record.mark_drawn(vec!["A1".into()]));
    assert_eq!(record.unused_codes, Some(Vec::new()));
}
