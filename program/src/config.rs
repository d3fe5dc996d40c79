// Raffle Sweeper - Configuration
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::RaffleError;

/// Custom ID prefix of the claim button, followed by the raffle ID
pub const CLAIM_BUTTON_PREFIX: &str = "claim_raffle-";
/// Modal submitted for a raffle with a fixed winner count
pub const START_MODAL_ID: &str = "startRaffleModal";
/// Modal submitted for a raffle with a prize code pool
pub const START_MODAL_CODES_ID: &str = "startRaffleModalCodes";
/// Slash command name
pub const COMMAND_NAME: &str = "hraffle";

pub const DEFAULT_TICK_SECS: u64 = 60;
pub const DEFAULT_RETENTION_DAYS: u64 = 30;
pub const DEFAULT_TICKET_EMOJI: &str = "🎟️";

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Runtime settings of the sweeps and the store
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Period of the sweep timer
    pub tick_period: Duration,
    /// Raffles ending longer ago than this are purged
    pub retention: Duration,
    /// Reaction participants opt in with
    pub ticket_emoji: String,
    /// Snapshot file backing the store, in-memory only when unset
    pub snapshot_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(DEFAULT_TICK_SECS),
            retention: Duration::from_millis(DEFAULT_RETENTION_DAYS * MILLIS_PER_DAY),
            ticket_emoji: DEFAULT_TICKET_EMOJI.to_owned(),
            snapshot_path: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `RAFFLE_TICK_SECS`, `RAFFLE_RETENTION_DAYS`,
    /// `RAFFLE_TICKET_EMOJI` and `RAFFLE_SNAPSHOT_PATH`
    pub fn from_env() -> Result<Self, RaffleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RaffleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = lookup("RAFFLE_TICK_SECS") {
            let secs = parse_positive("RAFFLE_TICK_SECS", &secs)?;
            config.tick_period = Duration::from_secs(secs);
        }
        if let Some(days) = lookup("RAFFLE_RETENTION_DAYS") {
            let days = parse_positive("RAFFLE_RETENTION_DAYS", &days)?;
            let millis = days.checked_mul(MILLIS_PER_DAY).ok_or_else(|| {
                RaffleError::Config(format!("RAFFLE_RETENTION_DAYS is too large: {}", days))
            })?;
            config.retention = Duration::from_millis(millis);
        }
        if let Some(emoji) = lookup("RAFFLE_TICKET_EMOJI") {
            if emoji.trim().is_empty() {
                return Err(RaffleError::Config("RAFFLE_TICKET_EMOJI is empty".into()));
            }
            config.ticket_emoji = emoji.trim().to_owned();
        }
        if let Some(path) = lookup("RAFFLE_SNAPSHOT_PATH") {
            if !path.is_empty() {
                config.snapshot_path = Some(PathBuf::from(path));
            }
        }

        Ok(config)
    }

    /// Retention window in epoch millis
    pub fn retention_millis(&self) -> i64 {
        i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, RaffleError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(RaffleError::Config(format!(
            "{} must be a positive integer, got `{}`",
            key, value
        ))),
    }
}
