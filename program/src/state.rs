// Raffle Sweeper - State
use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;

use crate::error::ClaimError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

id_type!(
    /// Opaque unique raffle identifier (UUID v4 when created through intake)
    RaffleId
);
id_type!(
    /// Community (guild) the raffle belongs to
    CommunityId
);
id_type!(ChannelId);
id_type!(MessageId);
id_type!(
    /// Chat platform user
    UserId
);

/// Lifecycle position of a raffle, derived from its end time and drawn flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleStatus {
    /// Open for entries
    Open,
    /// End time passed, waiting for the next sweep
    Due,
    /// Winners drawn
    Drawn,
}

/// Raffle record
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Raffle {
    /// Unique raffle ID
    pub raffle_id: RaffleId,
    /// Community the raffle runs in
    pub community_id: CommunityId,
    /// Channel holding the announcement
    pub channel_id: ChannelId,
    /// Announcement participants react to
    pub message_id: Option<MessageId>,
    /// Organizer who opened the raffle
    pub organizer_id: UserId,
    /// Display name
    pub name: String,
    pub description: String,
    /// End time (epoch millis)
    pub end_timestamp: i64,
    /// Requested winner count, equal to the code count when codes are given
    pub number_of_winners: u32,
    /// Instructions revealed together with a claimed code
    pub instructions: Option<String>,
    /// Prize codes in assignment order, each used at most once
    pub codes: Vec<String>,
    /// Codes left over after drawing. Set only when the raffle is drawn.
    pub unused_codes: Option<Vec<String>>,
    /// Whether winners were drawn. Never reverts.
    pub drawn: bool,
}

impl Raffle {
    pub fn status(&self, now: i64) -> RaffleStatus {
        if self.drawn {
            RaffleStatus::Drawn
        } else if self.is_due(now) {
            RaffleStatus::Due
        } else {
            RaffleStatus::Open
        }
    }

    /// Check if the raffle should be drawn at `now`
    pub fn is_due(&self, now: i64) -> bool {
        !self.drawn && self.end_timestamp <= now
    }

    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Flip the drawn flag and record leftover codes. Returns false if already drawn.
    pub fn mark_drawn(&mut self, unused_codes: Vec<String>) -> bool {
        if self.drawn {
            return false;
        }
        self.drawn = true;
        self.unused_codes = Some(unused_codes);
        true
    }
}

/// Winner record, keyed by (raffle ID, user ID)
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Winner {
    pub raffle_id: RaffleId,
    pub user_id: UserId,
    /// Display name at draw time
    pub username: String,
    /// Assigned prize code, if the pool covered this winner
    pub code: Option<String>,
    /// Whether the code was revealed to the winner
    pub claimed: bool,
}

impl Winner {
    pub fn new(raffle_id: RaffleId, user_id: UserId, username: String, code: Option<String>) -> Self {
        Self {
            raffle_id,
            user_id,
            username,
            code,
            claimed: false,
        }
    }

    pub fn key(&self) -> (RaffleId, UserId) {
        (self.raffle_id.clone(), self.user_id.clone())
    }

    /// Check the record can be claimed, returning the code to reveal
    pub fn claimable_code(&self) -> Result<&str, ClaimError> {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() && !self.claimed => Ok(code),
            _ => Err(ClaimError::AlreadyClaimedOrNoCode),
        }
    }

    /// Transition `claimed` false -> true, only for a record holding a code
    pub fn claim(&mut self) -> Result<String, ClaimError> {
        let code = self.claimable_code()?.to_owned();
        self.claimed = true;
        Ok(code)
    }
}
