// Raffle Sweeper - Errors
use thiserror::Error;

/// Failures of the durable record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store backend failure: {0}")]
    Backend(String),

    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// Failures reported by the chat platform
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Referenced channel, message or user no longer resolves
    #[error("Not found: {0}")]
    NotFound(String),

    /// The platform refused the call (closed DMs, missing permissions)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ChatError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::NotFound(_))
    }
}

/// Rejections of the claim interaction, reported back to the clicking user
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    #[error("You are not a winner of this raffle.")]
    NotAWinner,

    #[error("You have already claimed your prize or no code was provided for this raffle.")]
    AlreadyClaimedOrNoCode,

    #[error("Raffle not found or not drawn yet.")]
    RaffleNotDrawn,
}

/// Rejections of a raffle submission or organizer command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("You must provide at least one winner!")]
    NoWinners,

    #[error("You must provide at least one code!")]
    NoCodes,

    #[error("Invalid end timestamp format. Please use YYYY-MM-DD HH:mm.")]
    InvalidEndFormat,

    #[error("The end timestamp must be in the future.")]
    EndNotInFuture,

    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error("No active raffle found with ID: `{0}` in this channel.")]
    RaffleNotFound(String),

    #[error("Raffle with ID: `{0}` has already been drawn.")]
    AlreadyDrawn(String),
}

/// Crate-wide error
#[derive(Error, Debug)]
pub enum RaffleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// A stored raffle asks for zero winners
    #[error("Raffle {0} requests an invalid number of winners")]
    InvalidWinnerCount(String),

    #[error("No handler registered for interaction `{0}`")]
    UnknownInteraction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = RaffleError> = std::result::Result<T, E>;
