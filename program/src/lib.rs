// Raffle Sweeper
// Time-boxed raffles for group-chat communities: a periodic sweep draws winners,
// hands out prize codes and lets each winner claim their code once

// Records and their store
pub mod error;
pub mod state;
pub mod snapshot;
pub mod store;
pub mod config;
pub mod utils;

// Drawing
pub mod selector;
pub mod allocator;

// Sweeps
pub mod sweep;
pub mod retention;
pub mod scheduler;

// Chat boundary
pub mod chat;
pub mod claim;
pub mod intake;
pub mod interaction;

pub use config::Config;
pub use error::{ChatError, ClaimError, IntakeError, RaffleError, StoreError};
pub use retention::RetentionSweep;
pub use scheduler::Scheduler;
pub use state::{ChannelId, CommunityId, MessageId, Raffle, RaffleId, UserId, Winner};
pub use store::{MemoryStore, RaffleFilter, RaffleStore};
pub use sweep::{LifecycleSweep, SweepOutcome, SweepReport};
