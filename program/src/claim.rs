// Raffle Sweeper - Claim interaction
use log::{info, warn};

use crate::error::{ClaimError, RaffleError};
use crate::interaction::InteractionContext;
use crate::state::RaffleId;
use crate::store::{RaffleFilter, RaffleStore};

const NO_INSTRUCTIONS: &str = "No instructions provided.";

/// Code revealed to a winner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimedPrize {
    pub code: String,
    pub instructions: Option<String>,
}

impl ClaimedPrize {
    /// Private reply shown to the winner
    pub fn reply_text(&self) -> String {
        format!(
            "Congratulations! You have claimed your prize!\n**Code:** {}\n**Instructions:** {}",
            self.code,
            self.instructions.as_deref().unwrap_or(NO_INSTRUCTIONS)
        )
    }
}

/// Reveal the winner's code once.
///
/// The raffle must have been announced in the community and channel the button was
/// clicked in. The final flip goes through `claim_winner`, so of two concurrent attempts
/// by the same user exactly one sees the code.
pub async fn claim_prize(
    store: &dyn RaffleStore,
    ctx: &InteractionContext,
    raffle_id: &RaffleId,
) -> Result<ClaimedPrize, RaffleError> {
    let user_id = &ctx.user_id;
    let winner = store
        .find_winner(raffle_id, user_id)
        .await?
        .ok_or(ClaimError::NotAWinner)?;

    // Nothing to hand out, or handed out already
    winner.claimable_code()?;

    let scope = RaffleFilter::by_id_in(raffle_id, &ctx.community_id, &ctx.channel_id);
    let raffle = match store.find_raffles(&scope).await?.into_iter().next() {
        Some(raffle) if raffle.drawn => raffle,
        _ => return Err(ClaimError::RaffleNotDrawn.into()),
    };

    let claimed = match store.claim_winner(raffle_id, user_id).await? {
        Some(claimed) => claimed,
        None => {
            warn!(
                "[CLAIM] lost claim race raffle:{} user:{}",
                raffle_id, user_id
            );
            return Err(ClaimError::AlreadyClaimedOrNoCode.into());
        }
    };

    info!("[CLAIM] prize claimed raffle:{} user:{}", raffle_id, user_id);
    Ok(ClaimedPrize {
        code: claimed.code.unwrap_or_default(),
        instructions: raffle.instructions,
    })
}
