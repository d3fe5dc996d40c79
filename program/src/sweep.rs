// Raffle Sweeper - Lifecycle sweep
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::allocator::{allocate_codes, remaining_codes};
use crate::chat::{Component, Notifier, ParticipantSource};
use crate::config::Config;
use crate::error::{ChatError, RaffleError};
use crate::selector::draw_winners;
use crate::state::{Raffle, RaffleId, UserId, Winner};
use crate::store::{RaffleFilter, RaffleStore};
use crate::utils::{distinct_participants, mention_all, mention_channel};

const UNKNOWN_USERNAME: &str = "Unknown";

/// Counters for one pass over the due raffles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Raffles returned by the due query
    pub due: usize,
    /// Raffles that got winners
    pub drawn: usize,
    /// Raffles closed without participants
    pub no_participants: usize,
    /// Raffles left alone because their record is invalid
    pub skipped: usize,
    /// Raffles whose processing failed, retried next tick
    pub failed: usize,
    /// Raffles ended or drawn elsewhere while this tick processed them
    pub preempted: usize,
}

/// How a single raffle was closed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    Drawn {
        winners: Vec<UserId>,
        unused_codes: Vec<String>,
    },
    NoParticipants,
    /// The raffle was deleted or drawn by someone else before it could be marked drawn
    Preempted,
}

/// Participants as read from the announcement
struct Entrants {
    users: Vec<UserId>,
    /// Whether the announcement message still exists and may be edited
    announcement_resolved: bool,
}

/// Draws winners for raffles whose end time has passed
pub struct LifecycleSweep {
    store: Arc<dyn RaffleStore>,
    participants: Arc<dyn ParticipantSource>,
    notifier: Arc<dyn Notifier>,
    ticket_emoji: String,
}

impl LifecycleSweep {
    pub fn new(
        store: Arc<dyn RaffleStore>,
        participants: Arc<dyn ParticipantSource>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            participants,
            notifier,
            ticket_emoji: config.ticket_emoji.clone(),
        }
    }

    /// Process every non-drawn raffle that ended at or before `now`.
    ///
    /// A failure on one raffle is logged and never stops the others. Only a failed
    /// due-raffle query is returned as an error.
    pub async fn run_tick(&self, now: i64) -> Result<SweepReport, RaffleError> {
        let raffles = self.store.find_raffles(&RaffleFilter::due(now)).await?;
        let mut report = SweepReport {
            due: raffles.len(),
            ..SweepReport::default()
        };

        if raffles.is_empty() {
            debug!("[SWEEP] no raffles to process");
            return Ok(report);
        }
        info!("[SWEEP] processing {} raffles that ended", raffles.len());

        for raffle in &raffles {
            match self.process_raffle(raffle).await {
                Ok(SweepOutcome::Drawn { winners, unused_codes }) => {
                    report.drawn += 1;
                    info!(
                        "[SWEEP] drawn raffle:{} winners:{} unused_codes:{}",
                        raffle.raffle_id,
                        winners.len(),
                        unused_codes.len()
                    );
                }
                Ok(SweepOutcome::NoParticipants) => {
                    report.no_participants += 1;
                    info!("[SWEEP] closed raffle:{} without participants", raffle.raffle_id);
                }
                Ok(SweepOutcome::Preempted) => {
                    report.preempted += 1;
                    warn!(
                        "[SWEEP] raffle:{} was drawn or deleted concurrently",
                        raffle.raffle_id
                    );
                }
                Err(e @ RaffleError::InvalidWinnerCount(_)) => {
                    report.skipped += 1;
                    error!("[SWEEP] skipped raffle:{} error:{}", raffle.raffle_id, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("[SWEEP] failed raffle:{} error:{}", raffle.raffle_id, e);
                }
            }
        }

        Ok(report)
    }

    /// Drive one due raffle to `drawn`.
    ///
    /// Steps run strictly in order: read participants, draw, assign codes, persist
    /// winners, notify winners, announce, mark drawn, hand leftovers to the organizer.
    /// Any error before marking drawn leaves the raffle due for the next tick.
    pub async fn process_raffle(&self, raffle: &Raffle) -> Result<SweepOutcome, RaffleError> {
        if raffle.number_of_winners == 0 {
            return Err(RaffleError::InvalidWinnerCount(raffle.raffle_id.to_string()));
        }

        let entrants = self.fetch_entrants(raffle).await?;

        // Winners left behind by an earlier tick that failed before marking drawn
        let existing = self.store.winners_for(&raffle.raffle_id).await?;

        if existing.is_empty() && entrants.users.is_empty() {
            if !self.process_no_participants(raffle).await? {
                return Ok(SweepOutcome::Preempted);
            }
            return Ok(SweepOutcome::NoParticipants);
        }
        let winners = self.complete_winners(raffle, existing, &entrants.users).await;

        let unused_codes = remaining_codes(
            &raffle.codes,
            winners.iter().filter_map(|w| w.code.as_deref()),
        );

        // Winners must be durable before anyone hears about them
        for winner in &winners {
            if !self.store.insert_winner(winner.clone()).await? {
                debug!(
                    "[SWEEP] winner raffle:{} user:{} already stored",
                    raffle.raffle_id, winner.user_id
                );
            }
        }

        for winner in &winners {
            self.direct_message(
                &winner.user_id,
                &winner_dm(raffle),
                &raffle.raffle_id,
            )
            .await;
        }

        let winner_ids: Vec<UserId> = winners.iter().map(|w| w.user_id.clone()).collect();
        self.announce_winners(raffle, &winners, &winner_ids, &entrants).await?;

        if !self
            .store
            .mark_drawn(&raffle.raffle_id, unused_codes.clone())
            .await?
        {
            // Ended by the organizer or drawn by another tick, leftovers stay with that path
            return Ok(SweepOutcome::Preempted);
        }

        if !unused_codes.is_empty() {
            self.direct_message(
                &raffle.organizer_id,
                &leftover_codes_dm(raffle, &unused_codes),
                &raffle.raffle_id,
            )
            .await;
        }

        Ok(SweepOutcome::Drawn {
            winners: winner_ids,
            unused_codes,
        })
    }

    /// Participants who reacted to the announcement, without the bot and without repeats.
    /// A vanished announcement counts as nobody having entered.
    async fn fetch_entrants(&self, raffle: &Raffle) -> Result<Entrants, RaffleError> {
        let message_id = match &raffle.message_id {
            Some(message_id) => message_id,
            None => {
                return Ok(Entrants {
                    users: Vec::new(),
                    announcement_resolved: false,
                })
            }
        };

        match self
            .participants
            .fetch_participants(&raffle.channel_id, message_id, &self.ticket_emoji)
            .await
        {
            Ok(users) => Ok(Entrants {
                users: distinct_participants(users, self.participants.bot_user_id()),
                announcement_resolved: true,
            }),
            Err(e) if e.is_not_found() => {
                warn!(
                    "[SWEEP] announcement not found raffle:{} message:{} error:{}",
                    raffle.raffle_id, message_id, e
                );
                Ok(Entrants {
                    users: Vec::new(),
                    announcement_resolved: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Winner set of `min(number_of_winners, participants)` users.
    ///
    /// Stored winners are kept as they are. If an earlier tick stored only part of its
    /// draw, the shortfall is drawn from the participants not yet stored and takes the
    /// codes the stored winners left, front to back.
    async fn complete_winners(
        &self,
        raffle: &Raffle,
        mut existing: Vec<Winner>,
        participants: &[UserId],
    ) -> Vec<Winner> {
        let target = (raffle.number_of_winners as usize).min(participants.len());
        if existing.len() >= target {
            if !existing.is_empty() {
                warn!(
                    "[SWEEP] resuming raffle:{} with {} stored winners",
                    raffle.raffle_id,
                    existing.len()
                );
            }
            return existing;
        }

        let pool: Vec<UserId> = {
            let taken: HashSet<&UserId> = existing.iter().map(|w| &w.user_id).collect();
            participants
                .iter()
                .filter(|user| !taken.contains(user))
                .cloned()
                .collect()
        };
        let codes = remaining_codes(
            &raffle.codes,
            existing.iter().filter_map(|w| w.code.as_deref()),
        );
        let shortfall = target - existing.len();

        if !existing.is_empty() {
            warn!(
                "[SWEEP] topping up raffle:{} stored:{} missing:{}",
                raffle.raffle_id,
                existing.len(),
                shortfall
            );
        }
        let drawn = self.draw(raffle, &pool, &codes, shortfall).await;
        existing.extend(drawn);
        existing
    }

    /// Select `count` winners and attach `codes` in draw order
    async fn draw(
        &self,
        raffle: &Raffle,
        participants: &[UserId],
        codes: &[String],
        count: usize,
    ) -> Vec<Winner> {
        let drawn = pick(participants, count);
        let allocation = allocate_codes(codes, &drawn);

        let mut winners = Vec::with_capacity(allocation.assignments.len());
        for (user_id, code) in allocation.assignments {
            let username = self
                .participants
                .display_name(&raffle.community_id, &user_id)
                .await
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned());
            winners.push(Winner::new(raffle.raffle_id.clone(), user_id, username, code));
        }
        winners
    }

    /// Returns false if the raffle was closed elsewhere before it could be marked drawn
    async fn process_no_participants(&self, raffle: &Raffle) -> Result<bool, RaffleError> {
        self.post_or_skip(raffle, &no_participants_text(raffle), &[])
            .await?;

        if raffle.has_codes() {
            self.direct_message(
                &raffle.organizer_id,
                &no_participants_codes_dm(raffle),
                &raffle.raffle_id,
            )
            .await;
        }

        // Close it even with nobody drawn, so the next tick does not pick it up again
        Ok(self
            .store
            .mark_drawn(&raffle.raffle_id, raffle.codes.clone())
            .await?)
    }

    async fn announce_winners(
        &self,
        raffle: &Raffle,
        winners: &[Winner],
        winner_ids: &[UserId],
        entrants: &Entrants,
    ) -> Result<(), RaffleError> {
        let mentions = mention_all(winner_ids);
        let components = if winners.iter().any(|w| w.code.is_some()) {
            vec![Component::claim_button(&raffle.raffle_id)]
        } else {
            Vec::new()
        };

        self.post_or_skip(raffle, &winners_text(raffle, &mentions), &components)
            .await?;

        if let (Some(message_id), true) = (&raffle.message_id, entrants.announcement_resolved) {
            let content = ended_text(raffle, entrants.users.len(), &mentions);
            if let Err(e) = self
                .notifier
                .edit_message(&raffle.channel_id, message_id, &content)
                .await
            {
                warn!(
                    "[SWEEP] could not edit announcement raffle:{} error:{}",
                    raffle.raffle_id, e
                );
            }
        }
        Ok(())
    }

    /// Post to the raffle channel. A channel that no longer exists is skipped; any other
    /// failure aborts the raffle for this tick.
    async fn post_or_skip(
        &self,
        raffle: &Raffle,
        content: &str,
        components: &[Component],
    ) -> Result<(), ChatError> {
        match self
            .notifier
            .post_message(&raffle.channel_id, content, components)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(
                    "[SWEEP] channel not found raffle:{} channel:{}",
                    raffle.raffle_id, raffle.channel_id
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// One attempt, failure only logged
    async fn direct_message(&self, user_id: &UserId, content: &str, raffle_id: &RaffleId) {
        if let Err(e) = self.notifier.send_direct_message(user_id, content).await {
            warn!(
                "[SWEEP] could not send DM raffle:{} user:{} error:{}",
                raffle_id, user_id, e
            );
        }
    }
}

fn pick(participants: &[UserId], count: usize) -> Vec<UserId> {
    let mut rng = rand::thread_rng();
    draw_winners(participants, count, &mut rng)
}

fn no_participants_text(raffle: &Raffle) -> String {
    format!(
        "No participants for raffle **{}**, no winners drawn.",
        raffle.name
    )
}

fn no_participants_codes_dm(raffle: &Raffle) -> String {
    format!(
        "The raffle **{}** has ended with no participants. \n Codes left: \n{}\n Please check the channel {} for more details.",
        raffle.name,
        raffle.codes.join("\n"),
        mention_channel(&raffle.channel_id)
    )
}

fn winner_dm(raffle: &Raffle) -> String {
    format!(
        "Congratulations! You have won the raffle **{}**! Please claim your prize by clicking the button in channel {}.",
        raffle.name,
        mention_channel(&raffle.channel_id)
    )
}

fn winners_text(raffle: &Raffle, mentions: &str) -> String {
    format!(
        "Congratulations {}! You have won the raffle **{}**!",
        mentions, raffle.name
    )
}

fn ended_text(raffle: &Raffle, participants: usize, mentions: &str) -> String {
    format!(
        "Raffle **{}** has ended! Number of participants: {}. Winners: {}",
        raffle.name, participants, mentions
    )
}

fn leftover_codes_dm(raffle: &Raffle, unused_codes: &[String]) -> String {
    format!(
        "The raffle **{}** has ended. \n Codes left: \n{}\n Please check the channel {} for the winners.",
        raffle.name,
        unused_codes.join("\n"),
        mention_channel(&raffle.channel_id)
    )
}
