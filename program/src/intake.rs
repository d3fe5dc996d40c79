// Raffle Sweeper - Raffle intake and organizer commands
use chrono::{NaiveDateTime, TimeZone, Utc};
use log::{info, warn};
use std::collections::HashMap;

use crate::chat::Notifier;
use crate::error::{IntakeError, RaffleError};
use crate::interaction::InteractionContext;
use crate::state::{Raffle, RaffleId};
use crate::store::{RaffleFilter, RaffleStore};
use crate::utils::{mention_user, timestamp_markup};

pub const NAME_FIELD: &str = "raffleNameInput";
pub const DESCRIPTION_FIELD: &str = "raffleDescriptionInput";
pub const END_FIELD: &str = "raffleEndInput";
pub const WINNERS_FIELD: &str = "raffleWinnersInput";
pub const INSTRUCTIONS_FIELD: &str = "raffleInstructionsInput";
pub const CODES_FIELD: &str = "raffleCodesInput";

/// Format of the end field, read as UTC
const END_FORMAT: &str = "%Y-%m-%d %H:%M";
const END_FORMAT_LEN: usize = "YYYY-MM-DD HH:mm".len();

/// Raw values of the start-raffle modal
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartRaffleForm {
    pub name: String,
    pub description: String,
    pub end: String,
    /// Present on the fixed winner count form
    pub winners: Option<String>,
    /// Present on the code pool form
    pub instructions: Option<String>,
    /// Present on the code pool form, one code per line
    pub codes: Option<String>,
}

/// A submission that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleDraft {
    pub name: String,
    pub description: String,
    pub end_timestamp: i64,
    pub number_of_winners: u32,
    pub instructions: Option<String>,
    pub codes: Vec<String>,
}

impl StartRaffleForm {
    /// Read the modal fields. `with_codes` selects the code pool variant.
    pub fn from_fields(
        with_codes: bool,
        fields: &HashMap<String, String>,
    ) -> Result<Self, IntakeError> {
        let required = |key: &'static str| {
            fields
                .get(key)
                .cloned()
                .ok_or(IntakeError::MissingField(key))
        };

        let mut form = StartRaffleForm {
            name: required(NAME_FIELD)?,
            description: required(DESCRIPTION_FIELD)?,
            end: required(END_FIELD)?,
            ..StartRaffleForm::default()
        };
        if with_codes {
            form.codes = Some(required(CODES_FIELD)?);
            form.instructions = fields.get(INSTRUCTIONS_FIELD).cloned();
        } else {
            form.winners = Some(required(WINNERS_FIELD)?);
        }
        Ok(form)
    }

    pub fn validate(&self, now: i64) -> Result<RaffleDraft, IntakeError> {
        let codes: Option<Vec<String>> = self.codes.as_ref().map(|raw| {
            raw.lines()
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_owned)
                .collect()
        });

        let number_of_winners = match &codes {
            Some(codes) if codes.is_empty() => return Err(IntakeError::NoCodes),
            // With a code pool every code gets a winner
            Some(codes) => u32::try_from(codes.len()).map_err(|_| IntakeError::NoWinners)?,
            None => match self.winners.as_deref().map(|w| w.trim().parse::<u32>()) {
                Some(Ok(count)) if count >= 1 => count,
                _ => return Err(IntakeError::NoWinners),
            },
        };

        let end_timestamp = parse_end(&self.end)?;
        if end_timestamp <= now {
            return Err(IntakeError::EndNotInFuture);
        }

        Ok(RaffleDraft {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            end_timestamp,
            number_of_winners,
            instructions: self
                .instructions
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned),
            codes: codes.unwrap_or_default(),
        })
    }
}

/// `YYYY-MM-DD HH:mm` in UTC to epoch millis
pub fn parse_end(raw: &str) -> Result<i64, IntakeError> {
    let raw = raw.trim();
    if raw.len() != END_FORMAT_LEN {
        return Err(IntakeError::InvalidEndFormat);
    }
    let naive =
        NaiveDateTime::parse_from_str(raw, END_FORMAT).map_err(|_| IntakeError::InvalidEndFormat)?;
    Ok(Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// Announce a validated raffle and store it. Returns the stored record.
pub async fn start_raffle(
    store: &dyn RaffleStore,
    notifier: &dyn Notifier,
    ctx: &InteractionContext,
    form: &StartRaffleForm,
    ticket_emoji: &str,
    now: i64,
) -> Result<Raffle, RaffleError> {
    let draft = form.validate(now)?;
    let raffle_id = RaffleId::new(uuid::Uuid::new_v4().to_string());

    let message_id = notifier
        .post_message(&ctx.channel_id, &announcement_text(ctx, &draft), &[])
        .await?;

    // Entrants opt in by reacting, seed the reaction so it is one click away
    if let Err(e) = notifier
        .add_reaction(&ctx.channel_id, &message_id, ticket_emoji)
        .await
    {
        warn!("[INTAKE] could not react raffle:{} error:{}", raffle_id, e);
    }

    let raffle = Raffle {
        raffle_id,
        community_id: ctx.community_id.clone(),
        channel_id: ctx.channel_id.clone(),
        message_id: Some(message_id),
        organizer_id: ctx.user_id.clone(),
        name: draft.name,
        description: draft.description,
        end_timestamp: draft.end_timestamp,
        number_of_winners: draft.number_of_winners,
        instructions: draft.instructions,
        codes: draft.codes,
        unused_codes: None,
        drawn: false,
    };
    store.create_raffle(raffle.clone()).await?;

    info!(
        "[INTAKE] raffle created raffle:{} organizer:{} winners:{} codes:{}",
        raffle.raffle_id,
        raffle.organizer_id,
        raffle.number_of_winners,
        raffle.codes.len()
    );
    Ok(raffle)
}

pub fn started_reply(raffle: &Raffle) -> String {
    format!(
        "Your submission was received successfully!\n **Raffle Id:** `{}`",
        raffle.raffle_id
    )
}

/// Organizer cancellation: delete a raffle of this channel that has not been drawn
pub async fn end_raffle(
    store: &dyn RaffleStore,
    ctx: &InteractionContext,
    raffle_id: &RaffleId,
) -> Result<String, RaffleError> {
    let filter = RaffleFilter::by_id_in(raffle_id, &ctx.community_id, &ctx.channel_id);
    let raffle = store
        .find_raffles(&filter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| IntakeError::RaffleNotFound(raffle_id.to_string()))?;

    if raffle.drawn {
        return Err(IntakeError::AlreadyDrawn(raffle_id.to_string()).into());
    }

    // Only delete if the sweep has not drawn it in the meantime
    let removed = store
        .delete_raffles(&RaffleFilter {
            drawn: Some(false),
            ..filter
        })
        .await?;
    if removed == 0 {
        return Err(IntakeError::AlreadyDrawn(raffle_id.to_string()).into());
    }

    info!("[INTAKE] raffle ended raffle:{} by:{}", raffle_id, ctx.user_id);
    Ok(format!(
        "Raffle with ID: `{}` has been ended successfully.",
        raffle_id
    ))
}

/// Non-drawn raffles of this channel, formatted for a private reply
pub async fn list_raffles(
    store: &dyn RaffleStore,
    ctx: &InteractionContext,
) -> Result<String, RaffleError> {
    let raffles = store
        .find_raffles(&RaffleFilter::open_in(&ctx.community_id, &ctx.channel_id))
        .await?;
    if raffles.is_empty() {
        return Ok("No active raffles found in this channel.".to_owned());
    }

    let entries: Vec<String> = raffles.iter().map(list_entry).collect();
    Ok(format!(
        "**Active Raffles in this Channel:**\n\n{}",
        entries.join("\n\n")
    ))
}

fn list_entry(raffle: &Raffle) -> String {
    let end = Utc
        .timestamp_millis_opt(raffle.end_timestamp)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| raffle.end_timestamp.to_string());

    format!(
        "**Raffle ID:** `{}`\n**Name:** {}\n**Description:** {}\n**Instructions:** {}\n**Owner:** {}\n**Has Codes:** {}\n**Number of Winners:** {}\n**End Date:** {}\n",
        raffle.raffle_id,
        or_placeholder(&raffle.name, "No Name"),
        or_placeholder(&raffle.description, "No Description"),
        raffle.instructions.as_deref().unwrap_or("No Instructions"),
        mention_user(&raffle.organizer_id),
        if raffle.has_codes() { "Yes" } else { "No" },
        raffle.number_of_winners,
        end
    )
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

fn announcement_text(ctx: &InteractionContext, draft: &RaffleDraft) -> String {
    format!(
        "A new raffle has been started by {}!\n**Raffle Name:** {}\n**Description:** {}\n**Raffle ends at:** {}\n**Number of Winners:** {}",
        mention_user(&ctx.user_id),
        draft.name,
        draft.description,
        timestamp_markup(draft.end_timestamp),
        draft.number_of_winners
    )
}
