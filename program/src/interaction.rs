// Raffle Sweeper - Interaction routing
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::chat::Notifier;
use crate::claim::claim_prize;
use crate::config::{Config, CLAIM_BUTTON_PREFIX, COMMAND_NAME, START_MODAL_CODES_ID, START_MODAL_ID};
use crate::error::{RaffleError, Result};
use crate::intake::{
    self, StartRaffleForm, CODES_FIELD, DESCRIPTION_FIELD, END_FIELD, INSTRUCTIONS_FIELD,
    NAME_FIELD, WINNERS_FIELD,
};
use crate::state::{ChannelId, CommunityId, RaffleId, UserId};
use crate::store::RaffleStore;

/// Who triggered an interaction and where
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionContext {
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
}

/// Subcommands of the raffle slash command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subcommand {
    /// Open the submission modal
    Start { provide_codes: bool },
    /// Cancel a raffle that has not been drawn
    End { raffle_id: RaffleId },
    /// Show the open raffles of the channel
    List,
}

/// Inbound interaction delivered by the chat platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    SlashCommand {
        name: String,
        subcommand: Subcommand,
    },
    ModalSubmit {
        custom_id: String,
        fields: HashMap<String, String>,
    },
    ButtonClick {
        custom_id: String,
    },
}

impl Interaction {
    /// Identifier used for routing and logs
    pub fn route_key(&self) -> &str {
        match self {
            Interaction::SlashCommand { name, .. } => name,
            Interaction::ModalSubmit { custom_id, .. } => custom_id,
            Interaction::ButtonClick { custom_id } => custom_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalField {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub style: TextInputStyle,
    pub required: bool,
}

/// Form shown to the organizer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modal {
    pub custom_id: &'static str,
    pub title: &'static str,
    pub fields: Vec<ModalField>,
}

impl Modal {
    /// Submission form for a new raffle
    pub fn start_raffle(provide_codes: bool) -> Self {
        let field = |custom_id, label, style, required| ModalField {
            custom_id,
            label,
            style,
            required,
        };

        let mut fields = vec![
            field(NAME_FIELD, "Raffle Name", TextInputStyle::Short, true),
            field(DESCRIPTION_FIELD, "Raffle Description", TextInputStyle::Paragraph, true),
            field(END_FIELD, "End Timestamp - 2022-12-31 22:41", TextInputStyle::Short, true),
        ];
        if provide_codes {
            fields.push(field(INSTRUCTIONS_FIELD, "Instructions for Winners", TextInputStyle::Paragraph, false));
            fields.push(field(CODES_FIELD, "Raffle Codes (one per line)", TextInputStyle::Paragraph, true));
        } else {
            fields.push(field(WINNERS_FIELD, "Number of Winners", TextInputStyle::Short, true));
        }

        Modal {
            custom_id: if provide_codes { START_MODAL_CODES_ID } else { START_MODAL_ID },
            title: "Start a new raffle",
            fields,
        }
    }
}

/// What the platform should send back
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Reply { content: String, ephemeral: bool },
    ShowModal(Modal),
}

impl Response {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Response::Reply {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Routing target resolved from an interaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Command,
    StartModal { with_codes: bool },
    ClaimButton,
}

/// Dispatches interactions by exact command and modal IDs and by button ID prefix
pub struct Router {
    store: Arc<dyn RaffleStore>,
    notifier: Arc<dyn Notifier>,
    ticket_emoji: String,
    modal_ids: Vec<&'static str>,
    button_prefixes: Vec<&'static str>,
}

impl Router {
    pub fn new(store: Arc<dyn RaffleStore>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            store,
            notifier,
            ticket_emoji: config.ticket_emoji.clone(),
            modal_ids: vec![START_MODAL_ID, START_MODAL_CODES_ID],
            button_prefixes: vec![CLAIM_BUTTON_PREFIX],
        }
    }

    pub fn registered_modal_ids(&self) -> &[&'static str] {
        &self.modal_ids
    }

    pub fn registered_button_prefixes(&self) -> &[&'static str] {
        &self.button_prefixes
    }

    fn resolve(&self, interaction: &Interaction) -> Option<Route> {
        match interaction {
            Interaction::SlashCommand { name, .. } if name == COMMAND_NAME => Some(Route::Command),
            Interaction::SlashCommand { .. } => None,
            Interaction::ModalSubmit { custom_id, .. } => self
                .modal_ids
                .iter()
                .find(|id| **id == custom_id.as_str())
                .map(|id| Route::StartModal {
                    with_codes: *id == START_MODAL_CODES_ID,
                }),
            Interaction::ButtonClick { custom_id } => self
                .button_prefixes
                .iter()
                .find(|prefix| custom_id.starts_with(**prefix))
                .map(|_| Route::ClaimButton),
        }
    }

    /// Handle an interaction at `now`.
    ///
    /// User-facing rejections (validation, claim checks) come back as an ephemeral
    /// reply. Store and platform failures and unknown IDs are returned as errors.
    pub async fn dispatch(
        &self,
        ctx: &InteractionContext,
        interaction: Interaction,
        now: i64,
    ) -> Result<Response> {
        let route = self
            .resolve(&interaction)
            .ok_or_else(|| RaffleError::UnknownInteraction(interaction.route_key().to_owned()))?;
        debug!("[ROUTER] {:?} user:{}", route, ctx.user_id);

        let outcome = match (route, interaction) {
            (Route::Command, Interaction::SlashCommand { subcommand, .. }) => {
                self.run_command(ctx, subcommand).await
            }
            (Route::StartModal { with_codes }, Interaction::ModalSubmit { fields, .. }) => {
                self.submit_raffle(ctx, with_codes, &fields, now).await
            }
            (Route::ClaimButton, Interaction::ButtonClick { custom_id }) => {
                let raffle_id = custom_id
                    .strip_prefix(CLAIM_BUTTON_PREFIX)
                    .map(RaffleId::from)
                    .ok_or(RaffleError::UnknownInteraction(custom_id.clone()))?;
                claim_prize(self.store.as_ref(), ctx, &raffle_id)
                    .await
                    .map(|prize| Response::ephemeral(prize.reply_text()))
            }
            (_, interaction) => Err(RaffleError::UnknownInteraction(
                interaction.route_key().to_owned(),
            )),
        };

        match outcome {
            Err(RaffleError::Claim(e)) => Ok(Response::ephemeral(e.to_string())),
            Err(RaffleError::Intake(e)) => Ok(Response::ephemeral(e.to_string())),
            other => other,
        }
    }

    async fn run_command(&self, ctx: &InteractionContext, subcommand: Subcommand) -> Result<Response> {
        match subcommand {
            Subcommand::Start { provide_codes } => {
                Ok(Response::ShowModal(Modal::start_raffle(provide_codes)))
            }
            Subcommand::End { raffle_id } => {
                intake::end_raffle(self.store.as_ref(), ctx, &raffle_id)
                    .await
                    .map(Response::ephemeral)
            }
            Subcommand::List => intake::list_raffles(self.store.as_ref(), ctx)
                .await
                .map(Response::ephemeral),
        }
    }

    async fn submit_raffle(
        &self,
        ctx: &InteractionContext,
        with_codes: bool,
        fields: &HashMap<String, String>,
        now: i64,
    ) -> Result<Response> {
        let form = StartRaffleForm::from_fields(with_codes, fields)?;
        match intake::start_raffle(
            self.store.as_ref(),
            self.notifier.as_ref(),
            ctx,
            &form,
            &self.ticket_emoji,
            now,
        )
        .await
        {
            Ok(raffle) => Ok(Response::ephemeral(intake::started_reply(&raffle))),
            Err(RaffleError::Chat(e)) => {
                warn!("[INTAKE] could not announce raffle in channel:{} error:{}", ctx.channel_id, e);
                Ok(Response::ephemeral(
                    "Could not find the channel to send the raffle message.",
                ))
            }
            Err(e) => Err(e),
        }
    }
}
