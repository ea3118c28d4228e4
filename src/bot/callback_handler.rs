//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error, warn};

use crate::callback;
use crate::flow::dispatcher::InboundEvent;
use crate::transport::{ConversationId, MessageId};

use super::{BotContext, VENUE_ACTION};

/// Handle callback queries from inline keyboards.
///
/// The payload is decoded exactly once here; venue picks start a flow and
/// step-tag actions are forwarded as button events. Every query is answered
/// so the client stops showing its loading state.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, context: Arc<BotContext>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");

    if let Some(message) = &q.message {
        let conversation = ConversationId(message.chat().id.0);
        let data = q.data.as_deref().unwrap_or("");

        match callback::decode(data) {
            Ok(payload) if payload.action == VENUE_ACTION => {
                handle_venue_pick(&bot, conversation, &payload.value, &context).await?;
            }
            Ok(payload) => {
                let prompt_message = MessageId(i64::from(message.id().0));
                let event = InboundEvent::Button {
                    conversation,
                    prompt_message,
                    payload,
                };
                match context.flows.dispatch(event).await {
                    Ok(outcome) => {
                        debug!(%conversation, ?outcome, "Button dispatched to flow");
                    }
                    Err(err) => {
                        error!(%conversation, error = %err, "Flow dispatch failed for button");
                        bot.send_message(
                            message.chat().id,
                            "😓 Something went wrong on our side. Please try again.",
                        )
                        .await?;
                    }
                }
            }
            Err(err) => {
                // Buttons we did not produce; drop them
                warn!(user_id = %q.from.id, error = %err, "Undecodable callback data");
            }
        }
    }

    bot.answer_callback_query(q.id).await?;
    Ok(())
}

/// Snapshot the picked venue's options and start the reservation flow
async fn handle_venue_pick(
    bot: &Bot,
    conversation: ConversationId,
    venue: &str,
    context: &BotContext,
) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let Some(domain) = context.catalog.context_for(venue, today) else {
        warn!(%conversation, venue, "Venue button names an unknown venue");
        bot.send_message(
            ChatId(conversation.0),
            "🤔 That venue isn't available any more. Send /book to see the current list.",
        )
        .await?;
        return Ok(());
    };

    if let Err(err) = context
        .flows
        .start_flow(conversation, Arc::clone(&context.definition), domain)
        .await
    {
        error!(%conversation, error = %err, "Failed to start reservation flow");
        bot.send_message(
            ChatId(conversation.0),
            "😓 Something went wrong on our side. Please try again.",
        )
        .await?;
    }
    Ok(())
}
