//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{debug, error, warn};

use crate::callback;
use crate::flow::dispatcher::{DispatchOutcome, InboundEvent};
use crate::transport::ConversationId;

use super::{BotContext, VENUE_ACTION};

/// Route one incoming message: commands first, everything else to the flow
pub async fn message_handler(bot: Bot, msg: Message, context: Arc<BotContext>) -> Result<()> {
    let Some(text) = msg.text() else {
        handle_unsupported_message(&bot, &msg).await?;
        return Ok(());
    };
    let text = text.trim();

    if text == "/start" {
        handle_start_command(&bot, &msg).await?;
    } else if text == "/help" {
        handle_help_command(&bot, &msg).await?;
    } else if text == "/book" {
        handle_book_command(&bot, &msg, &context).await?;
    } else if text == "/cancel" {
        handle_cancel_command(&bot, &msg, &context).await?;
    } else {
        handle_flow_text(&bot, &msg, text, &context).await?;
    }

    Ok(())
}

async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received /start command");
    let welcome = "👋 Welcome! I take table reservations.\n\n\
         Send /book to start a reservation, /cancel to drop one midway, \
         or /help for the full list of commands.";
    bot.send_message(msg.chat.id, welcome).await?;
    Ok(())
}

async fn handle_help_command(bot: &Bot, msg: &Message) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received /help command");
    let help = "ℹ️ Commands:\n\
         /book - pick a venue and start a reservation\n\
         /cancel - abandon the reservation in progress\n\
         /help - show this message\n\n\
         During a reservation, tap the buttons under my questions or just \
         type your answer.";
    bot.send_message(msg.chat.id, help).await?;
    Ok(())
}

/// Show the venue picker keyboard
async fn handle_book_command(bot: &Bot, msg: &Message, context: &BotContext) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received /book command");
    let mut rows = Vec::new();
    for name in context.catalog.venue_names() {
        match callback::encode(VENUE_ACTION, name) {
            Ok(payload) => rows.push(vec![InlineKeyboardButton::callback(
                format!("🍽️ {name}"),
                payload,
            )]),
            Err(err) => {
                warn!(venue = %name, error = %err, "Venue name does not fit a button payload")
            }
        }
    }
    bot.send_message(msg.chat.id, "🍽️ Where would you like a table?")
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn handle_cancel_command(bot: &Bot, msg: &Message, context: &BotContext) -> Result<()> {
    let conversation = ConversationId(msg.chat.id.0);
    match context.flows.abandon_flow(conversation).await {
        Ok(true) => {
            bot.send_message(
                msg.chat.id,
                "❌ Reservation cancelled. Send /book whenever you're ready.",
            )
            .await?;
        }
        Ok(false) => {
            bot.send_message(
                msg.chat.id,
                "There's nothing to cancel. Send /book to start a reservation.",
            )
            .await?;
        }
        Err(err) => {
            error!(%conversation, error = %err, "Failed to abandon flow");
            bot.send_message(
                msg.chat.id,
                "😓 Something went wrong on our side. Please try again.",
            )
            .await?;
        }
    }
    Ok(())
}

/// Forward free-typed text to the conversation's active flow
async fn handle_flow_text(
    bot: &Bot,
    msg: &Message,
    text: &str,
    context: &BotContext,
) -> Result<()> {
    let conversation = ConversationId(msg.chat.id.0);
    let event = InboundEvent::Text {
        conversation,
        text: text.to_string(),
    };
    match context.flows.dispatch(event).await {
        Ok(DispatchOutcome::NoActiveFlow) => {
            bot.send_message(
                msg.chat.id,
                "🤖 I wasn't asking you anything. Send /book to start a reservation.",
            )
            .await?;
        }
        Ok(outcome) => {
            debug!(%conversation, ?outcome, "Text dispatched to flow");
        }
        Err(err) => {
            error!(%conversation, error = %err, "Flow dispatch failed for text");
            bot.send_message(
                msg.chat.id,
                "😓 Something went wrong on our side. Please try again.",
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received unsupported message type");
    bot.send_message(
        msg.chat.id,
        "🤖 I only understand text here. Type your answer or use the buttons.",
    )
    .await?;
    Ok(())
}
