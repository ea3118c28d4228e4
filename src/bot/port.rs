//! Telegram-backed implementation of the flow engine's message port

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::{ApiError, RequestError};

use crate::transport::{ConversationId, MessageId, MessagePort, PromptButton, TransportError};

const BUTTONS_PER_ROW: usize = 3;

/// Sends, edits, and deletes flow messages through the Telegram Bot API
pub struct TelegramPort {
    bot: Bot,
}

impl TelegramPort {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn chat(conversation: ConversationId) -> ChatId {
    ChatId(conversation.0)
}

fn telegram_message(message: MessageId) -> teloxide::types::MessageId {
    teloxide::types::MessageId(message.0 as i32)
}

/// Lay the buttons out in fixed-width rows
fn keyboard(buttons: &[PromptButton]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|button| {
                    InlineKeyboardButton::callback(button.label.clone(), button.payload.clone())
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Keep "message already gone" distinguishable; the cleanup policy keys on it
fn map_request_error(err: RequestError) -> TransportError {
    match &err {
        RequestError::Api(
            ApiError::MessageToDeleteNotFound
            | ApiError::MessageToEditNotFound
            | ApiError::MessageIdInvalid,
        ) => TransportError::NotFound,
        _ => TransportError::Api(err.to_string()),
    }
}

#[async_trait]
impl MessagePort for TelegramPort {
    async fn send_prompt(
        &self,
        conversation: ConversationId,
        text: &str,
        buttons: Option<&[PromptButton]>,
    ) -> Result<MessageId, TransportError> {
        let request = self.bot.send_message(chat(conversation), text);
        let sent = match buttons {
            Some(buttons) if !buttons.is_empty() => {
                request.reply_markup(keyboard(buttons)).await
            }
            _ => request.await,
        }
        .map_err(map_request_error)?;
        Ok(MessageId(i64::from(sent.id.0)))
    }

    async fn edit_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
        new_text: &str,
    ) -> Result<(), TransportError> {
        match self
            .bot
            .edit_message_text(chat(conversation), telegram_message(message), new_text)
            .await
        {
            Ok(_) => Ok(()),
            // An edit to the already-current text is a no-op, not a failure
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(err) => Err(map_request_error(err)),
        }
    }

    async fn delete_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<(), TransportError> {
        self.bot
            .delete_message(chat(conversation), telegram_message(message))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_chunks_buttons_into_rows() {
        let buttons: Vec<PromptButton> = (0..7)
            .map(|i| PromptButton::new(format!("b{i}"), format!("t|{i}")))
            .collect();

        let markup = keyboard(&buttons);
        let rows = &markup.inline_keyboard;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[2].len(), 1);
    }

    #[test]
    fn test_id_conversions() {
        assert_eq!(chat(ConversationId(42)), ChatId(42));
        assert_eq!(telegram_message(MessageId(7)).0, 7);
    }

    #[test]
    fn test_request_error_mapping_keeps_not_found_distinct() {
        for gone in [
            ApiError::MessageToDeleteNotFound,
            ApiError::MessageToEditNotFound,
            ApiError::MessageIdInvalid,
        ] {
            assert_eq!(
                map_request_error(RequestError::Api(gone)),
                TransportError::NotFound
            );
        }

        assert!(matches!(
            map_request_error(RequestError::Api(ApiError::MessageCantBeDeleted)),
            TransportError::Api(_)
        ));
        // Not part of the "already gone" family; edit_message handles it inline
        assert!(matches!(
            map_request_error(RequestError::Api(ApiError::MessageNotModified)),
            TransportError::Api(_)
        ));
    }
}
