use anyhow::Result;
use std::env;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reservations::bot::{self, BotContext, TelegramPort};
use reservations::config::FlowConfig;
use reservations::domain::SnapshotLookup;
use reservations::flow::definition::FlowDefinition;
use reservations::flow::dispatcher::FlowDispatcher;
use reservations::flow::steps::FlowEnv;
use reservations::venues::{ReservationLog, VenueCatalog};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Reservations Telegram Bot");

    // Get bot token from environment
    let bot_token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");

    // Initialize the bot
    let bot = Bot::new(bot_token);

    let config = FlowConfig::default();
    let sweep_interval = config.sweep_interval();

    let env = FlowEnv {
        port: Arc::new(TelegramPort::new(bot.clone())),
        lookup: Arc::new(SnapshotLookup),
        config,
    };
    let reservation_log = Arc::new(ReservationLog::new());
    let context = Arc::new(BotContext {
        flows: FlowDispatcher::new(env, reservation_log),
        catalog: VenueCatalog::builtin(),
        definition: Arc::new(FlowDefinition::reservation()),
    });

    // Sweep idle flows in the background so abandoned conversations get
    // cleaned up without any further user action
    let sweeper = Arc::clone(&context);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let expired = sweeper.flows.expire_idle().await;
            if expired > 0 {
                info!(expired, "Swept idle flows");
            }
        }
    });

    info!("Bot initialized, starting dispatcher");

    // Set up the dispatcher with shared bot context
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let context = Arc::clone(&context);
            move |bot: Bot, msg: Message| {
                let context = Arc::clone(&context);
                async move { bot::message_handler(bot, msg, context).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let context = Arc::clone(&context);
            move |bot: Bot, q: CallbackQuery| {
                let context = Arc::clone(&context);
                async move { bot::callback_handler(bot, q, context).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
