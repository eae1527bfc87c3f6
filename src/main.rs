// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and background tasks

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::afk::AfkRegistry;
use crate::core::logging::LoggingService;
use crate::core::moderation::{EscalationPolicy, ModerationService};
use crate::core::settings::{SettingsService, DEFAULT_PREFIX};
use crate::core::tags::TagService;
use crate::discord::afk::afk_handler;
use crate::discord::commands::presence;
use crate::discord::logging::events as logging_events;
use crate::discord::moderation::{detection_handler, mute_sweep};
use crate::discord::users::UserDirectory;
use crate::discord::{Data, Error};
use crate::infra::moderation::SqliteInfractionStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::tags::SqliteTagStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            // Ignore bot messages (including our own)
            if new_message.author.bot {
                return Ok(());
            }

            logging_events::track_message(data, new_message);

            match detection_handler::handle_message(ctx, data, new_message).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => tracing::error!(
                    message_id = new_message.id.get(),
                    "Error running detection: {}",
                    e
                ),
            }

            if let Err(e) = afk_handler::handle_message(ctx, data, new_message).await {
                tracing::error!("Error handling AFK mentions: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = logging_events::handle_member_join(ctx, data, new_member).await {
                tracing::error!("Error handling member join log: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            if let Err(e) = logging_events::handle_member_remove(
                ctx,
                data,
                *guild_id,
                user,
                member_data_if_available.as_ref(),
            )
            .await
            {
                tracing::error!("Error handling member remove log: {}", e);
            }
        }
        serenity::FullEvent::GuildBanAddition {
            guild_id,
            banned_user,
        } => {
            if let Err(e) = logging_events::handle_ban_add(ctx, data, *guild_id, banned_user).await
            {
                tracing::error!("Error handling ban log: {}", e);
            }
        }
        serenity::FullEvent::GuildBanRemoval {
            guild_id,
            unbanned_user,
        } => {
            if let Err(e) =
                logging_events::handle_ban_remove(ctx, data, *guild_id, unbanned_user).await
            {
                tracing::error!("Error handling unban log: {}", e);
            }
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            if let Err(e) = logging_events::handle_message_delete(
                ctx,
                data,
                *channel_id,
                *deleted_message_id,
                *guild_id,
            )
            .await
            {
                tracing::error!("Error handling message delete: {}", e);
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available,
            event,
            ..
        } => {
            if let Err(e) =
                logging_events::handle_message_update(ctx, data, old_if_available.as_ref(), event)
                    .await
            {
                tracing::error!("Error handling message update: {}", e);
            }
        }

        _ => {}
    }

    Ok(())
}

/// Per-guild prefix from settings; DMs fall back to the default.
async fn guild_prefix(
    ctx: poise::PartialContext<'_, Data, Error>,
) -> Result<Option<String>, Error> {
    let Some(guild_id) = ctx.guild_id else {
        return Ok(Some(DEFAULT_PREFIX.to_string()));
    };
    let settings = ctx.data.settings.get_or_create(guild_id.get()).await?;
    Ok(Some(settings.prefix))
}

fn all_commands() -> Vec<poise::Command<Data, Error>> {
    use crate::discord::moderation::commands as moderation;

    vec![
        moderation::warn(),
        moderation::mute(),
        moderation::unmute(),
        moderation::timeout(),
        moderation::kick(),
        moderation::ban(),
        moderation::softban(),
        moderation::unban(),
        moderation::infractions(),
        moderation::case(),
        moderation::delcase(),
        moderation::casecount(),
        discord::settings::commands::settings(),
        discord::tags::commands::tag(),
        discord::commands::afk::afk(),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn")),
        )
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = infra::database::connect(&config.database_path).await?;

    let infraction_store = SqliteInfractionStore::new(pool.clone());
    infraction_store
        .migrate()
        .await
        .context("Failed to migrate infractions")?;
    let settings_store = SqliteSettingsStore::new(pool.clone());
    settings_store
        .migrate()
        .await
        .context("Failed to migrate guild settings")?;
    let tag_store = SqliteTagStore::new(pool);
    tag_store.migrate().await.context("Failed to migrate tags")?;

    let data = Data {
        moderation: Arc::new(ModerationService::new(
            infraction_store,
            EscalationPolicy::new(config.escalation_threshold),
        )),
        settings: Arc::new(SettingsService::new(settings_store)),
        tags: Arc::new(TagService::new(tag_store)),
        logging: Arc::new(LoggingService::new()),
        afk: Arc::new(AfkRegistry::new()),
        users: Arc::new(UserDirectory::new()),
    };

    tracing::info!(
        database = %config.database_path,
        escalation_threshold = config.escalation_threshold,
        "Services initialised"
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required for detection and prefix commands
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MODERATION;

    let dev_guild_id = config.dev_guild_id;
    let sweep_every = config.mute_sweep_interval;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                dynamic_prefix: Some(|ctx| Box::pin(guild_prefix(ctx))),
                mention_as_prefix: true,
                ..Default::default()
            },
            command_check: Some(|ctx| Box::pin(discord::permissions::command_allowed(ctx))),
            on_error: |error| Box::pin(discord::errors::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                match dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        tracing::info!(guild_id, "Commands registered in development guild");
                    }
                    None => {
                        // Global registration can take up to an hour to propagate.
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        tracing::info!("Commands registered globally");
                    }
                }

                tokio::spawn(presence::rotate(ctx.clone()));

                tokio::spawn(mute_sweep::run(
                    ctx.http.clone(),
                    Arc::clone(&data.moderation),
                    Arc::clone(&data.settings),
                    sweep_every,
                ));

                Ok(data)
            })
        })
        .build();

    // Deleted messages are logged from the cache when we never tracked them.
    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .cache_settings(cache_settings)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
