// Discord layer - commands and event handlers.
//
// Everything here translates serenity/poise types into primitives, calls the
// core, and renders the result. No business rules live in this layer.

use crate::core::afk::AfkRegistry;
use crate::core::logging::LoggingService;
use crate::core::moderation::ModerationService;
use crate::core::settings::SettingsService;
use crate::core::tags::TagService;
use crate::infra::moderation::SqliteInfractionStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::tags::SqliteTagStore;
use std::sync::Arc;

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod errors;
pub mod permissions;
pub mod users;

pub mod afk {
    pub mod afk_handler;
}

pub mod logging {
    pub mod events;
    pub mod formatter;
}

pub mod moderation {
    pub mod actions;
    pub mod commands;
    pub mod detection_handler;
    pub mod mute_sweep;
}

pub mod settings {
    pub mod commands;
}

pub mod tags {
    pub mod commands;
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event handler.
pub struct Data {
    pub moderation: Arc<ModerationService<SqliteInfractionStore>>,
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
    pub tags: Arc<TagService<SqliteTagStore>>,
    pub logging: Arc<LoggingService>,
    pub afk: Arc<AfkRegistry>,
    pub users: Arc<users::UserDirectory>,
}
