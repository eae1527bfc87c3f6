// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "cache/mod.rs"]
pub mod cache;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "tags/mod.rs"]
pub mod tags;

#[path = "afk/mod.rs"]
pub mod afk;

#[path = "logging/mod.rs"]
pub mod logging;
