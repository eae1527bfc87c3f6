// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

pub mod database;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "tags/mod.rs"]
pub mod tags;
