// Small standalone commands and bot lifecycle glue.
// Feature commands (moderation, settings, tags) live beside their handlers.

pub mod afk;

pub mod presence;
