// Top-level poise error handler. Commands return `Error` and land here.

use crate::discord::{Data, Error};
use poise::FrameworkError;

const GENERIC_FAILURE: &str = "Something went wrong while running that command.";

pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                guild_id = ?ctx.guild_id().map(|id| id.get()),
                user_id = ctx.author().id.get(),
                error = %error,
                "Command error"
            );
            if let Err(e) = ctx.say(GENERIC_FAILURE).await {
                tracing::warn!("Failed to report command error: {}", e);
            }
        }
        FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                tracing::error!(
                    command = %ctx.command().qualified_name,
                    guild_id = ?ctx.guild_id().map(|id| id.get()),
                    user_id = ctx.author().id.get(),
                    error = %error,
                    "Command check failed"
                );
            }
            let reply = poise::CreateReply::default()
                .content("You can't use that command here.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Failed to report check failure: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}
