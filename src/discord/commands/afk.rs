use crate::discord::{Context, Error};

/// Mark yourself as away. Anyone who mentions you gets told, until you next speak.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn afk(
    ctx: Context<'_>,
    #[description = "Why you're away"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let status = ctx
        .data()
        .afk
        .set(guild_id.get(), ctx.author().id.get(), reason);

    tracing::debug!(
        guild_id = guild_id.get(),
        user_id = status.user_id,
        "AFK status set"
    );
    ctx.say(format!("You're now AFK: {}", status.reason)).await?;
    Ok(())
}
