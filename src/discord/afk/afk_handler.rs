// AFK notices: clear a member's status when they speak again, and tell
// anyone who mentions an AFK member why they're away.

use crate::core::afk::AfkStatus;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

pub fn away_notice(status: &AfkStatus) -> String {
    format!(
        "<@{}> is AFK: {} (since <t:{}:R>)",
        status.user_id,
        status.reason,
        status.since.timestamp()
    )
}

pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let guild_id = guild_id.get();
    let author_id = message.author.id.get();

    if let Some(status) = data.afk.clear(guild_id, author_id) {
        message
            .reply(
                &ctx.http,
                format!(
                    "Welcome back! I removed your AFK status (set <t:{}:R>).",
                    status.since.timestamp()
                ),
            )
            .await?;
    }

    let mentioned: Vec<u64> = message
        .mentions
        .iter()
        .filter(|user| !user.bot && user.id != message.author.id)
        .map(|user| user.id.get())
        .collect();
    let away = data.afk.lookup_many(guild_id, &mentioned);
    if away.is_empty() {
        return Ok(());
    }

    let notice = away.iter().map(away_notice).collect::<Vec<_>>().join("\n");
    message
        .channel_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .content(notice)
                .allowed_mentions(serenity::CreateAllowedMentions::new()),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_names_user_and_reason() {
        let status = AfkStatus {
            user_id: 5,
            reason: "lunch".into(),
            since: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        assert_eq!(
            away_notice(&status),
            "<@5> is AFK: lunch (since <t:1700000000:R>)"
        );
    }
}
