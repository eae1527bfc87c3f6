// Permission checks shared by commands.
//
// Guild settings decide who counts as a moderator or admin; the platform's
// own Manage Server / Administrator permissions always qualify.

use crate::core::moderation::{ensure_hierarchy, MemberRank, ModerationError};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// The invoking member's roles and resolved permissions.
pub struct Access {
    pub roles: Vec<u64>,
    pub permissions: serenity::Permissions,
}

impl Access {
    pub fn manage_guild(&self) -> bool {
        self.permissions.contains(serenity::Permissions::MANAGE_GUILD)
    }

    pub fn administrator(&self) -> bool {
        self.permissions.contains(serenity::Permissions::ADMINISTRATOR)
    }
}

/// Resolved permissions for a cached member, the way `author_access` resolves
/// them for commands. Empty when the guild or the member isn't cached.
pub fn cached_permissions(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> serenity::Permissions {
    cache
        .guild(guild_id)
        .and_then(|guild| {
            guild
                .members
                .get(&user_id)
                .map(|member| guild.member_permissions(member))
        })
        .unwrap_or_else(serenity::Permissions::empty)
}

pub async fn author_access(ctx: Context<'_>) -> Result<Access, Error> {
    let member = ctx
        .author_member()
        .await
        .ok_or("This command only works in servers")?;

    let roles = member.roles.iter().map(|role| role.get()).collect();
    // Interaction payloads carry resolved permissions; prefix commands fall back to the cache.
    let permissions = match member.permissions {
        Some(permissions) => permissions,
        None => ctx
            .guild()
            .map(|guild| guild.member_permissions(&member))
            .unwrap_or_else(serenity::Permissions::empty),
    };

    Ok(Access { roles, permissions })
}

/// poise check: mod role, admin role, or Manage Server.
pub async fn is_moderator(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let access = author_access(ctx).await?;
    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;
    Ok(settings.is_moderator(&access.roles, access.manage_guild()))
}

/// poise check: admin role or Administrator.
pub async fn is_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let access = author_access(ctx).await?;
    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;
    Ok(settings.is_admin(&access.roles, access.administrator()))
}

/// Framework-wide check. Channels listed as command-disabled only accept
/// commands from moderators and bypass-role holders.
pub async fn command_allowed(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(true);
    };

    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;
    if !settings.is_command_disabled_in(ctx.channel_id().get()) {
        return Ok(true);
    }

    let access = author_access(ctx).await?;
    Ok(settings.is_moderator(&access.roles, access.manage_guild())
        || settings.can_bypass(&access.roles))
}

pub fn top_role_position(positions: impl IntoIterator<Item = u16>) -> u16 {
    positions.into_iter().max().unwrap_or(0)
}

fn rank_of(guild: &serenity::Guild, member: &serenity::Member) -> MemberRank {
    MemberRank {
        user_id: member.user.id.get(),
        top_role_position: top_role_position(
            member
                .roles
                .iter()
                .filter_map(|id| guild.roles.get(id))
                .map(|role| role.position),
        ),
        is_owner: guild.owner_id == member.user.id,
    }
}

/// Verify the invoker may act on `target`. Replies with the reason and
/// returns `false` when the hierarchy forbids it.
pub async fn check_target(ctx: Context<'_>, target: &serenity::Member) -> Result<bool, Error> {
    let actor = ctx
        .author_member()
        .await
        .ok_or("This command only works in servers")?
        .into_owned();

    let ranks = ctx
        .guild()
        .map(|guild| (rank_of(&guild, &actor), rank_of(&guild, target)))
        .ok_or("Server details aren't cached yet, try again shortly.")?;

    match ensure_hierarchy(ranks.0, ranks.1) {
        Ok(()) => Ok(true),
        Err(ModerationError::Hierarchy(message)) => {
            ctx.say(message).await?;
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
