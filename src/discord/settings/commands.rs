// Server configuration commands. Every change goes through the settings
// service so the stored document and the cache stay in step.

use crate::core::settings::{
    DetectionFlag, ExtraRoleKind, GuildSettings, ListSetting, LogChannelKind, SettingsError,
    SettingsField,
};
use crate::discord::permissions::is_admin;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use poise::ChoiceParameter;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum LogChannelChoice {
    #[name = "Bot events"]
    Bot,
    #[name = "Message edits and deletes"]
    Message,
}

impl From<LogChannelChoice> for LogChannelKind {
    fn from(choice: LogChannelChoice) -> Self {
        match choice {
            LogChannelChoice::Bot => LogChannelKind::Bot,
            LogChannelChoice::Message => LogChannelKind::Message,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RoleChoice {
    Admin,
    Bypass,
}

impl From<RoleChoice> for ExtraRoleKind {
    fn from(choice: RoleChoice) -> Self {
        match choice {
            RoleChoice::Admin => ExtraRoleKind::Admin,
            RoleChoice::Bypass => ExtraRoleKind::Bypass,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum DetectionChoice {
    #[name = "Link domains"]
    Domain,
    #[name = "Bad words"]
    BadWord,
    #[name = "Timeout instead of mute role"]
    TimeoutInsteadOfMute,
}

impl From<DetectionChoice> for DetectionFlag {
    fn from(choice: DetectionChoice) -> Self {
        match choice {
            DetectionChoice::Domain => DetectionFlag::Domain,
            DetectionChoice::BadWord => DetectionFlag::BadWord,
            DetectionChoice::TimeoutInsteadOfMute => DetectionFlag::TimeoutInsteadOfMute,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ListChoice {
    #[name = "Moderator roles"]
    ModRoles,
    #[name = "Command-disabled channels"]
    CommandDisabledChannels,
    #[name = "Detection-only channels"]
    DetectionExclusiveChannels,
    #[name = "Bad words"]
    BadWords,
    #[name = "Whitelisted domains"]
    DomainsWhitelisted,
}

impl From<ListChoice> for ListSetting {
    fn from(choice: ListChoice) -> Self {
        match choice {
            ListChoice::ModRoles => ListSetting::ModRoles,
            ListChoice::CommandDisabledChannels => ListSetting::CommandDisabledChannels,
            ListChoice::DetectionExclusiveChannels => ListSetting::DetectionExclusiveChannels,
            ListChoice::BadWords => ListSetting::BadWords,
            ListChoice::DomainsWhitelisted => ListSetting::DomainsWhitelisted,
        }
    }
}

fn channel_or_unset(id: Option<u64>) -> String {
    id.map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "Not set".to_string())
}

fn role_or_unset(id: Option<u64>) -> String {
    id.map(|id| format!("<@&{}>", id))
        .unwrap_or_else(|| "Not set".to_string())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "On"
    } else {
        "Off"
    }
}

fn id_list(ids: &[u64], render: fn(u64) -> String) -> String {
    if ids.is_empty() {
        "None".to_string()
    } else {
        ids.iter().map(|id| render(*id)).collect::<Vec<_>>().join(", ")
    }
}

fn word_list(words: &[String]) -> String {
    if words.is_empty() {
        "None".to_string()
    } else {
        words
            .iter()
            .map(|w| format!("`{}`", w))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn settings_embed(settings: &GuildSettings) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Server Settings")
        .color(serenity::Color::BLURPLE)
        .field("Prefix", format!("`{}`", settings.prefix), true)
        .field("Bot Log", channel_or_unset(settings.log_channels.bot), true)
        .field(
            "Message Log",
            channel_or_unset(settings.log_channels.message),
            true,
        )
        .field("Admin Role", role_or_unset(settings.extra_roles.admin), true)
        .field("Bypass Role", role_or_unset(settings.extra_roles.bypass), true)
        .field("Mute Role", role_or_unset(settings.mute_role), true)
        .field(
            "Moderator Roles",
            id_list(&settings.mod_roles, |id| format!("<@&{}>", id)),
            false,
        )
        .field(
            "Command-disabled Channels",
            id_list(&settings.command_disabled_channels, |id| format!("<#{}>", id)),
            false,
        )
        .field(
            "Detection",
            format!(
                "Links: {} | Bad words: {} | Timeout instead of mute: {}",
                on_off(settings.domain_detection),
                on_off(settings.bad_word_detection),
                on_off(settings.timeout_instead_of_mute)
            ),
            false,
        )
        .field(
            "Detection-only Channels",
            id_list(&settings.detection_exclusive_channels, |id| {
                format!("<#{}>", id)
            }),
            false,
        )
        .field("Bad Words", word_list(&settings.bad_words), false)
        .field(
            "Whitelisted Domains",
            word_list(&settings.domains_whitelisted),
            false,
        )
        .field(
            "Tickets Channel",
            channel_or_unset(settings.tickets_channel),
            true,
        )
}

fn require_guild(ctx: Context<'_>) -> Result<u64, Error> {
    Ok(ctx.guild_id().ok_or("This command only works in servers")?.get())
}

async fn apply(ctx: Context<'_>, field: SettingsField, done: String) -> Result<(), Error> {
    match ctx.data().settings.update(require_guild(ctx)?, field).await {
        Ok(_) => ctx.say(done).await?,
        Err(SettingsError::InvalidValue(reason)) => ctx.say(reason).await?,
        Err(e) => return Err(e.into()),
    };
    Ok(())
}

/// View or change this server's configuration.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    subcommands(
        "show",
        "prefix",
        "logchannel",
        "role",
        "muterole",
        "ticketschannel",
        "detection",
        "list"
    )
)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

async fn show_inner(ctx: Context<'_>) -> Result<(), Error> {
    let settings = ctx.data().settings.get_or_create(require_guild(ctx)?).await?;
    ctx.send(poise::CreateReply::default().embed(settings_embed(&settings)))
        .await?;
    Ok(())
}

/// Show the current configuration.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

/// Change the prefix for text commands.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "New prefix (1-5 characters)"] prefix: String,
) -> Result<(), Error> {
    let done = format!("Prefix set to `{}`.", prefix);
    apply(ctx, SettingsField::Prefix(prefix), done).await
}

/// Set or clear a log channel.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn logchannel(
    ctx: Context<'_>,
    #[description = "Which log"] kind: LogChannelChoice,
    #[description = "Channel (leave empty to disable)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let id = channel.as_ref().map(|c| c.id.get());
    let done = format!("{} log: {}.", kind.name(), channel_or_unset(id));
    apply(ctx, SettingsField::LogChannel(kind.into(), id), done).await
}

/// Set or clear the admin or bypass role.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn role(
    ctx: Context<'_>,
    #[description = "Which role"] kind: RoleChoice,
    #[description = "Role (leave empty to clear)"] role: Option<serenity::Role>,
) -> Result<(), Error> {
    let id = role.as_ref().map(|r| r.id.get());
    let done = format!("{} role: {}.", kind.name(), role_or_unset(id));
    apply(ctx, SettingsField::ExtraRole(kind.into(), id), done).await
}

/// Set or clear the role used for mutes.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn muterole(
    ctx: Context<'_>,
    #[description = "Role (leave empty to clear)"] role: Option<serenity::Role>,
) -> Result<(), Error> {
    let id = role.as_ref().map(|r| r.id.get());
    let done = format!("Mute role: {}.", role_or_unset(id));
    apply(ctx, SettingsField::MuteRole(id), done).await
}

/// Set or clear the tickets channel.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn ticketschannel(
    ctx: Context<'_>,
    #[description = "Channel (leave empty to clear)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let id = channel.as_ref().map(|c| c.id.get());
    let done = format!("Tickets channel: {}.", channel_or_unset(id));
    apply(ctx, SettingsField::TicketsChannel(id), done).await
}

/// Turn a detector or behaviour flag on or off.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn detection(
    ctx: Context<'_>,
    #[description = "Flag"] flag: DetectionChoice,
    #[description = "Enabled?"] enabled: bool,
) -> Result<(), Error> {
    let done = format!("{}: {}.", flag.name(), on_off(enabled));
    apply(ctx, SettingsField::Flag(flag.into(), enabled), done).await
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ListAction {
    Add,
    Remove,
}

/// Add or remove an entry in one of the list settings.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_admin")]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Add or remove"] action: ListAction,
    #[description = "Which list"] list: ListChoice,
    #[description = "Role/channel id, word, or domain"] entry: String,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let setting: ListSetting = list.into();
    let entry = clean_entry(&entry);
    let service = &ctx.data().settings;

    let result = match action {
        ListAction::Add => service.add_to_list(guild_id, setting, &entry).await,
        ListAction::Remove => service.remove_from_list(guild_id, setting, &entry).await,
    };

    let reply = match (action, result) {
        (ListAction::Add, Ok(true)) => format!("Added `{}` to {}.", entry, list.name()),
        (ListAction::Add, Ok(false)) => format!("`{}` is already in {}.", entry, list.name()),
        (ListAction::Remove, Ok(true)) => format!("Removed `{}` from {}.", entry, list.name()),
        (ListAction::Remove, Ok(false)) => format!("`{}` isn't in {}.", entry, list.name()),
        (_, Err(SettingsError::InvalidValue(reason))) => reason,
        (_, Err(e)) => return Err(e.into()),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Accept pasted mentions (`<#123>`, `<@&123>`) as plain ids.
pub fn clean_entry(entry: &str) -> String {
    let trimmed = entry.trim();
    let stripped = trimmed
        .strip_prefix("<#")
        .or_else(|| trimmed.strip_prefix("<@&"))
        .and_then(|rest| rest.strip_suffix('>'));
    stripped.unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_reduced_to_ids() {
        assert_eq!(clean_entry("<#123>"), "123");
        assert_eq!(clean_entry("<@&456>"), "456");
        assert_eq!(clean_entry("  example.com "), "example.com");
        assert_eq!(clean_entry("<#oops"), "<#oops");
    }

    #[test]
    fn empty_lists_render_as_none() {
        assert_eq!(id_list(&[], |id| id.to_string()), "None");
        assert_eq!(word_list(&["heck".to_string()]), "`heck`");
        assert_eq!(channel_or_unset(Some(5)), "<#5>");
        assert_eq!(role_or_unset(None), "Not set");
    }
}
