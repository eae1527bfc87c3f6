// Tag (canned response) commands.

use crate::core::tags::{Tag, TagButton, TagEmbed, TagError, TagExtras};
use crate::discord::logging::formatter::truncate;
use crate::discord::permissions::author_access;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Plain message for the errors a user can cause; anything else is ours.
fn user_message(error: &TagError) -> Option<String> {
    match error {
        TagError::NotFound(name) => Some(format!("No tag named `{}`.", name)),
        TagError::AlreadyExists(name) => Some(format!("A tag named `{}` already exists.", name)),
        TagError::NotOwner(name) => Some(format!("You don't own the tag `{}`.", name)),
        TagError::InvalidName(reason) | TagError::InvalidContent(reason) => Some(reason.clone()),
        TagError::Malformed(_) | TagError::Storage(_) => None,
    }
}

async fn reply_or_raise<T>(ctx: Context<'_>, result: Result<T, TagError>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match user_message(&e) {
            Some(message) => {
                ctx.say(message).await?;
                Ok(None)
            }
            None => Err(e.into()),
        },
    }
}

async fn caller_is_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let access = author_access(ctx).await?;
    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;
    Ok(settings.is_admin(&access.roles, access.administrator()))
}

pub fn build_extras(
    embed_title: Option<String>,
    embed_colour: Option<u32>,
    button_label: Option<String>,
    button_url: Option<String>,
) -> TagExtras {
    TagExtras {
        embed: embed_title.map(|title| TagEmbed {
            title,
            colour: embed_colour,
        }),
        button: match (button_label, button_url) {
            (Some(label), Some(url)) => Some(TagButton { label, url }),
            (None, Some(url)) => Some(TagButton {
                label: "Open".to_string(),
                url,
            }),
            _ => None,
        },
    }
}

fn render(tag: &Tag) -> poise::CreateReply {
    let mut reply = poise::CreateReply::default();

    reply = match &tag.extras.embed {
        Some(embed) => {
            let mut rendered = serenity::CreateEmbed::new()
                .title(&embed.title)
                .description(&tag.content);
            if let Some(colour) = embed.colour {
                rendered = rendered.color(colour);
            }
            reply.embed(rendered)
        }
        None => reply.content(&tag.content),
    };

    if let Some(button) = &tag.extras.button {
        let link = serenity::CreateButton::new_link(&button.url).label(&button.label);
        reply = reply.components(vec![serenity::CreateActionRow::Buttons(vec![link])]);
    }
    reply
}

/// Show, create and manage tags.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("show", "create", "edit", "delete", "list", "info")
)]
pub async fn tag(
    ctx: Context<'_>,
    #[description = "Tag name"] name: Option<String>,
) -> Result<(), Error> {
    match name {
        Some(name) => show_inner(ctx, &name).await,
        None => {
            ctx.say("Usage: `tag <name>` or one of the subcommands.").await?;
            Ok(())
        }
    }
}

async fn show_inner(ctx: Context<'_>, name: &str) -> Result<(), Error> {
    let result = ctx.data().tags.invoke(name).await;
    if let Some(tag) = reply_or_raise(ctx, result).await? {
        ctx.send(render(&tag)).await?;
    }
    Ok(())
}

/// Post a tag.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "Tag name"] name: String,
) -> Result<(), Error> {
    show_inner(ctx, &name).await
}

/// Create a new tag.
#[poise::command(slash_command, guild_only)]
#[allow(clippy::too_many_arguments)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Tag name"] name: String,
    #[description = "Embed title (posts the tag as an embed)"] embed_title: Option<String>,
    #[description = "Embed colour as hex, e.g. 5865F2"] embed_colour: Option<String>,
    #[description = "Link button label"] button_label: Option<String>,
    #[description = "Link button URL"] button_url: Option<String>,
    #[description = "Content"] content: String,
) -> Result<(), Error> {
    let Some(colour) = parse_colour(ctx, embed_colour).await? else {
        return Ok(());
    };
    let extras = build_extras(embed_title, colour, button_label, button_url);

    let result = ctx
        .data()
        .tags
        .create(&name, ctx.author().id.get(), content, extras)
        .await;
    if let Some(tag) = reply_or_raise(ctx, result).await? {
        ctx.say(format!("Created tag `{}`.", tag.name)).await?;
    }
    Ok(())
}

/// Outer `None` means the colour was invalid and the user has been told.
async fn parse_colour(ctx: Context<'_>, raw: Option<String>) -> Result<Option<Option<u32>>, Error> {
    match raw {
        None => Ok(Some(None)),
        Some(raw) => match parse_hex_colour(&raw) {
            Some(colour) => Ok(Some(Some(colour))),
            None => {
                ctx.say(format!("`{}` isn't a hex colour.", raw)).await?;
                Ok(None)
            }
        },
    }
}

pub fn parse_hex_colour(raw: &str) -> Option<u32> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Replace a tag's content. Owners and admins only.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "Tag name"] name: String,
    #[description = "New content"]
    #[rest]
    content: String,
) -> Result<(), Error> {
    let is_admin = caller_is_admin(ctx).await?;
    let result = ctx
        .data()
        .tags
        .edit(&name, ctx.author().id.get(), is_admin, content, None)
        .await;
    if let Some(tag) = reply_or_raise(ctx, result).await? {
        ctx.say(format!("Updated tag `{}`.", tag.name)).await?;
    }
    Ok(())
}

/// Delete a tag. Owners and admins only.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Tag name"] name: String,
) -> Result<(), Error> {
    let is_admin = caller_is_admin(ctx).await?;
    let result = ctx
        .data()
        .tags
        .delete(&name, ctx.author().id.get(), is_admin)
        .await;
    if let Some(tag) = reply_or_raise(ctx, result).await? {
        ctx.say(format!("Deleted tag `{}`.", tag.name)).await?;
    }
    Ok(())
}

/// List every tag.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let tags = ctx.data().tags.list().await?;
    if tags.is_empty() {
        ctx.say("There are no tags yet.").await?;
        return Ok(());
    }

    let names = tags
        .iter()
        .map(|t| format!("`{}`", t.name))
        .collect::<Vec<_>>()
        .join(", ");
    let embed = serenity::CreateEmbed::new()
        .title(format!("Tags ({})", tags.len()))
        .description(truncate(&names, 4000))
        .color(serenity::Color::BLURPLE);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Who owns a tag and how often it's used.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Tag name"] name: String,
) -> Result<(), Error> {
    let result = ctx.data().tags.get(&name).await;
    let Some(tag) = reply_or_raise(ctx, result).await? else {
        return Ok(());
    };

    let owner = ctx.data().users.display_name(ctx.http(), tag.owner_id).await;
    let embed = serenity::CreateEmbed::new()
        .title(format!("Tag `{}`", tag.name))
        .color(serenity::Color::BLURPLE)
        .field("Owner", owner, true)
        .field("Uses", tag.uses.to_string(), true)
        .field("Created", format!("<t:{}:R>", tag.created.timestamp()), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
