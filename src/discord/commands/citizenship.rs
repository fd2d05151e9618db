// Discord commands for citizenship.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::citizenship::CitizenshipService;
use crate::core::corporations::CorporationService;
use crate::core::elections::ElectionService;
use crate::core::legislature::LegislatureService;
use crate::core::statutes::StatuteService;
use crate::infra::registry::JsonRegistryStore;
use crate::infra::statutes::{ReleaseClient, SqliteStatuteStore};
use poise::serenity_prelude as serenity;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
use std::sync::Arc;

pub struct Data {
    pub citizenship: Arc<CitizenshipService<JsonRegistryStore>>,
    pub legislature: Arc<LegislatureService<JsonRegistryStore>>,
    pub elections: Arc<ElectionService<JsonRegistryStore>>,
    pub corporations: Arc<CorporationService<JsonRegistryStore>>,
    pub statutes: Arc<StatuteService<SqliteStatuteStore>>,
    pub releases: Arc<ReleaseClient>,
}

/// Root `/citizen` command. Subcommands handle registration and records.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "register",
        "relocate",
        "info",
        "roster",
        "suspend",
        "reinstate",
        "revoke"
    )
)]
pub async fn citizen(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Citizenship commands:\n\
        `/citizen register <region>` - Take up citizenship in a region\n\
        `/citizen relocate <region>` - Move your citizenship\n\
        `/citizen info [user]` - Show a citizenship record\n\
        `/citizen roster <region>` - List a region's citizens\n\
        `/citizen suspend|reinstate|revoke <user>` - Admin record actions",
    )
    .await?;
    Ok(())
}

/// Take up citizenship in a region. One citizenship per user, ever.
#[poise::command(slash_command, guild_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Region to register in"] region: String,
) -> Result<(), Error> {
    let user = ctx.author();
    if user.bot {
        ctx.say("Bots can't hold citizenship! 🤖").await?;
        return Ok(());
    }

    let citizen = ctx
        .data()
        .citizenship
        .register(user.id.get(), user.name.clone(), region)
        .await?;

    ctx.say(format!(
        "🪪 Welcome, citizen! **{}** is now registered in **{}**.",
        citizen.name, citizen.region
    ))
    .await?;
    Ok(())
}

/// Move your citizenship to another region.
#[poise::command(slash_command, guild_only)]
pub async fn relocate(
    ctx: Context<'_>,
    #[description = "Region to move to"] region: String,
) -> Result<(), Error> {
    let citizen = ctx
        .data()
        .citizenship
        .relocate(ctx.author().id.get(), region)
        .await?;

    ctx.say(format!(
        "📦 Moved! You are now a citizen of **{}**.",
        citizen.region
    ))
    .await?;
    Ok(())
}

/// Show a citizenship record.
#[poise::command(slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let citizen = ctx.data().citizenship.citizen(target.id.get()).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("🪪 Citizenship record: {}", citizen.name))
        .color(0x2E86C1)
        .thumbnail(target.face())
        .field("Region", citizen.region, true)
        .field("Status", citizen.status.to_string(), true)
        .field(
            "Registered",
            format!("<t:{}:D>", citizen.registered_at.timestamp()),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List a region's citizens.
#[poise::command(slash_command, guild_only)]
pub async fn roster(
    ctx: Context<'_>,
    #[description = "Region to list"] region: String,
) -> Result<(), Error> {
    let citizens = ctx.data().citizenship.roster(&region).await;

    if citizens.is_empty() {
        ctx.say(format!("Nobody holds citizenship in **{}** yet.", region))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = citizens
        .iter()
        .take(25)
        .map(|c| format!("• {} — {}", c.name, c.status))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("📜 Citizens of {}", region))
        .color(0x2E86C1)
        .description(lines.join("\n"))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} citizen(s)",
            citizens.len()
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Suspend a citizenship (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn suspend(
    ctx: Context<'_>,
    #[description = "Citizen to suspend"] user: serenity::User,
) -> Result<(), Error> {
    let citizen = ctx.data().citizenship.suspend(user.id.get()).await?;
    ctx.say(format!("⛔ Citizenship of **{}** suspended.", citizen.name))
        .await?;
    Ok(())
}

/// Reinstate a suspended citizenship (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reinstate(
    ctx: Context<'_>,
    #[description = "Citizen to reinstate"] user: serenity::User,
) -> Result<(), Error> {
    let citizen = ctx.data().citizenship.reinstate(user.id.get()).await?;
    ctx.say(format!("✅ Citizenship of **{}** reinstated.", citizen.name))
        .await?;
    Ok(())
}

/// Revoke a citizenship permanently (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn revoke(
    ctx: Context<'_>,
    #[description = "Citizen to revoke"] user: serenity::User,
) -> Result<(), Error> {
    let citizen = ctx.data().citizenship.revoke(user.id.get()).await?;
    ctx.say(format!(
        "🚫 Citizenship of **{}** has been revoked.",
        citizen.name
    ))
    .await?;
    Ok(())
}
