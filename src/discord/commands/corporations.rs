// Discord commands for the corporate registry and taxation.

use crate::core::corporations::Corporation;
use crate::discord::commands::citizenship::{Context, Error};
use poise::serenity_prelude as serenity;

/// Root `/corp` command.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("register", "renew", "declare", "assess", "dissolve", "info", "mine")
)]
pub async fn corp(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Corporation commands:\n\
        `/corp register <name>` - Register a corporation\n\
        `/corp renew <reg_no>` - Renew a registration\n\
        `/corp declare <reg_no> <amount>` - Declare revenue\n\
        `/corp assess <reg_no>` - Assess tax (admin)\n\
        `/corp dissolve <reg_no>` - Dissolve (admin)\n\
        `/corp info <reg_no>` / `/corp mine` - Look things up",
    )
    .await?;
    Ok(())
}

/// Register a corporation. You must be an active citizen.
#[poise::command(slash_command, guild_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Corporation name"] name: String,
) -> Result<(), Error> {
    let corp = ctx
        .data()
        .corporations
        .register(ctx.author().id.get(), name)
        .await?;

    ctx.say(format!(
        "🏢 **{}** registered as **{}**. Renewal due <t:{}:D>.",
        corp.name,
        corp.reg_no,
        corp.renewal_due.timestamp()
    ))
    .await?;
    Ok(())
}

/// Renew a registration. Renewing a lapsed corporation reactivates it.
#[poise::command(slash_command, guild_only)]
pub async fn renew(
    ctx: Context<'_>,
    #[description = "Registration number"] reg_no: String,
) -> Result<(), Error> {
    let corp = ctx.data().corporations.renew(&reg_no).await?;
    ctx.say(format!(
        "🔄 **{}** renewed. Next renewal due <t:{}:D>.",
        corp.name,
        corp.renewal_due.timestamp()
    ))
    .await?;
    Ok(())
}

/// Declare revenue toward the next tax assessment.
#[poise::command(slash_command, guild_only)]
pub async fn declare(
    ctx: Context<'_>,
    #[description = "Registration number"] reg_no: String,
    #[description = "Revenue to declare"] amount: i64,
) -> Result<(), Error> {
    let corp = ctx.data().corporations.declare_revenue(&reg_no, amount).await?;
    ctx.say(format!(
        "🧾 **{}** has {} in revenue awaiting assessment.",
        corp.name,
        format_number(corp.declared_revenue)
    ))
    .await?;
    Ok(())
}

/// Assess tax on declared revenue (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn assess(
    ctx: Context<'_>,
    #[description = "Registration number"] reg_no: String,
) -> Result<(), Error> {
    let assessment = ctx.data().corporations.assess_tax(&reg_no).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("🧾 Tax assessment for {}", assessment.reg_no))
        .color(0xB03A2E)
        .field("Revenue", format_number(assessment.revenue), true)
        .field(
            "Rate",
            format!("{:.0}%", assessment.rate * 100.0),
            true,
        )
        .field("Tax due", format_number(assessment.tax_due), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Dissolve a corporation permanently (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn dissolve(
    ctx: Context<'_>,
    #[description = "Registration number"] reg_no: String,
) -> Result<(), Error> {
    let corp = ctx.data().corporations.dissolve(&reg_no).await?;
    ctx.say(format!("🏚️ **{}** has been dissolved.", corp.name))
        .await?;
    Ok(())
}

/// Show a corporation's record.
#[poise::command(slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Registration number"] reg_no: String,
) -> Result<(), Error> {
    let corp = ctx.data().corporations.corporation(&reg_no).await?;
    ctx.send(poise::CreateReply::default().embed(corp_embed(&corp)))
        .await?;
    Ok(())
}

/// List corporations you own.
#[poise::command(slash_command, guild_only)]
pub async fn mine(ctx: Context<'_>) -> Result<(), Error> {
    let corps = ctx.data().corporations.owned_by(ctx.author().id.get()).await;
    if corps.is_empty() {
        ctx.say("You don't own any corporations. `/corp register <name>` to start one.")
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = corps
        .iter()
        .map(|c| format!("**{}** ({}) — {}", c.name, c.reg_no, c.status))
        .collect();
    ctx.say(lines.join("\n")).await?;
    Ok(())
}

fn corp_embed(corp: &Corporation) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("🏢 {} ({})", corp.name, corp.reg_no))
        .color(0x1F618D)
        .field("Owner", format!("<@{}>", corp.owner_id), true)
        .field("Status", corp.status.to_string(), true)
        .field(
            "Renewal due",
            format!("<t:{}:D>", corp.renewal_due.timestamp()),
            true,
        )
        .field(
            "Declared revenue",
            format_number(corp.declared_revenue),
            true,
        )
        .field(
            "Registered",
            format!("<t:{}:D>", corp.registered_at.timestamp()),
            true,
        )
}

/// Format a number with commas for readability
fn format_number(n: i64) -> String {
    let s = n.to_string();
    let negative = s.starts_with('-');
    let s = if negative { &s[1..] } else { &s };

    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }

    if negative {
        result.insert(0, '-');
    }

    result
}
