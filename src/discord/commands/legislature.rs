// Discord commands for the legislature: bills, committees, floor votes.

use crate::core::legislature::{Ballot, Bill, BillStatus, VoteTally};
use crate::discord::commands::citizenship::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum BallotChoice {
    Yea,
    Nay,
    Present,
}

impl From<BallotChoice> for Ballot {
    fn from(choice: BallotChoice) -> Self {
        match choice {
            BallotChoice::Yea => Ballot::Yea,
            BallotChoice::Nay => Ballot::Nay,
            BallotChoice::Present => Ballot::Present,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum DocketChoice {
    Introduced,
    #[name = "In Committee"]
    InCommittee,
    #[name = "On Floor"]
    OnFloor,
    Passed,
    Failed,
    Signed,
    Vetoed,
}

impl From<DocketChoice> for BillStatus {
    fn from(choice: DocketChoice) -> Self {
        match choice {
            DocketChoice::Introduced => BillStatus::Introduced,
            DocketChoice::InCommittee => BillStatus::InCommittee,
            DocketChoice::OnFloor => BillStatus::OnFloor,
            DocketChoice::Passed => BillStatus::Passed,
            DocketChoice::Failed => BillStatus::Failed,
            DocketChoice::Signed => BillStatus::Signed,
            DocketChoice::Vetoed => BillStatus::Vetoed,
        }
    }
}

/// Root `/bill` command.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "introduce",
        "refer",
        "report_out",
        "to_floor",
        "vote_open",
        "vote",
        "vote_close",
        "sign",
        "veto",
        "status",
        "docket"
    )
)]
pub async fn bill(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Bill commands:\n\
        `/bill introduce <title> <text>` - Introduce a bill\n\
        `/bill refer <id> <committee>` - Refer to committee\n\
        `/bill report_out <id>` / `/bill to_floor <id>` - Move to the floor\n\
        `/bill vote_open <id>`, `/bill vote <id> <ballot>`, `/bill vote_close <id>`\n\
        `/bill sign <id>` / `/bill veto <id>` - Executive action\n\
        `/bill status <id>` / `/bill docket <status>` - Look things up",
    )
    .await?;
    Ok(())
}

/// Introduce a bill. You must be an active citizen.
#[poise::command(slash_command, guild_only)]
pub async fn introduce(
    ctx: Context<'_>,
    #[description = "Short title"] title: String,
    #[description = "Full text of the bill"] text: String,
) -> Result<(), Error> {
    let bill = ctx
        .data()
        .legislature
        .introduce(ctx.author().id.get(), title, text)
        .await?;

    ctx.say(format!(
        "📜 **{}** introduced as **{}**. It can now be referred to committee or placed on the floor.",
        bill.title, bill.id
    ))
    .await?;
    Ok(())
}

/// Refer an introduced bill to a committee.
#[poise::command(slash_command, guild_only)]
pub async fn refer(
    ctx: Context<'_>,
    #[description = "Bill id, e.g. B-12"] bill_id: String,
    #[description = "Committee name"] committee: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.refer(&bill_id, &committee).await?;
    ctx.say(format!(
        "📨 **{}** referred to the **{}** committee.",
        bill.id, committee
    ))
    .await?;
    Ok(())
}

/// Report a bill out of committee.
#[poise::command(slash_command, guild_only)]
pub async fn report_out(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.report_out(&bill_id).await?;
    ctx.say(format!("🏛️ **{}** reported out; it is on the floor.", bill.id))
        .await?;
    Ok(())
}

/// Place an introduced bill directly on the floor (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn to_floor(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.to_floor(&bill_id).await?;
    ctx.say(format!("🏛️ **{}** placed on the floor calendar.", bill.id))
        .await?;
    Ok(())
}

/// Open a floor vote on a bill (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn vote_open(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    ctx.data().legislature.open_floor_vote(&bill_id).await?;
    ctx.say(format!(
        "🗳️ The floor vote on **{}** is open. Cast yours with `/bill vote {} <ballot>`.",
        bill_id, bill_id
    ))
    .await?;
    Ok(())
}

/// Cast your ballot on an open floor vote.
#[poise::command(slash_command, guild_only)]
pub async fn vote(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
    #[description = "Your ballot"] ballot: BallotChoice,
) -> Result<(), Error> {
    ctx.data()
        .legislature
        .cast_ballot(&bill_id, ctx.author().id.get(), ballot.into())
        .await?;

    // Ephemeral so the chamber doesn't see individual ballots as they land.
    ctx.send(
        poise::CreateReply::default()
            .content(format!("🗳️ Ballot recorded on **{}**.", bill_id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Close the floor vote and announce the tally (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn vote_close(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let tally = ctx.data().legislature.close_floor_vote(&bill_id).await?;
    ctx.send(poise::CreateReply::default().embed(tally_embed(&bill_id, &tally)))
        .await?;
    Ok(())
}

/// Sign a passed bill into law (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn sign(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.sign(&bill_id).await?;
    ctx.say(format!("✒️ **{}** — *{}* — signed into law.", bill.id, bill.title))
        .await?;
    Ok(())
}

/// Veto a passed bill (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn veto(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.veto(&bill_id).await?;
    ctx.say(format!("🖋️ **{}** — *{}* — vetoed.", bill.id, bill.title))
        .await?;
    Ok(())
}

/// Show a bill's status and history.
#[poise::command(slash_command, guild_only)]
pub async fn status(
    ctx: Context<'_>,
    #[description = "Bill id"] bill_id: String,
) -> Result<(), Error> {
    let bill = ctx.data().legislature.bill(&bill_id).await?;
    ctx.send(poise::CreateReply::default().embed(bill_embed(&bill)))
        .await?;
    Ok(())
}

/// List bills in a given status.
#[poise::command(slash_command, guild_only)]
pub async fn docket(
    ctx: Context<'_>,
    #[description = "Status to list"] status: DocketChoice,
) -> Result<(), Error> {
    let bills = ctx.data().legislature.docket(status.into()).await;

    if bills.is_empty() {
        ctx.say("Nothing on that docket.").await?;
        return Ok(());
    }

    let lines: Vec<String> = bills
        .iter()
        .take(20)
        .map(|b| format!("**{}** — {}", b.id, b.title))
        .collect();
    ctx.say(lines.join("\n")).await?;
    Ok(())
}

/// Root `/committee` command.
#[poise::command(slash_command, guild_only, subcommands("create", "add_member", "committee_info"))]
pub async fn committee(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Committee commands:\n\
        `/committee create <name> <chair>` - Create a committee (admin)\n\
        `/committee add_member <name> <user>` - Seat a member (admin)\n\
        `/committee committee_info <name>` - Show membership",
    )
    .await?;
    Ok(())
}

/// Create a committee (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Committee name"] name: String,
    #[description = "Committee chair"] chair: serenity::User,
) -> Result<(), Error> {
    let committee = ctx
        .data()
        .legislature
        .create_committee(name, chair.id.get())
        .await?;
    ctx.say(format!(
        "🏛️ The **{}** committee is formed, chaired by {}.",
        committee.name, chair.name
    ))
    .await?;
    Ok(())
}

/// Seat a member on a committee (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add_member(
    ctx: Context<'_>,
    #[description = "Committee name"] name: String,
    #[description = "Member to seat"] user: serenity::User,
) -> Result<(), Error> {
    let committee = ctx
        .data()
        .legislature
        .assign_member(&name, user.id.get())
        .await?;
    ctx.say(format!(
        "🪑 {} seated on **{}** ({} members).",
        user.name,
        committee.name,
        committee.member_ids.len()
    ))
    .await?;
    Ok(())
}

/// Show a committee's membership.
#[poise::command(slash_command, guild_only)]
pub async fn committee_info(
    ctx: Context<'_>,
    #[description = "Committee name"] name: String,
) -> Result<(), Error> {
    let committee = ctx.data().legislature.committee(&name).await?;
    let members: Vec<String> = committee
        .member_ids
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("🏛️ {} Committee", committee.name))
        .color(0x7D3C98)
        .field("Chair", format!("<@{}>", committee.chair_id), true)
        .field("Members", members.join(", "), false);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn tally_embed(bill_id: &str, tally: &VoteTally) -> serenity::CreateEmbed {
    let (title, color) = if tally.passed {
        (format!("✅ {} passes", bill_id), 0x00FF00)
    } else if !tally.quorum_met {
        (format!("⚠️ {} fails — quorum not met", bill_id), 0xFFA500)
    } else {
        (format!("❌ {} fails", bill_id), 0xFF0000)
    };

    serenity::CreateEmbed::new()
        .title(title)
        .color(color)
        .field("Yea", tally.yea.to_string(), true)
        .field("Nay", tally.nay.to_string(), true)
        .field("Present", tally.present.to_string(), true)
}

fn bill_embed(bill: &Bill) -> serenity::CreateEmbed {
    let history: Vec<String> = bill
        .history
        .iter()
        .rev()
        .take(8)
        .map(|h| format!("<t:{}:d> {}", h.at.timestamp(), h.event))
        .collect();

    let mut text: String = bill.text.chars().take(1000).collect();
    if text.len() < bill.text.len() {
        text.push('…');
    }

    serenity::CreateEmbed::new()
        .title(format!("📜 {} — {}", bill.id, bill.title))
        .color(0x117A65)
        .description(text)
        .field("Status", bill.status.to_string(), true)
        .field("Sponsor", format!("<@{}>", bill.sponsor_id), true)
        .field(
            "History",
            if history.is_empty() {
                "—".to_string()
            } else {
                history.join("\n")
            },
            false,
        )
}
