// Discord commands for elections and seat apportionment.

use crate::core::elections::{apportion, ContestResult};
use crate::discord::commands::citizenship::{Context, Error};
use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;

/// Root `/election` command.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("schedule", "open", "vote", "close", "results", "apportion_seats")
)]
pub async fn election(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Election commands:\n\
        `/election schedule <office> <candidates...> <hours>` - Schedule a contest (admin)\n\
        `/election open <id>` / `/election close <id>` - Run the polls (admin)\n\
        `/election vote <id> <candidate>` - Cast your ballot\n\
        `/election results <id>` - Results of a closed contest\n\
        `/election apportion_seats <seats>` - Huntington-Hill seats by region",
    )
    .await?;
    Ok(())
}

/// Schedule a contest (admin). Polls open with `/election open`.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn schedule(
    ctx: Context<'_>,
    #[description = "Office up for election"] office: String,
    #[description = "First candidate"] candidate1: serenity::User,
    #[description = "Second candidate"] candidate2: serenity::User,
    #[description = "Third candidate"] candidate3: Option<serenity::User>,
    #[description = "Fourth candidate"] candidate4: Option<serenity::User>,
    #[description = "Voting window in hours (default 24)"] hours: Option<i64>,
) -> Result<(), Error> {
    let candidates = unique_candidates(
        [Some(candidate1), Some(candidate2), candidate3, candidate4]
            .into_iter()
            .flatten()
            .map(|u| u.id.get()),
    );

    let opens_at = Utc::now();
    let closes_at = opens_at + Duration::hours(hours.unwrap_or(24).clamp(1, 24 * 14));

    let contest = ctx
        .data()
        .elections
        .schedule(office, candidates, opens_at, closes_at)
        .await?;

    ctx.say(format!(
        "🗳️ Contest **#{}** for **{}** scheduled with {} candidates. \
        Polls close <t:{}:R> once opened.",
        contest.id,
        contest.office,
        contest.candidate_ids.len(),
        contest.closes_at.timestamp()
    ))
    .await?;
    Ok(())
}

/// Open the polls (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn open(
    ctx: Context<'_>,
    #[description = "Contest id"] contest_id: u64,
) -> Result<(), Error> {
    let contest = ctx.data().elections.open_polls(contest_id).await?;
    ctx.say(format!(
        "🗳️ Polls are open for **{}** (contest #{}). Vote with `/election vote {} <candidate>`.",
        contest.office, contest.id, contest.id
    ))
    .await?;
    Ok(())
}

/// Cast your ballot.
#[poise::command(slash_command, guild_only)]
pub async fn vote(
    ctx: Context<'_>,
    #[description = "Contest id"] contest_id: u64,
    #[description = "Candidate"] candidate: serenity::User,
) -> Result<(), Error> {
    ctx.data()
        .elections
        .cast_vote(contest_id, ctx.author().id.get(), candidate.id.get())
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!("🗳️ Ballot recorded in contest #{}.", contest_id))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Close the polls and announce the result (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn close(
    ctx: Context<'_>,
    #[description = "Contest id"] contest_id: u64,
) -> Result<(), Error> {
    let result = ctx.data().elections.close_polls(contest_id).await?;
    ctx.send(poise::CreateReply::default().embed(result_embed(&result)))
        .await?;
    Ok(())
}

/// Results of a closed contest.
#[poise::command(slash_command, guild_only)]
pub async fn results(
    ctx: Context<'_>,
    #[description = "Contest id"] contest_id: u64,
) -> Result<(), Error> {
    let result = ctx.data().elections.results(contest_id).await?;
    ctx.send(poise::CreateReply::default().embed(result_embed(&result)))
        .await?;
    Ok(())
}

/// Apportion seats across regions by active population (Huntington-Hill).
#[poise::command(slash_command, guild_only)]
pub async fn apportion_seats(
    ctx: Context<'_>,
    #[description = "Total seats to apportion"] seats: u32,
) -> Result<(), Error> {
    let populations = ctx.data().citizenship.population_by_region().await;
    let allocation = apportion(&populations, seats as usize)?;

    let lines: Vec<String> = allocation
        .iter()
        .map(|(region, held)| {
            format!(
                "**{}** — {} seat(s) ({} citizens)",
                region,
                held,
                populations.get(region).copied().unwrap_or(0)
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("🏛️ {} seats, Huntington-Hill method", seats))
        .color(0x9A7D0A)
        .description(lines.join("\n"));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Drop repeated mentions wherever they appear, keeping first-seen order.
fn unique_candidates(ids: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut out = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn result_embed(result: &ContestResult) -> serenity::CreateEmbed {
    let mut standings: Vec<(&u64, &usize)> = result.totals.iter().collect();
    standings.sort_by(|a, b| b.1.cmp(a.1));
    let lines: Vec<String> = standings
        .iter()
        .map(|(candidate, votes)| format!("<@{}> — {} vote(s)", candidate, votes))
        .collect();

    let outcome = match (&result.winner, result.tied.is_empty()) {
        (Some(winner), _) => format!("🏆 Winner: <@{}>", winner),
        (None, false) => {
            let tied: Vec<String> = result.tied.iter().map(|c| format!("<@{}>", c)).collect();
            format!("🤝 Tied between {}. A runoff is needed.", tied.join(", "))
        }
        (None, true) => "No votes were cast.".to_string(),
    };

    serenity::CreateEmbed::new()
        .title(format!(
            "🗳️ {} — contest #{}",
            result.office, result.contest_id
        ))
        .color(0x9A7D0A)
        .description(format!("{}\n\n{}", outcome, lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_candidates_drops_non_adjacent_repeats() {
        // The same user mentioned in slots one and three.
        assert_eq!(unique_candidates([7, 8, 7]), vec![7, 8]);
        assert_eq!(unique_candidates([5, 5]), vec![5]);
        assert_eq!(unique_candidates([1, 2, 3, 4]), vec![1, 2, 3, 4]);
    }
}
