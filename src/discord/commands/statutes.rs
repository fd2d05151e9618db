// Discord commands for the statute library: imports, search, and history.

use crate::core::statutes::{parse_src_json, parse_usc_xml, ImportReport};
use crate::discord::commands::citizenship::{Context, Error};
use poise::serenity_prelude as serenity;

/// Root `/statute` command.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("import_usc", "import_src", "search", "show", "history", "titles")
)]
pub async fn statute(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Statute commands:\n\
        `/statute import_usc <title_code> <url>` - Import a USC XML release (admin)\n\
        `/statute import_src <title_code> <url>` - Import an SRC JSON release (admin)\n\
        `/statute search <query>` - Full-text search\n\
        `/statute show <title_code> <citation>` - Read a section\n\
        `/statute history <title_code> <citation>` - Section change history\n\
        `/statute titles` - List stored titles",
    )
    .await?;
    Ok(())
}

/// Import a USC title from an XML release URL (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn import_usc(
    ctx: Context<'_>,
    #[description = "Title code, e.g. \"18\""] title_code: String,
    #[description = "Release URL"] url: String,
) -> Result<(), Error> {
    // Fetch and parse can take a while on large titles.
    ctx.defer().await?;

    let payload = ctx.data().releases.fetch(&url).await?;
    let sections = parse_usc_xml(&payload)?;
    let report = ctx
        .data()
        .statutes
        .import(&title_code, "usc", sections)
        .await?;

    ctx.send(poise::CreateReply::default().embed(import_embed(&report)))
        .await?;
    Ok(())
}

/// Import an SRC title from a JSON release URL (admin).
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn import_src(
    ctx: Context<'_>,
    #[description = "Title code, e.g. \"3\""] title_code: String,
    #[description = "Release URL"] url: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let payload = ctx.data().releases.fetch(&url).await?;
    let sections = parse_src_json(&payload)?;
    let report = ctx
        .data()
        .statutes
        .import(&title_code, "src", sections)
        .await?;

    ctx.send(poise::CreateReply::default().embed(import_embed(&report)))
        .await?;
    Ok(())
}

/// Full-text search across the latest revision of every title.
#[poise::command(slash_command, guild_only)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Search terms"] query: String,
) -> Result<(), Error> {
    let hits = ctx.data().statutes.search(&query, 10).await?;
    if hits.is_empty() {
        ctx.say(format!("No sections match `{}`.", query)).await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📚 Results for \"{}\"", clip(&query, 100)))
        .color(0x6C3483);
    for hit in &hits {
        embed = embed.field(
            format!("Title {} § {} — {}", hit.title_code, hit.citation, clip(&hit.heading, 120)),
            clip(&hit.snippet, 500),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Read a section from the latest revision.
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "Title code"] title_code: String,
    #[description = "Section citation, e.g. \"101\""] citation: String,
) -> Result<(), Error> {
    let section = ctx.data().statutes.section(&title_code, &citation).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!(
            "📖 Title {} § {} — {}",
            section.title_code,
            section.citation,
            clip(&section.heading, 150)
        ))
        .description(clip(&section.body, 3500))
        .color(0x6C3483)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Revision {}",
            section.revision
        )));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show how a section has changed across imports.
#[poise::command(slash_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Title code"] title_code: String,
    #[description = "Section citation"] citation: String,
) -> Result<(), Error> {
    let diffs = ctx
        .data()
        .statutes
        .section_history(&title_code, &citation)
        .await?;

    if diffs.is_empty() {
        ctx.say(format!(
            "Title {} § {} has not changed since it was first imported.",
            title_code, citation
        ))
        .await?;
        return Ok(());
    }

    // One message per step keeps each diff inside the embed limit.
    for (i, step) in diffs.iter().enumerate() {
        let embed = serenity::CreateEmbed::new()
            .title(format!(
                "🗂️ Title {} § {} — change {}/{}",
                title_code,
                citation,
                i + 1,
                diffs.len()
            ))
            .description(format!("```diff\n{}\n```", clip(&step.diff, 3800)))
            .color(0x935116);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
    }
    Ok(())
}

/// List every stored title.
#[poise::command(slash_command, guild_only)]
pub async fn titles(ctx: Context<'_>) -> Result<(), Error> {
    let titles = ctx.data().statutes.titles().await?;
    if titles.is_empty() {
        ctx.say("No titles imported yet. `/statute import_usc` or `/statute import_src` to add one.")
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = titles
        .iter()
        .map(|t| {
            let when = t
                .imported_at
                .map(|ts| format!("<t:{}:D>", ts.timestamp()))
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "**Title {}** ({}) — rev {}, {} sections, imported {}",
                t.code, t.source, t.latest_revision, t.section_count, when
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("📚 Stored titles")
        .description(lines.join("\n"))
        .color(0x6C3483);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn import_embed(report: &ImportReport) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📥 Import report — Title {}", report.title_code))
        .color(if report.has_changes() { 0x1E8449 } else { 0x7F8C8D });

    match report.revision {
        Some(rev) => {
            embed = embed
                .description(format!("Stored as revision {}.", rev))
                .field("Added", count_or_dash(report.added.len()), true)
                .field("Removed", count_or_dash(report.removed.len()), true)
                .field("Modified", count_or_dash(report.modified.len()), true)
                .field("Unchanged", report.unchanged.to_string(), true);

            if !report.added.is_empty() {
                embed = embed.field("New sections", citation_list(&report.added), false);
            }
            if !report.removed.is_empty() {
                embed = embed.field("Dropped sections", citation_list(&report.removed), false);
            }
            if !report.modified.is_empty() {
                let cited: Vec<String> =
                    report.modified.iter().map(|d| d.citation.clone()).collect();
                embed = embed.field("Changed sections", citation_list(&cited), false);
            }
        }
        None => {
            embed = embed.description(format!(
                "No changes against the stored revision ({} sections identical). Nothing written.",
                report.unchanged
            ));
        }
    }
    embed
}

fn count_or_dash(n: usize) -> String {
    if n == 0 {
        "—".to_string()
    } else {
        n.to_string()
    }
}

fn citation_list(citations: &[String]) -> String {
    let mut joined = citations
        .iter()
        .map(|c| format!("§ {}", c))
        .collect::<Vec<_>>()
        .join(", ");
    if joined.chars().count() > 900 {
        joined = format!("{}…", joined.chars().take(900).collect::<String>());
    }
    joined
}

/// Truncate on a char boundary with an ellipsis marker.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}…", text.chars().take(max).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::statutes::SectionDiff;

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("short", 10), "short");
        let clipped = clip("ségment héading wïth multibyte chars", 7);
        assert_eq!(clipped, "ségment…");
    }

    #[test]
    fn test_citation_list_format() {
        let list = citation_list(&["101".to_string(), "842a".to_string()]);
        assert_eq!(list, "§ 101, § 842a");
    }

    #[test]
    fn test_import_embed_no_changes_builds() {
        let report = ImportReport {
            title_code: "18".to_string(),
            revision: None,
            unchanged: 12,
            ..Default::default()
        };
        // Just make sure the builder path for the no-op case doesn't panic.
        let _ = import_embed(&report);

        let changed = ImportReport {
            title_code: "18".to_string(),
            revision: Some(2),
            added: vec!["950".to_string()],
            modified: vec![SectionDiff {
                citation: "101".to_string(),
                diff: "@@ -1 +1 @@\n-old\n+new".to_string(),
            }],
            unchanged: 10,
            ..Default::default()
        };
        let _ = import_embed(&changed);
    }
}
