// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and spawn background sweeps

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::citizenship::CitizenshipService;
use crate::core::corporations::CorporationService;
use crate::core::elections::ElectionService;
use crate::core::legislature::LegislatureService;
use crate::core::registry::RegistryService;
use crate::core::statutes::StatuteService;
use crate::discord::Data;
use crate::infra::registry::JsonRegistryStore;
use crate::infra::statutes::{ReleaseClient, SqliteStatuteStore};
use poise::serenity_prelude as serenity;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime state in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory");
    let registry_path = format!("{}/registry.json", data_dir);
    let statutes_db_path = format!("{}/statutes.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    use std::sync::Arc;

    // One JSON-backed registry document shared by every government service.
    let registry_store = JsonRegistryStore::new(&registry_path);
    let registry = Arc::new(
        RegistryService::new(registry_store)
            .await
            .expect("Failed to load the federal registry"),
    );

    let citizenship_service = Arc::new(CitizenshipService::new(Arc::clone(&registry)));
    let legislature_service = Arc::new(LegislatureService::new(Arc::clone(&registry)));
    let election_service = Arc::new(ElectionService::new(Arc::clone(&registry)));
    let corporation_service = Arc::new(CorporationService::new(Arc::clone(&registry)));

    // SQLite-backed statute library (schema migrates on startup).
    let statute_store = SqliteStatuteStore::new(&statutes_db_path)
        .await
        .expect("Failed to initialize statute database");
    let statute_service = Arc::new(StatuteService::new(statute_store));

    let release_client = Arc::new(ReleaseClient::new().expect("Failed to build release client"));

    // Create the data structure that will be shared across all commands
    let data = Data {
        citizenship: Arc::clone(&citizenship_service),
        legislature: Arc::clone(&legislature_service),
        elections: Arc::clone(&election_service),
        corporations: Arc::clone(&corporation_service),
        statutes: Arc::clone(&statute_service),
        releases: Arc::clone(&release_client),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::citizenship::citizen(),
                discord::commands::legislature::bill(),
                discord::commands::legislature::committee(),
                discord::commands::elections::election(),
                discord::commands::corporations::corp(),
                discord::commands::statutes::statute(),
            ],
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                println!("🤖 Bot is starting up...");

                // Register slash commands globally (can take up to an hour to propagate)
                // For faster development, use register_in_guild instead:
                // poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await?;
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                println!("✅ Commands registered!");
                println!("🚀 Bot is ready!");

                // Background poll-closing sweep. Contests past their closing
                // time get tallied even if nobody runs `/election close`.
                let elections = Arc::clone(&data.elections);
                tokio::spawn(async move {
                    use std::time::Duration as StdDuration;
                    use tokio::time::sleep;

                    loop {
                        match elections.close_due(chrono::Utc::now()).await {
                            Ok(results) => {
                                for result in results {
                                    tracing::info!(
                                        contest_id = result.contest_id,
                                        office = %result.office,
                                        winner = ?result.winner,
                                        "Contest closed by sweep"
                                    );
                                }
                            }
                            Err(err) => tracing::warn!("Election sweep failed: {}", err),
                        }

                        sleep(StdDuration::from_secs(60)).await;
                    }
                });

                // Hourly corporate renewal sweep. Registrations past their
                // renewal date lapse until the owner renews.
                let corporations = Arc::clone(&data.corporations);
                tokio::spawn(async move {
                    use std::time::Duration as StdDuration;
                    use tokio::time::sleep;

                    loop {
                        match corporations.lapse_sweep(chrono::Utc::now()).await {
                            Ok(lapsed) => {
                                for corp in lapsed {
                                    tracing::info!(
                                        reg_no = %corp.reg_no,
                                        name = %corp.name,
                                        "Corporation lapsed"
                                    );
                                }
                            }
                            Err(err) => tracing::warn!("Corporate sweep failed: {}", err),
                        }

                        sleep(StdDuration::from_secs(60 * 60)).await;
                    }
                });

                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
