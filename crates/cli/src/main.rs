use crate::error::CliError;
use clap::Parser;
use commands::Commands;
use engine::progress::LogProgress;
use model::jobs::{ExportCampaignPayload, MarkSecondPassPayload};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use store::pg::PgCampaignStore;
use tasks::{
    context::TaskContext,
    mail::{LogMailer, Mailer, WebhookMailer},
    settings::Settings,
    upload::FsUploadStore,
};
use tracing::{Level, info};

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "chunk-tasks", version = "0.1.0", about = "Campaign chunk task runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let ctx = build_context(&settings).await?;

    match cli.command {
        Commands::Export {
            payload,
            payload_json,
        } => {
            let payload: ExportCampaignPayload = load_payload(payload, payload_json).await?;
            let artifacts = tasks::export::run_export(&ctx, &payload).await?;
            for url in [
                artifacts.contacts_url,
                artifacts.opt_outs_url,
                artifacts.messages_url,
                artifacts.filtered_contacts_url,
            ]
            .into_iter()
            .flatten()
            {
                println!("{url}");
            }
        }
        Commands::SecondPass {
            payload,
            payload_json,
        } => {
            let payload: MarkSecondPassPayload = load_payload(payload, payload_json).await?;
            let updated = tasks::second_pass::run_mark_second_pass(&ctx, &payload).await?;
            info!(updated, "Second pass finished");
            println!("{updated}");
        }
    }

    Ok(())
}

async fn build_context(settings: &Settings) -> Result<TaskContext, CliError> {
    let store =
        PgCampaignStore::connect(&settings.database_url, &settings.database_reader_url).await?;
    let mailer: Arc<dyn Mailer> = match &settings.email_webhook_url {
        Some(endpoint) => Arc::new(WebhookMailer::new(endpoint.clone())),
        None => Arc::new(LogMailer),
    };
    Ok(TaskContext {
        store: Arc::new(store),
        uploads: Arc::new(FsUploadStore::new(
            settings.export_dir.clone(),
            settings.export_base_url.clone(),
        )),
        mailer,
        progress: Arc::new(LogProgress),
        export_chunk_size: settings.export_chunk_size,
        second_pass_chunk_size: settings.second_pass_chunk_size,
        base_url: settings.base_url.clone(),
    })
}

async fn load_payload<T: DeserializeOwned>(
    path: Option<String>,
    inline: Option<String>,
) -> Result<T, CliError> {
    let raw = match (path, inline) {
        (Some(path), None) => tokio::fs::read_to_string(&path).await?,
        (None, Some(inline)) => inline,
        _ => return Err(CliError::PayloadSource),
    };
    Ok(serde_json::from_str(&raw)?)
}
