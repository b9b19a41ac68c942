use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    config::normalize_service_url,
    export::{sticker_file_name, StickerExporter},
    load_settings, HttpGenerationClient, StickerStudio, StudioEvent,
};
use shared::domain::GenerationToken;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{info, warn};

const LAYOUT_FILE_NAME: &str = "sticker-layout.json";

#[derive(Parser, Debug)]
#[command(about = "Print stickers from the sticker service onto a canvas")]
struct Args {
    /// Label to print a sticker for. Repeat to print several in order.
    #[arg(long = "city", required_unless_present = "health")]
    cities: Vec<String>,
    /// Overrides the service url from stickers.toml / environment.
    #[arg(long)]
    service_url: Option<String>,
    /// Write every sticker plus a layout manifest here.
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Never send the display-complete signal; let the fallback timer commit.
    #[arg(long)]
    await_fallback: bool,
    /// Only check that the service is up.
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = &args.service_url {
        settings.service_url = normalize_service_url(url)?;
    }

    let client = Arc::new(HttpGenerationClient::from_settings(&settings)?);
    if args.health {
        let health = client.health().await?;
        println!("{}: {}", health.status, health.message);
        if !health.is_healthy() {
            bail!("sticker service at {} is not healthy", client.service_url());
        }
        if args.cities.is_empty() {
            return Ok(());
        }
    }

    let http = client.http().clone();
    let studio = StickerStudio::new(client, settings);
    let mut events = studio.subscribe_events();

    for city in &args.cities {
        let Some(token) = studio.request_generation(city).await else {
            warn!(label = %city, "skipping empty label");
            continue;
        };
        print_one(&studio, &mut events, token, args.await_fallback).await?;
    }

    let snapshot = studio.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot.collection.to_vec())?);

    if let Some(dir) = &args.export_dir {
        let exporter = StickerExporter::new(http);
        for (index, sticker) in snapshot.collection.iter().enumerate() {
            if let Err(error) = exporter.export_sticker(index, sticker, dir).await {
                warn!(%error, file = %sticker_file_name(index), "failed to export sticker");
            }
        }

        let layout = serde_json::to_vec_pretty(&snapshot.collection.to_vec())?;
        let layout_path = dir.join(LAYOUT_FILE_NAME);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        tokio::fs::write(&layout_path, layout)
            .await
            .with_context(|| format!("failed to write {}", layout_path.display()))?;
        info!(path = %layout_path.display(), "wrote canvas layout");
    }

    Ok(())
}

/// Drives one generation to the end: signals display completion (unless the
/// fallback should do it) and returns once it is committed or failed.
async fn print_one(
    studio: &Arc<StickerStudio>,
    events: &mut Receiver<StudioEvent>,
    token: GenerationToken,
    await_fallback: bool,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => bail!("studio event stream closed"),
        };

        match event {
            StudioEvent::StickerDisplayed { token: shown, image } if shown == token => {
                info!(%token, image = %image.summary(), "sticker printed");
                if !await_fallback {
                    studio.notify_display_complete().await;
                }
            }
            StudioEvent::StickerCommitted {
                token: committed,
                sticker,
                trigger,
            } if committed == token => {
                info!(%token, sticker_id = %sticker.id, ?trigger, "sticker added to canvas");
                return Ok(());
            }
            StudioEvent::GenerationFailed {
                token: failed,
                notice,
                ..
            } if failed == token => {
                eprintln!("{notice}");
                return Ok(());
            }
            _ => {}
        }
    }
}
