//! `crush`: generate a kiss video from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crush_app::content;
use crush_app::download::{download_video, file_name_for};
use crush_app::runtime::build_session;
use crush_app::view::{share_text, UploadView};
use crush_app::AppConfig;
use crush_core::{SlotRole, UploadMode};
use crush_events::JobEvent;
use crush_pipeline::UploadSession;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crush", version, about = "Turn your photos into a kiss video")]
struct Cli {
    /// Save the finished video to this file.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print the upload view as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stitch two solo photos side by side and animate them.
    Solo { first: PathBuf, second: PathBuf },

    /// Animate a photo of the two of you.
    Couple { photo: PathBuf },

    /// Continue the job left pending by an earlier run.
    Resume,

    /// Drop the job left pending by an earlier run.
    Cancel,

    /// Print the landing page content as JSON.
    Page,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crush=info,crush_pipeline=info,crush_fal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::Page = cli.command {
        println!("{}", serde_json::to_string_pretty(&content::page())?);
        return Ok(());
    }

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let mut session = build_session(
        &config,
        Arc::new(|| tracing::info!("Completion notification clicked")),
    );

    match &cli.command {
        Command::Solo { first, second } => {
            select(&mut session, SlotRole::FirstPerson, first).await?;
            select(&mut session, SlotRole::SecondPerson, second).await?;
            show(&session, cli.json)?;
            start_and_follow(&mut session, &cli).await
        }
        Command::Couple { photo } => {
            session.set_mode(UploadMode::Couple);
            select(&mut session, SlotRole::Couple, photo).await?;
            show(&session, cli.json)?;
            start_and_follow(&mut session, &cli).await
        }
        Command::Resume => {
            let events = session.subscribe();
            if session.restore().is_none() {
                println!("No saved job to resume");
                return Ok(());
            }
            follow(&mut session, events, &cli).await
        }
        Command::Cancel => {
            match session.discard_saved() {
                Some(job) if job.progress == crush_core::job::PROGRESS_CANCELLED => {
                    println!("Cancelled job {}", job.id)
                }
                Some(job) => println!("Removed finished job {}", job.id),
                None => println!("No saved job to cancel"),
            }
            Ok(())
        }
        Command::Page => Ok(()),
    }
}

async fn select(session: &mut UploadSession, role: SlotRole, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    session
        .select_image(role, bytes, file_name)
        .await
        .with_context(|| format!("Cannot use {}", path.display()))?;
    Ok(())
}

/// Print the upload view for the current session state.
fn show(session: &UploadSession, json: bool) -> anyhow::Result<()> {
    let view = UploadView::from_state(&session.state());
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.render());
    }
    Ok(())
}

async fn start_and_follow(session: &mut UploadSession, cli: &Cli) -> anyhow::Result<()> {
    let events = session.subscribe();
    let job_id = session.generate()?;
    println!("Started job {job_id}");
    follow(session, events, cli).await
}

/// Print progress until the job finishes or the user interrupts.
async fn follow(
    session: &mut UploadSession,
    mut events: broadcast::Receiver<JobEvent>,
    cli: &Cli,
) -> anyhow::Result<()> {
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.is_terminal() {
                break;
            }
            println!("  {}", event.progress);
        }
    });

    let finished = tokio::select! {
        job = session.wait() => job,
        _ = tokio::signal::ctrl_c() => None,
    };
    printer.abort();

    let Some(job) = finished else {
        session.shutdown().await;
        println!("Stopped watching. Run `crush resume` to pick the job up again.");
        return Ok(());
    };
    // Let the job task finish its notification before exiting.
    session.shutdown().await;
    show(session, cli.json)?;

    let view = UploadView::from_state(&session.state());
    match (view.video_url, view.error) {
        (Some(url), _) => {
            println!("{}", share_text(&url));
            if let Some(dest) = &cli.output {
                let dest = if dest.is_dir() {
                    dest.join(file_name_for(&url))
                } else {
                    dest.clone()
                };
                let bytes = download_video(&reqwest::Client::new(), &url, &dest).await?;
                println!("Saved {} ({bytes} bytes)", dest.display());
            }
            Ok(())
        }
        (None, Some(error)) => anyhow::bail!("{error}"),
        (None, None) => {
            println!("Job {} is still pending", job.id);
            Ok(())
        }
    }
}
