//! Subcommand handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use mveed_client::{
    ClientError, MediaRequest, MediaVeed, Operation, ReelAsset, TracingTracker, VideoFile,
};
use mveed_models::format::{format_duration, format_ms, format_seconds};
use mveed_models::{AutoPostRequest, LoginRequest, MediaKind, SignupRequest};
use tracing::info;

use crate::cli::{AutopostCommand, Command, HighlightArgs};

/// Turn a client error into the text shown to the user.
fn user_error(err: ClientError, operation: Operation) -> anyhow::Error {
    anyhow::anyhow!(err.user_message(operation))
}

pub async fn run(app: &MediaVeed, command: Command) -> Result<()> {
    match command {
        Command::Extract { url } => extract(app, &url).await,
        Command::Download { url, audio } => download(app, &url, audio).await,
        Command::Highlight(args) => highlight(app, args).await,
        Command::Sessions => sessions(app).await,
        Command::Signup {
            name,
            email,
            password,
            remember,
        } => {
            let request = SignupRequest {
                name,
                email,
                password,
            };
            app.account
                .signup(&request, remember)
                .await
                .map_err(|e| user_error(e, Operation::Account))?;
            println!("Account created.");
            Ok(())
        }
        Command::Login {
            email,
            password,
            remember,
        } => {
            app.account
                .login(&LoginRequest { email, password }, remember)
                .await
                .map_err(|e| user_error(e, Operation::Account))?;
            println!("Signed in.");
            Ok(())
        }
        Command::Logout => {
            app.account.logout().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Profile => {
            let profile = app
                .account
                .profile()
                .await
                .map_err(|e| user_error(e, Operation::Account))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Command::Autopost(cmd) => autopost(app, cmd).await,
        Command::WatchAuth { seconds } => watch_auth(app, seconds).await,
    }
}

async fn extract(app: &MediaVeed, url: &str) -> Result<()> {
    let meta = app
        .extractor
        .extract(url)
        .await
        .map_err(|e| user_error(e, Operation::Extract))?;

    println!("{} ({})", meta.title, meta.platform);
    println!("  author:   {}", meta.author);
    println!("  duration: {}", format_seconds(meta.duration));
    if let Some(views) = meta.views {
        println!("  views:    {}", views);
    }
    if let Some(thumb) = meta.thumbnail_url(&app.transport.config().extractor_base_url) {
        println!("  thumb:    {}", thumb);
    }
    Ok(())
}

async fn download(app: &MediaVeed, url: &str, audio: bool) -> Result<()> {
    let meta = app
        .extractor
        .extract(url)
        .await
        .map_err(|e| user_error(e, Operation::Extract))?;

    let kind = if audio { MediaKind::Audio } else { MediaKind::Video };
    let request = MediaRequest::from_metadata(&meta, Some(url.to_string()), kind);

    let mut progress = app.extractor.subscribe_progress();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            eprint!("\r  {:>3}%", value);
        }
    });

    let result = app.extractor.download_media(&request).await;
    reporter.abort();
    eprintln!();

    let done = result.map_err(|e| user_error(e, Operation::DownloadMedia))?;
    println!("Saved {} ({} bytes)", done.path.display(), done.bytes);
    println!("Run `mveed highlight --last` to cut a reel from it.");
    Ok(())
}

async fn highlight(app: &MediaVeed, args: HighlightArgs) -> Result<()> {
    let engine = &app.highlight;
    engine.set_style(args.style);

    let analyzed = if let Some(path) = &args.file {
        let file = VideoFile::from_path(path).map_err(|e| user_error(e, Operation::Analyze))?;
        engine.submit(&file).await
    } else if let Some(url) = &args.from_url {
        engine.analyze_remote(url, args.title.as_deref()).await
    } else {
        match engine.analyze_last_download().await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => bail!("No completed download to analyze. Run `mveed download` first."),
            Err(e) => Err(e),
        }
    };
    let session = analyzed.map_err(|_| {
        anyhow::anyhow!(engine
            .error()
            .unwrap_or_else(|| engine.status_text()))
    })?;

    println!("{}", engine.status_text());
    println!(
        "Session {}: {} segments, {} total, avg confidence {:.0}%",
        session.session_id,
        session.segments.len(),
        format_duration(session.total_duration_secs()),
        session.average_confidence() * 100.0
    );
    for seg in engine.normalized_segments() {
        println!(
            "  {:<12} {:>7} - {:<7} {:>4.0}%  {}",
            seg.segment_id,
            format_seconds(Some(seg.start)),
            format_seconds(Some(seg.end)),
            seg.confidence * 100.0,
            seg.clip_url
        );
    }

    for id in &args.exclude {
        if engine.is_selected(id) {
            engine.toggle(id);
        }
    }
    println!("Selected {}/{} segments", engine.selected_count(), engine.total_segments());

    if args.no_compile {
        return Ok(());
    }
    if !engine.can_compile() {
        bail!("Select at least one segment to build a reel.");
    }

    println!("Compiling {} reel…", engine.style().label());
    let reel = engine
        .compile()
        .await
        .map_err(|e| user_error(e, Operation::CompileReel))?
        .context("Reel compile was skipped")?;
    println!("Reel ready: {}", reel.download_url);

    let mut assets = vec![ReelAsset::Video];
    if args.all_assets {
        assets.extend([ReelAsset::Captions, ReelAsset::Timeline]);
    }
    for asset in assets {
        match engine.download_reel_asset(asset).await {
            Ok(Some(saved)) => println!("Saved {}", saved.path.display()),
            Ok(None) => {}
            Err(e) => bail!(e.user_message(Operation::DownloadAsset)),
        }
    }
    Ok(())
}

async fn sessions(app: &MediaVeed) -> Result<()> {
    let sessions = app
        .highlight
        .recent_sessions()
        .await
        .map_err(|e| user_error(e, Operation::ListSessions))?;

    if sessions.is_empty() {
        println!("No highlight sessions yet.");
        return Ok(());
    }
    for s in sessions {
        let created = s
            .created_at_utc()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "—".to_string());
        let flags: Vec<_> = s.flags().iter().map(|f| f.label()).collect();
        println!(
            "{}  {:<16} {:<24} {:<10} segs={} video={} reel={} took={} {}",
            created,
            s.session_id,
            s.user_label(),
            s.status_label(),
            s.segment_count.map_or("—".to_string(), |n| n.to_string()),
            format_seconds(s.video_duration),
            format_seconds(s.reel_duration),
            format_ms(s.processing_time_ms),
            flags.join(",")
        );
    }
    Ok(())
}

async fn autopost(app: &MediaVeed, cmd: AutopostCommand) -> Result<()> {
    let client = &app.autopost;
    let to_user = |e: ClientError| user_error(e, Operation::AutoPost);
    match cmd {
        AutopostCommand::Request {
            session,
            platforms,
            reel_url,
            caption,
        } => {
            let job = client
                .request(&AutoPostRequest {
                    session_id: session,
                    platforms,
                    reel_url,
                    caption,
                })
                .await
                .map_err(to_user)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        AutopostCommand::Jobs => {
            for job in client.jobs().await.map_err(to_user)? {
                println!(
                    "{:<24} {:<12} {}",
                    job.id.as_deref().unwrap_or("—"),
                    job.status.as_deref().unwrap_or("—"),
                    job.platform.as_deref().unwrap_or("—")
                );
            }
        }
        AutopostCommand::Status => {
            let status = client.status().await.map_err(to_user)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

async fn watch_auth(app: &MediaVeed, seconds: Option<u64>) -> Result<()> {
    let watcher = app.auth_watcher(Arc::new(TracingTracker));
    watcher.start();
    info!("Watching auth state");

    match seconds {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c().await?,
    }
    watcher.stop();
    Ok(())
}
