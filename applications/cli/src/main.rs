/// Shelf - audiobook progress sync from the command line
use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_cli::{credentials, CliError, HttpDownloadEngine, ShelfConfig};
use shelf_core::types::AudiobookRecord;
use shelf_core::ProgressStore;
use shelf_downloads::{
    format_bytes, format_eta, DownloadCoordinator, DownloadProgressTracker, PlaybackSource,
};
use shelf_server_client::ShelfServerClient;
use shelf_storage::LocalProgressStore;
use shelf_sync::{
    BatchResult, ConnectivityMonitor, PeriodicSync, RemoteStatus, SyncOrchestrator, SyncOutcome,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the daemon probes the server for connectivity
const PROBE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Audiobook progress sync for Audiobookshelf servers", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the bearer token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "SHELF_PASSWORD")]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// List server libraries
    Libraries,
    /// List the items of a library
    Items {
        library_id: String,
    },
    /// List locally cached audiobooks and their sync state
    Cached,
    /// Open an item: reconcile local and server progress
    Open {
        item_id: String,
    },
    /// Sync one cached item
    Sync {
        item_id: String,
        /// Push the local position even if the server has a newer one
        #[arg(long)]
        force: bool,
    },
    /// Retry every pending upload
    SyncPending,
    /// Show where each track of an item would play from
    Tracks {
        item_id: String,
    },
    /// Download every track of an item
    Download {
        item_id: String,
    },
    /// Delete the downloaded tracks of an item
    RemoveDownload {
        item_id: String,
    },
    /// Run periodic sync and connectivity monitoring until interrupted
    Daemon,
}

/// Everything a command may need
struct App {
    config: ShelfConfig,
    client: ShelfServerClient,
    store: LocalProgressStore,
    orchestrator: Arc<SyncOrchestrator>,
}

impl App {
    async fn init(config: ShelfConfig) -> anyhow::Result<Self> {
        let token = credentials::load_token(&config.server.token_file).await?;
        let client = ShelfServerClient::new(config.server_config(token))?;

        let store = LocalProgressStore::open(&config.storage.database_url)
            .await
            .with_context(|| format!("opening {}", config.storage.database_url))?;

        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(client.clone()),
            config.sync_config(),
        ));

        Ok(Self {
            config,
            client,
            store,
            orchestrator,
        })
    }

    async fn require_login(&self) -> anyhow::Result<()> {
        if self.client.is_authenticated().await {
            Ok(())
        } else {
            Err(CliError::NotLoggedIn.into())
        }
    }

    fn downloads(&self) -> (Arc<HttpDownloadEngine>, DownloadCoordinator) {
        let tracker = Arc::new(DownloadProgressTracker::default());
        let engine = Arc::new(HttpDownloadEngine::new(
            reqwest::Client::new(),
            self.config.storage.downloads_dir.clone(),
            Arc::clone(&tracker),
        ));
        let coordinator = DownloadCoordinator::new(engine.clone(), tracker);
        (engine, coordinator)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ShelfConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let app = App::init(config).await?;

    match cli.command {
        Commands::Login { username, password } => login(&app, &username, &password).await?,
        Commands::Logout => {
            app.client.logout().await;
            credentials::clear_token(&app.config.server.token_file).await?;
            println!("Logged out");
        }
        Commands::Libraries => list_libraries(&app).await?,
        Commands::Items { library_id } => list_items(&app, &library_id).await?,
        Commands::Cached => list_cached(&app).await?,
        Commands::Open { item_id } => open_item(&app, &item_id).await?,
        Commands::Sync { item_id, force } => sync_item(&app, &item_id, force).await?,
        Commands::SyncPending => sync_pending(&app).await?,
        Commands::Tracks { item_id } => show_tracks(&app, &item_id).await?,
        Commands::Download { item_id } => download(&app, &item_id).await?,
        Commands::RemoveDownload { item_id } => remove_download(&app, &item_id).await?,
        Commands::Daemon => daemon(&app).await?,
    }

    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn format_position(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn print_progress(record: &AudiobookRecord) {
    let progress = &record.progress;
    println!(
        "{} - {} by {}",
        record.id,
        record.title(),
        record.author()
    );
    println!(
        "  position {} / {} ({:.1}%), updated {}{}",
        format_position(progress.current_time),
        format_position(record.media.duration),
        progress.progress * 100.0,
        format_timestamp(progress.last_update),
        if progress.pending_upload {
            ", upload pending"
        } else {
            ""
        }
    );
}

async fn login(app: &App, username: &str, password: &str) -> anyhow::Result<()> {
    let response = app.client.login(username, password).await?;
    credentials::save_token(&app.config.server.token_file, &response.user.token).await?;

    tracing::info!(user = %response.user.username, "Logged in");
    println!("Logged in as {}", response.user.username);
    Ok(())
}

async fn list_libraries(app: &App) -> anyhow::Result<()> {
    app.require_login().await?;

    println!("Libraries:");
    for library in app.client.libraries().await? {
        println!("  {} - {} ({})", library.id, library.name, library.media_type);
    }
    Ok(())
}

async fn list_items(app: &App, library_id: &str) -> anyhow::Result<()> {
    app.require_login().await?;

    for item in app.client.library_items(library_id).await? {
        print_progress(&item);
    }
    Ok(())
}

async fn list_cached(app: &App) -> anyhow::Result<()> {
    let cached = app.store.list_all().await?;
    if cached.is_empty() {
        println!("Nothing cached yet");
    }
    for record in &cached {
        print_progress(record);
    }
    Ok(())
}

async fn open_item(app: &App, item_id: &str) -> anyhow::Result<()> {
    let opened = app.orchestrator.open_item(item_id).await?;
    print_progress(&opened.record);

    if let RemoteStatus::Unavailable(reason) = opened.remote {
        println!("  could not sync with server: {}", reason);
    }
    Ok(())
}

async fn sync_item(app: &App, item_id: &str, force: bool) -> anyhow::Result<()> {
    app.require_login().await?;

    let outcome = if force {
        app.orchestrator.force_sync(item_id).await?
    } else {
        app.orchestrator.sync_item(item_id).await?
    };

    match outcome {
        SyncOutcome::AdoptedRemote => println!("Server progress adopted"),
        SyncOutcome::Uploaded => println!("Local progress uploaded"),
        SyncOutcome::Superseded => println!("Newer local progress still pending"),
        SyncOutcome::UploadFailed(reason) => println!("Upload failed, will retry: {}", reason),
        SyncOutcome::RemoteUnavailable(reason) => println!("Server unavailable: {}", reason),
    }
    Ok(())
}

async fn sync_pending(app: &App) -> anyhow::Result<()> {
    app.require_login().await?;

    match app.orchestrator.retry_pending().await? {
        BatchResult::Success => println!("All progress synced"),
        BatchResult::Retry => {
            let left = app.store.list_pending_upload().await?.len();
            println!("{} item(s) still pending", left);
        }
    }
    Ok(())
}

async fn show_tracks(app: &App, item_id: &str) -> anyhow::Result<()> {
    let opened = app.orchestrator.open_item(item_id).await?;
    let (engine, coordinator) = app.downloads();

    for (slot, track) in opened.record.media.tracks.iter().enumerate() {
        let stream_url = app.client.stream_url(track).await.ok();
        let source = match coordinator.playback_source(track, stream_url) {
            Ok(PlaybackSource::Local(id)) => {
                format!("local {}", engine.path_for(&id).display())
            }
            Ok(PlaybackSource::Stream(_)) => "stream".to_string(),
            Err(e) => format!("unplayable ({})", e),
        };
        println!(
            "  {:>3} {} [{}] {}",
            slot + 1,
            track.title,
            format_position(track.duration),
            source
        );
    }
    Ok(())
}

async fn download(app: &App, item_id: &str) -> anyhow::Result<()> {
    app.require_login().await?;

    let record = app.orchestrator.open_item(item_id).await?.record;
    let (engine, coordinator) = app.downloads();

    let mut urls = HashMap::new();
    for track in &record.media.tracks {
        urls.insert(track.id().to_string(), app.client.stream_url(track).await?);
    }
    let queued = coordinator.download_audiobook(&record, |track| {
        urls.get(track.id()).cloned().unwrap_or_default()
    })?;

    if queued > 0 {
        let tracker = coordinator.tracker();
        let mut updates = tracker.subscribe();
        let mut ticker = tokio::time::interval(Duration::from_millis(500));

        while engine.active_count() > 0 {
            tokio::select! {
                _ = updates.changed() => {}
                _ = ticker.tick() => {}
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    println!("\nInterrupted");
                    break;
                }
            }

            let progress = tracker.audiobook_progress(&record);
            print!(
                "\r{:5.1}%  {} / {}  {}/s  ETA {}   ",
                progress.overall_progress,
                format_bytes(progress.total_bytes_downloaded),
                format_bytes(progress.total_bytes),
                format_bytes(progress.average_speed),
                format_eta(progress.eta_secs)
            );
            std::io::Write::flush(&mut std::io::stdout())?;
        }
        println!();
    }

    if coordinator.is_audiobook_downloaded(&record) {
        println!("{} downloaded", record.title());
    } else {
        println!("{} is not fully downloaded", record.title());
    }
    Ok(())
}

async fn remove_download(app: &App, item_id: &str) -> anyhow::Result<()> {
    let record = app
        .store
        .get_by_id(item_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} is not cached", item_id))?;

    let (_engine, coordinator) = app.downloads();
    coordinator.remove_audiobook(&record);
    println!("Removed downloads of {}", record.title());
    Ok(())
}

async fn daemon(app: &App) -> anyhow::Result<()> {
    let (online_tx, online_rx) = watch::channel(app.client.libraries().await.is_ok());

    let monitor = Arc::new(ConnectivityMonitor::new(*online_rx.borrow()));
    let monitor_task = tokio::spawn(
        Arc::clone(&monitor).run(online_rx.clone(), Arc::clone(&app.orchestrator)),
    );

    let client = app.client.clone();
    let probe_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PROBE_INTERVAL);
        loop {
            ticker.tick().await;
            let reachable = client.libraries().await.is_ok();
            online_tx.send_if_modified(|online| std::mem::replace(online, reachable) != reachable);
        }
    });

    let periodic = PeriodicSync::new(Arc::clone(&app.orchestrator)).with_network(online_rx);
    tracing::info!("Sync daemon running, press Ctrl+C to stop");

    tokio::select! {
        () = periodic.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down");
        }
    }

    probe_task.abort();
    monitor_task.abort();
    Ok(())
}
