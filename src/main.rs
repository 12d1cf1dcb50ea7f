use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use echosight::config::Cli;
use echosight::kernel::event::CommandReply;
use echosight::kernel::telemetry::EventEntry;
use echosight::outputs::{AudioSink, CommandSink, NullSink};
use echosight::services::{BackendClient, WsConnector};
use echosight::{DashboardHandle, DashboardView, Driver, Reactor};

// Operator console input
enum ConsoleCommand {
    Analyze,
    Speak,
    Haptic(i64),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_lowercase();
    match verb.as_str() {
        "analyze" | "a" => Ok(ConsoleCommand::Analyze),
        "speak" | "s" => Ok(ConsoleCommand::Speak),
        "haptic" | "h" => {
            let value = words.next().ok_or("usage: haptic <intensity>")?;
            value
                .parse::<i64>()
                .map(ConsoleCommand::Haptic)
                .map_err(|_| format!("not a number: {value}"))
        }
        "status" => Ok(ConsoleCommand::Status),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("echosight=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    // 2. Configuration
    let cli = Cli::parse();
    let config = cli.resolve().context("failed to load configuration")?;
    let stream_url = config.stream_url();
    tracing::info!(stream = %stream_url, http = %config.http_url(), "backend endpoints");
    if config.uses_loopback() {
        tracing::warn!("Backend URL points to localhost; set PC_LAN_IP or BACKEND_HOST when the backend runs elsewhere");
    }

    // 3. Collaborators
    let connector = Arc::new(WsConnector::new(stream_url));
    let backend = Arc::new(
        BackendClient::new(config.http_url(), config.backend_paths(), config.request_timeout())
            .context("failed to build backend client")?,
    );
    let sink: Arc<dyn AudioSink> = match CommandSink::from_command_line(&config.audio.player) {
        Some(sink) => Arc::new(sink),
        None => Arc::new(NullSink),
    };

    // 4. Run
    let (driver, handle) = Driver::new(Reactor::new(config.reactor_config()), connector, backend, sink);
    tracing::info!(session_id = %driver.session_id(), "dashboard ready");
    let driver_task = tokio::spawn(driver.run());
    let printer = tokio::spawn(print_history(handle.subscribe()));
    tokio::spawn(read_console(handle.clone()));

    println!("Commands: analyze | speak | haptic <0-255> | status | quit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            tracing::info!("shutdown requested");
            handle.shutdown();
        }
        _ = handle.stopped() => {}
    }

    driver_task.await.context("dashboard driver failed")?;
    printer.abort();
    Ok(())
}

async fn read_console(handle: DashboardHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let reply = match command {
            ConsoleCommand::Analyze => handle.analyze().await,
            ConsoleCommand::Speak => handle.speak().await,
            ConsoleCommand::Haptic(value) => handle.haptic(value).await,
            ConsoleCommand::Status => {
                print_status(&handle.view());
                continue;
            }
            ConsoleCommand::Quit => break,
        };

        match reply {
            Ok(CommandReply::Accepted(kind)) => tracing::debug!(action = %kind, "accepted"),
            Ok(CommandReply::Busy(holder)) => println!("busy: {holder} in flight"),
            Ok(CommandReply::Skipped) => println!("nothing to speak yet"),
            Err(error) => {
                println!("{error}");
                break;
            }
        }
    }

    handle.shutdown();
}

async fn print_history(mut view: watch::Receiver<DashboardView>) {
    let mut last_seen: Option<Uuid> = None;

    while view.changed().await.is_ok() {
        let fresh: Vec<EventEntry> = view
            .borrow_and_update()
            .history
            .iter()
            .take_while(|entry| Some(entry.id) != last_seen)
            .cloned()
            .collect();

        if let Some(newest) = fresh.first() {
            last_seen = Some(newest.id);
        }
        for entry in fresh.iter().rev() {
            println!("{entry}");
        }
    }
}

fn print_status(view: &DashboardView) {
    let snapshot = &view.snapshot;
    println!(
        "connected={} busy={} prompt=\"{}\" haptic={}",
        view.connected,
        view.busy.as_deref().unwrap_or("idle"),
        snapshot.voice_prompt,
        snapshot.haptic_intensity,
    );
    for detection in &snapshot.detections {
        let b = detection.bbox;
        println!("  {} [{}, {}, {}, {}]", detection.label, b.ymin, b.xmin, b.ymax, b.xmax);
    }
}
