//! Live-feed watcher entry point.
//!
//! Connects one session to the broker bridge, mirrors the match/comment/
//! notification topics into per-topic logs, and publishes stdin lines as
//! outbound messages. REST failures show up as transient notices; transport
//! failures feed the session's retry loop.

mod notice;

use anyhow::Result;
use livefeed::{
    normalize, ConnectionState, FeedDispatcher, FeedEvent, Session, SessionConfig, SessionEvent,
    StompConnector, DESTINATION_SEND_MESSAGE, TOPIC_MATCH_COMMENTS, TOPIC_MATCH_EVENTS,
    TOPIC_NOTIFICATIONS,
};
use match_api::{CachedMatchApi, MatchApiClient};
use metrics_exporter_prometheus::PrometheusBuilder;
use notice::NoticeBoard;
use std::env;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting live-feed watcher");

    // Read configuration from environment
    let feed_url = env::var("FEED_URL").unwrap_or_else(|_| "ws://localhost:8081/ws".to_string());
    let api_base_url =
        env::var("API_BASE_URL").unwrap_or_else(|_| match_api::DEFAULT_API_BASE_URL.to_string());
    let metrics_port: u16 = env::var("METRICS_PORT")
        .unwrap_or_else(|_| "9094".to_string())
        .parse()
        .expect("METRICS_PORT must be a number");
    let reconnect_delay: u64 = env::var("RECONNECT_DELAY_SECS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .expect("RECONNECT_DELAY_SECS must be a number");
    let max_reconnect_delay: u64 = env::var("RECONNECT_MAX_DELAY_SECS")
        .unwrap_or_else(|_| reconnect_delay.to_string())
        .parse()
        .expect("RECONNECT_MAX_DELAY_SECS must be a number");
    let max_reconnect_attempts: Option<u32> = env::var("RECONNECT_MAX_ATTEMPTS")
        .ok()
        .map(|v| v.parse().expect("RECONNECT_MAX_ATTEMPTS must be a number"));

    info!("Configuration:");
    info!("  FEED_URL: {}", feed_url);
    info!("  API_BASE_URL: {}", api_base_url);
    info!("  METRICS_PORT: {}", metrics_port);
    info!("  RECONNECT_DELAY_SECS: {}", reconnect_delay);

    // Start Prometheus metrics server
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics_port))
        .install()
        .expect("Failed to start Prometheus exporter");
    info!("Prometheus metrics server started on port {}", metrics_port);

    let notices = NoticeBoard::default();

    // Prime the match listing over REST. Errors degrade to a notice.
    let api = CachedMatchApi::new(MatchApiClient::with_base_url(api_base_url));
    match api.get_all_match_details().await {
        Ok(matches) => {
            notices.info(format!("Loaded {} matches", matches.len()));
            info!("loaded {} matches", matches.len());
        }
        Err(e) => {
            notices.error(format!("Error: {e}"));
            warn!("failed to load matches: {e}");
        }
    }

    // One session, one dispatcher; the dispatcher handler records each frame
    // and the wrapper logs its normalized form.
    let dispatcher = FeedDispatcher::new();
    let config = SessionConfig {
        reconnect_delay: Duration::from_secs(reconnect_delay),
        max_reconnect_delay: Duration::from_secs(max_reconnect_delay),
        max_reconnect_attempts,
    };
    let (session, mut events) = Session::spawn(StompConnector::new(&feed_url), config);

    for topic in [TOPIC_NOTIFICATIONS, TOPIC_MATCH_EVENTS, TOPIC_MATCH_COMMENTS] {
        let record = dispatcher.handler();
        session.subscribe(topic, move |topic, body| {
            record(topic, body);
            match normalize(topic, body) {
                FeedEvent::Comment(comment) => {
                    info!(
                        "[comment] {}: {}",
                        comment.username.as_deref().unwrap_or("anonymous"),
                        comment.text
                    );
                }
                FeedEvent::MatchEvent(event) => {
                    info!(
                        "[event] {}' {} {}",
                        event.minute.unwrap_or(0),
                        event.event_type.as_deref().unwrap_or("event"),
                        event.description
                    );
                }
                FeedEvent::Notice(text) => info!("[notice] {text}"),
            }
        })?;
    }

    session.connect()?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut status = tokio::time::interval(Duration::from_secs(30));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            event = events.recv() => match event {
                Some(SessionEvent::StateChanged(state)) => {
                    info!("connection state: {state:?}");
                    if state == ConnectionState::Connected {
                        notices.info("Connected to live feed");
                    }
                }
                Some(SessionEvent::ConnectFailed { attempt, error }) => {
                    notices.error(format!("Error: {error}"));
                    warn!(attempt, "connect failed: {error}");
                }
                Some(SessionEvent::RetriesExhausted { attempts }) => {
                    notices.error(format!("Gave up after {attempts} attempts"));
                    error!(attempts, "live feed retries exhausted");
                }
                None => {
                    error!("session worker stopped unexpectedly");
                    break;
                }
            },

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    if let Err(e) = session.publish(DESTINATION_SEND_MESSAGE, line.trim()) {
                        notices.error(format!("Error: {e}"));
                        warn!("{e}");
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!("stdin closed, staying on the feed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("stdin error: {e}");
                    stdin_open = false;
                }
            },

            _ = status.tick() => {
                let stats = dispatcher.stats();
                info!(
                    "state: {:?}, received: {} ({} events, {} comments, {} notifications)",
                    session.state(),
                    stats.total_received,
                    dispatcher.len(TOPIC_MATCH_EVENTS),
                    dispatcher.len(TOPIC_MATCH_COMMENTS),
                    dispatcher.len(TOPIC_NOTIFICATIONS),
                );
                if let Some(notice) = notices.current() {
                    info!("notice [{:?}]: {}", notice.level, notice.text);
                }
            }
        }
    }

    info!("Shutting down...");
    if let Err(e) = session.disconnect() {
        warn!("disconnect failed: {e}");
    }

    let stats = dispatcher.stats();
    info!(
        "session closed; {} messages received across {} topics",
        stats.total_received, stats.topic_count
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
