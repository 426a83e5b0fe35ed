//! Live-feed session lifecycle: connect, subscribe, publish, disconnect,
//! and the scheduled-retry loop.
//!
//! A [`Session`] handle drives a worker task that owns the transport
//! connection exclusively. Handle calls never block; connection progress is
//! reported through [`SessionEvent`]s. The retry timer lives inside the
//! worker, so `disconnect()` cancels a pending reconnect instead of leaving
//! a stray timeout behind.

use crate::error::{FeedError, Result};
use crate::transport::{Connection, Connector, TransportMessage};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Session tuning. The default preserves the platform's historical behavior:
/// a fixed five-second retry delay with no backoff growth and no attempt cap.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay before the first retry after a failed connect.
    pub reconnect_delay: Duration,
    /// Ceiling for backoff growth; equal to `reconnect_delay` disables growth.
    pub max_reconnect_delay: Duration,
    /// Consecutive failed attempts before the session gives up and goes idle.
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: None,
        }
    }
}

/// Progress reported by the session worker.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// A connect attempt failed; a retry is scheduled unless the cap is hit.
    ConnectFailed { attempt: u32, error: String },
    /// The configured attempt cap was reached; the session went idle.
    RetriesExhausted { attempts: u32 },
}

/// Identifies one subscription registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
    topic: String,
}

impl SubscriptionHandle {
    /// Topic this handle was registered for.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

type TopicHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

struct SubscriptionEntry {
    id: u64,
    topic: String,
    handler: TopicHandler,
}

enum Command {
    Connect,
    Disconnect,
    Subscribe(SubscriptionEntry),
    Unsubscribe(u64),
    Publish { destination: String, body: String },
    Shutdown,
}

/// Handle to one live-feed session.
///
/// Owns the worker for its lifetime: dropping the handle shuts the worker
/// down and releases the transport.
pub struct Session {
    command_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    next_sub_id: AtomicU64,
}

impl Session {
    /// Spawn a session worker over `connector`. Returns the handle and the
    /// event stream; the session starts out `Disconnected`.
    pub fn spawn<C: Connector>(
        connector: C,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = SessionWorker {
            connector: Arc::new(connector),
            config,
            command_rx,
            state_tx,
            event_tx,
            subscriptions: Vec::new(),
        };
        tokio::spawn(worker.run());

        let session = Self {
            command_tx,
            state_rx,
            next_sub_id: AtomicU64::new(0),
        };
        (session, event_rx)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Ask the worker to open the transport. A no-op while the session is
    /// already connecting or connected; while a retry is pending this skips
    /// the remaining wait.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Close the transport and cancel any pending reconnect. The
    /// subscription set is kept, so a later `connect()` restores it.
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Register a handler for `topic`. Issued on the transport immediately
    /// when connected, otherwise replayed on the next successful connect.
    /// Duplicate registrations for the same topic fire independently.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> Result<SubscriptionHandle> {
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let topic = topic.into();
        self.send(Command::Subscribe(SubscriptionEntry {
            id,
            topic: topic.clone(),
            handler: Arc::new(handler),
        }))?;
        Ok(SubscriptionHandle { id, topic })
    }

    /// Remove a registration. No further messages reach its handler.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        self.send(Command::Unsubscribe(handle.id))
    }

    /// Send `body` to `destination`, fire-and-forget. Returns
    /// [`FeedError::PublishDropped`] when the session is not connected;
    /// nothing is queued for later.
    pub fn publish(&self, destination: impl Into<String>, body: impl Into<String>) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(FeedError::PublishDropped);
        }
        self.send(Command::Publish {
            destination: destination.into(),
            body: body.into(),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| FeedError::WorkerGone)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

/// Why the connected phase ended.
enum LinkEnd {
    Shutdown,
    Disconnect,
    Error,
}

/// Outcome of one connect attempt.
enum Attempt<T> {
    Open(T),
    Failed(FeedError),
    Cancelled,
    Shutdown,
}

struct SessionWorker<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    command_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    subscriptions: Vec<SubscriptionEntry>,
}

impl<C: Connector> SessionWorker<C> {
    async fn run(mut self) {
        loop {
            // Idle: disconnected, no retry scheduled.
            match self.command_rx.recv().await {
                None | Some(Command::Shutdown) => return,
                Some(Command::Connect) => {
                    if self.drive().await {
                        return;
                    }
                }
                Some(Command::Subscribe(entry)) => self.subscriptions.push(entry),
                Some(Command::Unsubscribe(id)) => self.subscriptions.retain(|e| e.id != id),
                Some(Command::Publish { destination, .. }) => {
                    warn!(%destination, "dropping publish while disconnected");
                }
                Some(Command::Disconnect) => {}
            }
        }
    }

    /// Connect/retry/connected cycle. Returns to idle when the user
    /// disconnects or the retry budget runs out; `true` means shutdown.
    async fn drive(&mut self) -> bool {
        let mut attempt: u32 = 0;
        let mut delay = self.config.reconnect_delay;

        loop {
            self.set_state(ConnectionState::Connecting);
            match self.attempt_connect().await {
                Attempt::Open(conn) => {
                    info!("live feed connected");
                    attempt = 0;
                    delay = self.config.reconnect_delay;
                    let end = self.connected(conn).await;
                    self.set_state(ConnectionState::Disconnected);
                    match end {
                        LinkEnd::Shutdown => return true,
                        LinkEnd::Disconnect => return false,
                        LinkEnd::Error => {
                            // Lost an established connection: same retry path
                            // as a failed connect, without counting it against
                            // the attempt cap.
                        }
                    }
                }
                Attempt::Failed(error) => {
                    self.set_state(ConnectionState::Disconnected);
                    attempt += 1;
                    counter!("feed_connect_failures_total").increment(1);
                    warn!(%error, attempt, "connect failed");
                    let _ = self.event_tx.send(SessionEvent::ConnectFailed {
                        attempt,
                        error: error.to_string(),
                    });
                    if let Some(max) = self.config.max_reconnect_attempts {
                        if attempt >= max {
                            warn!(attempts = attempt, "retry budget exhausted, staying disconnected");
                            let _ = self
                                .event_tx
                                .send(SessionEvent::RetriesExhausted { attempts: attempt });
                            return false;
                        }
                    }
                }
                Attempt::Cancelled => {
                    self.set_state(ConnectionState::Disconnected);
                    return false;
                }
                Attempt::Shutdown => {
                    self.set_state(ConnectionState::Disconnected);
                    return true;
                }
            }

            // Scheduled retry; a disconnect here cancels it.
            match self.backoff(delay).await {
                None => {}
                Some(LinkEnd::Shutdown) => return true,
                Some(LinkEnd::Disconnect) | Some(LinkEnd::Error) => return false,
            }
            delay = (delay * 2).min(self.config.max_reconnect_delay);
        }
    }

    /// Run one connect attempt while staying responsive to commands.
    async fn attempt_connect(&mut self) -> Attempt<C::Conn> {
        let connector = Arc::clone(&self.connector);
        let connect = async move { connector.connect().await };
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => {
                    return match result {
                        Ok(conn) => Attempt::Open(conn),
                        Err(e) => Attempt::Failed(e),
                    };
                }
                command = self.command_rx.recv() => match command {
                    None | Some(Command::Shutdown) => return Attempt::Shutdown,
                    Some(Command::Disconnect) => return Attempt::Cancelled,
                    Some(Command::Connect) => {} // already connecting
                    Some(Command::Subscribe(entry)) => self.subscriptions.push(entry),
                    Some(Command::Unsubscribe(id)) => self.subscriptions.retain(|e| e.id != id),
                    Some(Command::Publish { destination, .. }) => {
                        warn!(%destination, "dropping publish while connecting");
                    }
                }
            }
        }
    }

    /// Drive an open connection: replay registrations, then pump inbound
    /// frames and commands until the link ends.
    async fn connected(&mut self, mut conn: C::Conn) -> LinkEnd {
        // (Re-)establish every registration, in registration order.
        for entry in &self.subscriptions {
            debug!(topic = %entry.topic, "subscribing");
            if let Err(error) = conn.subscribe(&wire_id(entry.id), &entry.topic).await {
                warn!(%error, topic = %entry.topic, "subscribe failed");
                return LinkEnd::Error;
            }
        }
        self.set_state(ConnectionState::Connected);

        loop {
            tokio::select! {
                inbound = conn.recv() => match inbound {
                    Ok(message) => self.dispatch(message),
                    Err(error) => {
                        warn!(%error, "connection lost");
                        return LinkEnd::Error;
                    }
                },
                command = self.command_rx.recv() => match command {
                    None | Some(Command::Shutdown) => {
                        conn.close().await;
                        return LinkEnd::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        conn.close().await;
                        return LinkEnd::Disconnect;
                    }
                    Some(Command::Connect) => {} // already connected
                    Some(Command::Subscribe(entry)) => {
                        if let Err(error) = conn.subscribe(&wire_id(entry.id), &entry.topic).await {
                            warn!(%error, topic = %entry.topic, "subscribe failed");
                            self.subscriptions.push(entry);
                            return LinkEnd::Error;
                        }
                        self.subscriptions.push(entry);
                    }
                    Some(Command::Unsubscribe(id)) => {
                        self.subscriptions.retain(|e| e.id != id);
                        if let Err(error) = conn.unsubscribe(&wire_id(id)).await {
                            warn!(%error, "unsubscribe failed");
                            return LinkEnd::Error;
                        }
                    }
                    Some(Command::Publish { destination, body }) => {
                        if let Err(error) = conn.publish(&destination, &body).await {
                            warn!(%error, %destination, "publish failed");
                            return LinkEnd::Error;
                        }
                        counter!("feed_messages_published_total").increment(1);
                    }
                }
            }
        }
    }

    /// Wait out the retry delay while staying responsive to commands.
    /// `None` means the timer fired (or an explicit connect skipped the
    /// remaining wait) and the next attempt should start.
    async fn backoff(&mut self, delay: Duration) -> Option<LinkEnd> {
        debug!(?delay, "reconnect scheduled");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return None,
                command = self.command_rx.recv() => match command {
                    None | Some(Command::Shutdown) => return Some(LinkEnd::Shutdown),
                    Some(Command::Disconnect) => {
                        debug!("pending reconnect cancelled");
                        return Some(LinkEnd::Disconnect);
                    }
                    Some(Command::Connect) => return None,
                    Some(Command::Subscribe(entry)) => self.subscriptions.push(entry),
                    Some(Command::Unsubscribe(id)) => self.subscriptions.retain(|e| e.id != id),
                    Some(Command::Publish { destination, .. }) => {
                        warn!(%destination, "dropping publish while disconnected");
                    }
                }
            }
        }
    }

    /// Route one inbound message to its registration. The broker echoes the
    /// subscription id on each delivery; when it is missing or unknown, fan
    /// out to every registration for the topic.
    fn dispatch(&self, message: TransportMessage) {
        if let Some(sub) = &message.subscription {
            if let Some(entry) = self.subscriptions.iter().find(|e| wire_id(e.id) == *sub) {
                (entry.handler)(&message.topic, &message.body);
                return;
            }
        }

        let mut delivered = false;
        for entry in self.subscriptions.iter().filter(|e| e.topic == message.topic) {
            (entry.handler)(&message.topic, &message.body);
            delivered = true;
        }
        if !delivered {
            debug!(topic = %message.topic, "message with no matching registration");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        if *self.state_tx.borrow() == state {
            return;
        }
        let _ = self.state_tx.send(state);
        let _ = self.event_tx.send(SessionEvent::StateChanged(state));
        gauge!("feed_connected").set(if state == ConnectionState::Connected {
            1.0
        } else {
            0.0
        });
    }
}

fn wire_id(id: u64) -> String {
    format!("sub-{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    /// Scripted transport: pops one outcome per connect attempt, succeeding
    /// once the script runs dry.
    #[derive(Clone, Default)]
    struct MockConnector {
        script: Arc<Mutex<VecDeque<bool>>>,
        connects: Arc<AtomicU32>,
        conn_logs: Arc<Mutex<Vec<Arc<ConnLog>>>>,
        inbound_txs: Arc<Mutex<Vec<mpsc::UnboundedSender<TransportMessage>>>>,
    }

    #[derive(Default)]
    struct ConnLog {
        subscribed: Mutex<Vec<(String, String)>>,
        published: Mutex<Vec<(String, String)>>,
    }

    impl MockConnector {
        fn new() -> Self {
            Self::default()
        }

        fn with_script(outcomes: &[bool]) -> Self {
            let connector = Self::default();
            connector
                .script
                .lock()
                .unwrap()
                .extend(outcomes.iter().copied());
            connector
        }

        fn connects(&self) -> u32 {
            self.connects.load(Ordering::Relaxed)
        }

        fn conn_log(&self, index: usize) -> Arc<ConnLog> {
            self.conn_logs.lock().unwrap()[index].clone()
        }

        fn subscribed_topics(&self, index: usize) -> Vec<String> {
            self.conn_log(index)
                .subscribed
                .lock()
                .unwrap()
                .iter()
                .map(|(_, topic)| topic.clone())
                .collect()
        }

        fn feed(&self, message: TransportMessage) {
            let txs = self.inbound_txs.lock().unwrap();
            txs.last().unwrap().send(message).unwrap();
        }
    }

    struct MockConnection {
        log: Arc<ConnLog>,
        inbound: mpsc::UnboundedReceiver<TransportMessage>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Conn = MockConnection;

        async fn connect(&self) -> crate::Result<MockConnection> {
            self.connects.fetch_add(1, Ordering::Relaxed);
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if !ok {
                return Err(FeedError::Connect("scripted failure".to_string()));
            }
            let log = Arc::new(ConnLog::default());
            let (tx, rx) = mpsc::unbounded_channel();
            self.conn_logs.lock().unwrap().push(log.clone());
            self.inbound_txs.lock().unwrap().push(tx);
            Ok(MockConnection { log, inbound: rx })
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn subscribe(&mut self, id: &str, topic: &str) -> crate::Result<()> {
            self.log
                .subscribed
                .lock()
                .unwrap()
                .push((id.to_string(), topic.to_string()));
            Ok(())
        }

        async fn unsubscribe(&mut self, _id: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn publish(&mut self, destination: &str, body: &str) -> crate::Result<()> {
            self.log
                .published
                .lock()
                .unwrap()
                .push((destination.to_string(), body.to_string()));
            Ok(())
        }

        async fn recv(&mut self) -> crate::Result<TransportMessage> {
            match self.inbound.recv().await {
                Some(message) => Ok(message),
                None => Err(FeedError::ConnectionClosed),
            }
        }

        async fn close(&mut self) {}
    }

    async fn wait_for_state(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        target: ConnectionState,
    ) {
        loop {
            match events.recv().await.expect("event stream closed") {
                SessionEvent::StateChanged(state) if state == target => return,
                _ => {}
            }
        }
    }

    /// Let the worker task catch up with queued commands.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_registrations_before_connect_are_replayed() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.subscribe("/topic/match-events", |_, _| {}).unwrap();
        session.subscribe("/topic/match-comments", |_, _| {}).unwrap();
        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        assert_eq!(
            probe.subscribed_topics(0),
            vec!["/topic/match-events", "/topic/match-comments"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent_while_connected() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        session.connect().unwrap();
        session.connect().unwrap();
        settle().await;

        assert_eq!(probe.connects(), 1);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_then_connect_restores_registrations_once() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;
        session.subscribe("/topic/match-events", |_, _| {}).unwrap();
        session.subscribe("/topic/notifications", |_, _| {}).unwrap();
        settle().await;

        session.disconnect().unwrap();
        wait_for_state(&mut events, ConnectionState::Disconnected).await;

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        assert_eq!(probe.connects(), 2);
        assert_eq!(
            probe.subscribed_topics(1),
            vec!["/topic/match-events", "/topic/notifications"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_on_fixed_schedule_until_success() {
        let connector = MockConnector::with_script(&[false, false]);
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        let start = tokio::time::Instant::now();
        session.connect().unwrap();

        let mut transitions = Vec::new();
        loop {
            match events.recv().await.expect("event stream closed") {
                SessionEvent::StateChanged(state) => {
                    transitions.push(state);
                    if state == ConnectionState::Connected {
                        break;
                    }
                }
                _ => {}
            }
        }

        assert_eq!(
            transitions,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
            ]
        );
        assert_eq!(probe.connects(), 3);
        // Two scheduled retries, five seconds apart each.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let connector = MockConnector::with_script(&[false]);
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.connect().unwrap();
        loop {
            if let SessionEvent::ConnectFailed { .. } =
                events.recv().await.expect("event stream closed")
            {
                break;
            }
        }

        session.disconnect().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(probe.connects(), 1);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_while_disconnected_is_surfaced_not_queued() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let dispatcher = crate::FeedDispatcher::new();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());
        session
            .subscribe("/topic/notifications", dispatcher.handler())
            .unwrap();

        let err = session.publish("/app/sendMessage", "hello").unwrap_err();
        assert!(matches!(err, FeedError::PublishDropped));
        assert!(dispatcher.is_empty());
        assert_eq!(probe.connects(), 0);

        // The drop is final: nothing is flushed once the session connects.
        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;
        settle().await;
        assert!(probe.conn_log(0).published.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_while_connected_reaches_transport() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        session.publish("/app/sendMessage", "hello").unwrap();
        settle().await;

        assert_eq!(
            probe.conn_log(0).published.lock().unwrap().clone(),
            vec![("/app/sendMessage".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registrations_fire_independently() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let (c1, c2) = (first.clone(), second.clone());
        session
            .subscribe("/topic/match-events", move |_, _| {
                c1.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        session
            .subscribe("/topic/match-events", move |_, _| {
                c2.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        // Without a subscription id the frame fans out to both handlers.
        probe.feed(TransportMessage {
            topic: "/topic/match-events".to_string(),
            subscription: None,
            body: "goal".to_string(),
        });
        settle().await;
        assert_eq!(first.load(Ordering::Relaxed), 1);
        assert_eq!(second.load(Ordering::Relaxed), 1);

        // With an id only the addressed registration fires.
        probe.feed(TransportMessage {
            topic: "/topic/match-events".to_string(),
            subscription: Some("sub-0".to_string()),
            body: "goal".to_string(),
        });
        settle().await;
        assert_eq!(first.load(Ordering::Relaxed), 2);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_removes_registration_from_replay() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        let keep = session.subscribe("/topic/notifications", |_, _| {}).unwrap();
        let drop_me = session.subscribe("/topic/match-events", |_, _| {}).unwrap();
        session.unsubscribe(&drop_me).unwrap();

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        assert_eq!(probe.subscribed_topics(0), vec![keep.topic().to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cap_goes_idle() {
        let connector = MockConnector::with_script(&[false, false, false]);
        let probe = connector.clone();
        let config = SessionConfig {
            max_reconnect_attempts: Some(2),
            ..SessionConfig::default()
        };
        let (session, mut events) = Session::spawn(connector, config);

        session.connect().unwrap();
        loop {
            if let SessionEvent::RetriesExhausted { attempts } =
                events.recv().await.expect("event stream closed")
            {
                assert_eq!(attempts, 2);
                break;
            }
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(probe.connects(), 2);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_while_connected_schedules_reconnect() {
        let connector = MockConnector::new();
        let probe = connector.clone();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.subscribe("/topic/notifications", |_, _| {}).unwrap();
        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        // Drop the inbound channel: recv() errors and the link dies.
        probe.inbound_txs.lock().unwrap().clear();
        wait_for_state(&mut events, ConnectionState::Disconnected).await;
        wait_for_state(&mut events, ConnectionState::Connected).await;

        assert_eq!(probe.connects(), 2);
        assert_eq!(probe.subscribed_topics(1), vec!["/topic/notifications"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_handle_stops_the_worker() {
        let connector = MockConnector::new();
        let (session, mut events) = Session::spawn(connector, SessionConfig::default());

        session.connect().unwrap();
        wait_for_state(&mut events, ConnectionState::Connected).await;

        drop(session);
        loop {
            match events.recv().await {
                None => break,
                Some(_) => {}
            }
        }
    }
}
