//! Live-feed client core for the football match platform.
//!
//! One [`Session`] owns one broker connection and its topic subscriptions;
//! inbound frames are appended into per-topic logs by the [`FeedDispatcher`]
//! and read back by the UI layer through point-in-time snapshots.

pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod session;
pub mod stomp;
pub mod transport;

pub use dispatcher::{FeedDispatcher, FeedStats, InboundMessage};
pub use error::{FeedError, Result};
pub use normalize::{normalize, CommentView, FeedEvent, MatchEventView};
pub use session::{ConnectionState, Session, SessionConfig, SessionEvent, SubscriptionHandle};
pub use transport::{Connection, Connector, StompConnector, TransportMessage};

/// Broker topic carrying free-form admin notifications.
pub const TOPIC_NOTIFICATIONS: &str = "/topic/notifications";

/// Broker topic carrying match events (goals, cards, substitutions).
pub const TOPIC_MATCH_EVENTS: &str = "/topic/match-events";

/// Broker topic carrying user comments.
pub const TOPIC_MATCH_COMMENTS: &str = "/topic/match-comments";

/// Application destination for outbound free-text messages.
pub const DESTINATION_SEND_MESSAGE: &str = "/app/sendMessage";
