//! Transient status notices.
//!
//! One slot, newest wins, and a notice disappears on its own after a fixed
//! interval; readers never see stale text.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Default time a notice stays visible.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Notice severity, for display styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A posted notice.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    posted_at: Instant,
}

/// Single-slot notice board with auto-clear.
#[derive(Debug)]
pub struct NoticeBoard {
    current: Mutex<Option<Notice>>,
    ttl: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            ttl,
        }
    }

    /// Post a notice, replacing whatever was showing.
    pub fn post(&self, level: NoticeLevel, text: impl Into<String>) {
        let mut current = self.current.lock().unwrap();
        *current = Some(Notice {
            text: text.into(),
            level,
            posted_at: Instant::now(),
        });
    }

    /// Shorthand for an informational notice.
    pub fn info(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Info, text);
    }

    /// Shorthand for an error notice.
    pub fn error(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Error, text);
    }

    /// The notice currently showing, if it has not expired.
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.lock().unwrap();
        if let Some(notice) = current.as_ref() {
            if notice.posted_at.elapsed() >= self.ttl {
                *current = None;
            }
        }
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notice_clears_after_ttl() {
        let board = NoticeBoard::default();
        board.error("Error: failed to load matches");

        assert_eq!(
            board.current().unwrap().text,
            "Error: failed to load matches"
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(board.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_notice_wins() {
        let board = NoticeBoard::default();
        board.info("Loaded 3 matches");
        board.error("Error: connection refused");

        let showing = board.current().unwrap();
        assert_eq!(showing.text, "Error: connection refused");
        assert_eq!(showing.level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reposting_resets_the_clock() {
        let board = NoticeBoard::default();
        board.info("first");
        tokio::time::advance(Duration::from_secs(4)).await;
        board.info("second");
        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(board.current().unwrap().text, "second");
    }
}
