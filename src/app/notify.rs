// src/app/notify.rs
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Single-slot transient message (snackbar). A newer notice replaces the
/// current one.
#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notice>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn info(&mut self, message: impl Into<String>, now: Instant) {
        self.push(NoticeKind::Info, message.into(), now);
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.push(NoticeKind::Error, message.into(), now);
    }

    fn push(&mut self, kind: NoticeKind, message: String, now: Instant) {
        self.current = Some(Notice {
            kind,
            message,
            expires_at: now + self.ttl,
        });
    }

    /// The visible notice, expiring it first if its time is up.
    pub fn current(&mut self, now: Instant) -> Option<&Notice> {
        if self.current.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_dismisses_after_ttl() {
        let t0 = Instant::now();
        let mut n = Notifier::new(Duration::from_secs(6));
        n.info("Show added to favorites successfully.", t0);
        assert!(n.current(t0 + Duration::from_millis(5_999)).is_some());
        assert!(n.current(t0 + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn newer_notice_replaces_and_restarts() {
        let t0 = Instant::now();
        let mut n = Notifier::new(Duration::from_secs(6));
        n.info("first", t0);
        n.error("second", t0 + Duration::from_secs(5));
        let cur = n.current(t0 + Duration::from_secs(10)).cloned().unwrap();
        assert_eq!(cur.message, "second");
        assert_eq!(cur.kind, NoticeKind::Error);
    }

    #[test]
    fn explicit_dismiss() {
        let t0 = Instant::now();
        let mut n = Notifier::new(Duration::from_secs(6));
        n.info("x", t0);
        n.dismiss();
        assert!(n.current(t0).is_none());
    }
}
