// src/app/search.rs
use std::time::{Duration, Instant};

use tracing::debug;

/// Trailing-edge debounce for the search box.
///
/// The owning loop calls [`Debouncer::input`] on every keystroke and
/// [`Debouncer::poll`] once per tick; `poll` yields the latest input once no
/// new input has arrived for `window`. At most one emission is pending at a
/// time: each input replaces the pending value and restarts the window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
    settled: String,
    torn_down: bool,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            settled: String::new(),
            torn_down: false,
        }
    }

    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        if self.torn_down {
            return;
        }
        self.pending = Some((value.into(), now + self.window));
    }

    /// Emit the pending value if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if self.torn_down {
            return None;
        }
        if !self.deadline().is_some_and(|d| now >= d) {
            return None;
        }
        let (value, _) = self.pending.take()?;
        debug!("search settled on {value:?}");
        self.settled.clone_from(&value);
        Some(value)
    }

    /// The last emitted value.
    pub fn settled(&self) -> &str {
        &self.settled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, d)| *d)
    }

    /// Drop the pending emission without emitting.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Reset to `value` immediately, bypassing the window (e.g. "Clear Filter").
    pub fn reset(&mut self, value: impl Into<String>) {
        if self.torn_down {
            return;
        }
        self.pending = None;
        self.settled = value.into();
    }

    pub fn teardown(&mut self) {
        self.pending = None;
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Poll every millisecond over `[0, until]` and collect emissions with their offsets.
    fn run(deb: &mut Debouncer, t0: Instant, inputs: &[(u64, &str)], until: u64) -> Vec<(u64, String)> {
        let mut out = Vec::new();
        for t in 0..=until {
            for (at, value) in inputs {
                if *at == t {
                    deb.input(*value, t0 + ms(t));
                }
            }
            if let Some(v) = deb.poll(t0 + ms(t)) {
                out.push((t, v));
            }
        }
        out
    }

    #[test]
    fn emits_once_after_quiescence() {
        let t0 = Instant::now();
        let mut deb = Debouncer::new(ms(300));
        let out = run(&mut deb, t0, &[(0, "a"), (100, "ab"), (250, "abc")], 1_000);
        assert_eq!(out, vec![(550, "abc".to_string())]);
        assert_eq!(deb.settled(), "abc");
        assert!(!deb.is_pending());
    }

    #[test]
    fn separated_inputs_emit_separately() {
        let t0 = Instant::now();
        let mut deb = Debouncer::new(ms(300));
        let out = run(&mut deb, t0, &[(0, "a"), (400, "b")], 1_000);
        assert_eq!(out, vec![(300, "a".to_string()), (700, "b".to_string())]);
    }

    #[test]
    fn not_due_one_tick_early() {
        let t0 = Instant::now();
        let mut deb = Debouncer::new(ms(300));
        deb.input("x", t0);
        assert_eq!(deb.deadline(), Some(t0 + ms(300)));
        assert_eq!(deb.poll(t0 + ms(299)), None);
        assert_eq!(deb.poll(t0 + ms(300)).as_deref(), Some("x"));
        assert_eq!(deb.poll(t0 + ms(900)), None);
    }

    #[test]
    fn teardown_suppresses_pending_and_future_emissions() {
        let t0 = Instant::now();
        let mut deb = Debouncer::new(ms(300));
        deb.input("gone", t0);
        deb.teardown();
        assert_eq!(deb.poll(t0 + ms(1_000)), None);
        deb.input("later", t0 + ms(1_000));
        assert_eq!(deb.poll(t0 + ms(5_000)), None);
        assert_eq!(deb.settled(), "");
    }

    #[test]
    fn reset_clears_pending() {
        let t0 = Instant::now();
        let mut deb = Debouncer::new(ms(300));
        deb.input("abc", t0);
        deb.reset("");
        assert!(!deb.is_pending());
        assert_eq!(deb.poll(t0 + ms(400)), None);
        assert_eq!(deb.settled(), "");
    }
}
