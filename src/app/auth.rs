// src/app/auth.rs
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, RwLock};
use std::thread;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::data::{Credentials, User};
use super::identity::{AuthChange, IdentityProvider};
use super::types::{AuthMsg, AuthOp};
use crate::error::AuthError;

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email shape regex should compile")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Authenticated(User),
    Anonymous,
}

/// Snapshot readers get through [`SessionView`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Read-only handle on the process-wide session; cheap to clone.
#[derive(Clone, Default)]
pub struct SessionView(Arc<RwLock<Session>>);

impl SessionView {
    pub fn snapshot(&self) -> Session {
        self.0.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user
    }

    fn store(&self, session: Session) {
        if let Ok(mut slot) = self.0.write() {
            *slot = session;
        }
    }
}

pub fn check_credentials(creds: &Credentials) -> Result<(), AuthError> {
    if !EMAIL_SHAPE.is_match(creds.email.trim()) {
        return Err(AuthError::InvalidCredential {
            reason: "Enter a valid email address.".into(),
        });
    }
    if creds.password.trim().is_empty() {
        return Err(AuthError::InvalidCredential {
            reason: "Password is required.".into(),
        });
    }
    Ok(())
}

enum Request {
    Login(Credentials),
    SignUp(Credentials),
    Logout,
}

impl Request {
    fn op(&self) -> AuthOp {
        match self {
            Self::Login(_) => AuthOp::Login,
            Self::SignUp(_) => AuthOp::SignUp,
            Self::Logout => AuthOp::Logout,
        }
    }

    fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Login(c) | Self::SignUp(c) => Some(c),
            Self::Logout => None,
        }
    }

    fn call(&self, provider: &dyn IdentityProvider) -> Result<(), AuthError> {
        match self {
            Self::Login(c) => provider.sign_in(c),
            Self::SignUp(c) => provider.sign_up(c),
            Self::Logout => provider.sign_out(),
        }
    }
}

/// Sole writer of the session. Change notifications from the provider are
/// authoritative and applied on [`AuthSession::poll`] whatever the state.
///
/// Every provider call has a blocking form and a `request_*` form that runs
/// on a worker thread and settles on a later `poll`.
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    changes: Option<Receiver<AuthChange>>,
    done_tx: Sender<AuthMsg>,
    done_rx: Option<Receiver<AuthMsg>>,
    state: AuthState,
    in_flight: usize,
    notices_seen: u64,
    error: Option<String>,
    view: SessionView,
}

impl AuthSession {
    /// Subscribe and start in `Initializing`. Resolve with [`Self::refresh`]
    /// or [`Self::request_refresh`].
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let changes = Some(provider.subscribe());
        let (done_tx, done_rx) = mpsc::channel();
        let session = Self {
            provider,
            changes,
            done_tx,
            done_rx: Some(done_rx),
            state: AuthState::Initializing,
            in_flight: 0,
            notices_seen: 0,
            error: None,
            view: SessionView::default(),
        };
        session.publish();
        session
    }

    /// `new` followed by a blocking session query.
    pub fn mount(provider: Arc<dyn IdentityProvider>) -> Self {
        let mut session = Self::new(provider);
        session.refresh();
        session
    }

    /// `new` followed by a background session query.
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let mut session = Self::new(provider);
        session.request_refresh();
        session
    }

    pub fn refresh(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.in_flight += 1;
        self.publish();
        let seq = self.notices_seen;
        let result = self.provider.current_session();
        self.apply_session(seq, result);
    }

    pub fn request_refresh(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.in_flight += 1;
        self.publish();

        let seq = self.notices_seen;
        let provider = Arc::clone(&self.provider);
        let tx = self.done_tx.clone();
        thread::spawn(move || {
            let result = provider.current_session();
            let _ = tx.send(AuthMsg::Session { seq, result });
        });
    }

    fn apply_session(&mut self, seq: u64, result: Result<Option<User>, AuthError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq != self.notices_seen {
            debug!("session query overtaken by a change notification");
        } else {
            match result {
                Ok(Some(user)) => {
                    info!("Restored session for user {}", user.id);
                    self.state = AuthState::Authenticated(user);
                }
                Ok(None) => self.state = AuthState::Anonymous,
                Err(err) => {
                    warn!("Error fetching session: {err}");
                    self.error = Some(err.reason().to_string());
                    if self.state == AuthState::Initializing {
                        self.state = AuthState::Anonymous;
                    }
                }
            }
        }
        self.publish();
    }

    /// Apply queued change notifications and finished provider calls.
    /// Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0usize;
        while let Some(rx) = &self.changes {
            match rx.try_recv() {
                Ok(change) => {
                    self.state = match change {
                        Some(user) => AuthState::Authenticated(user),
                        None => AuthState::Anonymous,
                    };
                    self.notices_seen += 1;
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("identity provider closed its change feed");
                    self.changes = None;
                    break;
                }
            }
        }
        if applied > 0 {
            self.publish();
        }

        let done: Vec<AuthMsg> = self
            .done_rx
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();
        for msg in done {
            match msg {
                AuthMsg::Session { seq, result } => self.apply_session(seq, result),
                AuthMsg::Done { op, result } => self.apply_done(op, result),
            }
            applied += 1;
        }
        applied
    }

    /// Session state follows from the next change notification, not from this call.
    pub fn login(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.run(Request::Login(creds.clone()))
    }

    /// Creates the identity; the user is not signed in by this call.
    pub fn sign_up(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.run(Request::SignUp(creds.clone()))
    }

    /// Clears the user as soon as the provider confirms, without waiting
    /// for the notification. On failure the session is left as it was.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.run(Request::Logout)
    }

    /// Malformed credentials are refused here; provider errors land on `poll`.
    pub fn request_login(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.spawn(Request::Login(creds.clone()))
    }

    pub fn request_sign_up(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.spawn(Request::SignUp(creds.clone()))
    }

    pub fn request_logout(&mut self) -> Result<(), AuthError> {
        self.spawn(Request::Logout)
    }

    fn begin(&mut self, req: &Request) -> Result<(), AuthError> {
        self.ensure_mounted()?;
        self.error = None;
        if let Some(creds) = req.credentials() {
            if let Err(err) = check_credentials(creds) {
                self.error = Some(err.reason().to_string());
                self.publish();
                return Err(err);
            }
        }
        self.in_flight += 1;
        self.publish();
        Ok(())
    }

    fn run(&mut self, req: Request) -> Result<(), AuthError> {
        self.begin(&req)?;
        let result = req.call(self.provider.as_ref());
        self.apply_done(req.op(), result.clone());
        result
    }

    fn spawn(&mut self, req: Request) -> Result<(), AuthError> {
        self.begin(&req)?;
        let provider = Arc::clone(&self.provider);
        let tx = self.done_tx.clone();
        thread::spawn(move || {
            let result = req.call(provider.as_ref());
            let _ = tx.send(AuthMsg::Done {
                op: req.op(),
                result,
            });
        });
        Ok(())
    }

    fn apply_done(&mut self, op: AuthOp, result: Result<(), AuthError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(()) if op == AuthOp::Logout => self.state = AuthState::Anonymous,
            Ok(()) => {}
            Err(err) => {
                warn!("{op:?} error: {err}");
                self.error = Some(err.reason().to_string());
            }
        }
        self.publish();
    }

    /// Unsubscribe and stop listening for provider calls. Nothing mutates
    /// the session afterwards.
    pub fn teardown(&mut self) {
        self.changes = None;
        self.done_rx = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.done_rx.is_some()
    }

    fn ensure_mounted(&self) -> Result<(), AuthError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(AuthError::Rejected {
                reason: "session has been closed".into(),
            })
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0 || self.state == AuthState::Initializing
    }

    pub fn view(&self) -> SessionView {
        self.view.clone()
    }

    fn publish(&self) {
        self.view.store(Session {
            user: self.user().cloned(),
            loading: self.is_loading(),
            error: self.error.clone(),
        });
    }
}
